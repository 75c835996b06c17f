use envconfig::Envconfig;
use kube::Client;
use rpo_controller::{config::RpoConfig, init_tracing, runtime};
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let cfg = RpoConfig::init_from_env()?;
    info!(?cfg, "Starting release promotion controller");

    // One client for the whole process; the oracle and the store share it.
    let client = Client::try_default().await?;
    runtime::run_all(client, cfg).await
}
