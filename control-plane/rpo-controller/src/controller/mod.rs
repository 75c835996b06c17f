pub mod conditions;
pub mod evaluator;
pub mod events;
pub mod reconcile;
pub mod status;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use kube::{
    Client, ResourceExt,
    api::Api,
    runtime::{
        Controller,
        controller::Action,
        events::{Recorder, Reporter},
        watcher::Config,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::RpoConfig;
use crate::crd::Promotion;
use crate::oracle::{KubeStatusOracle, StatusOracle};

pub use evaluator::{
    EvaluationError, EvaluationOutcome, EvaluationPolicy, ReadinessEvaluator,
};
pub use reconcile::{PromotionReconciler, ReconcileOutcome, Reconciled};
pub use store::{KubePromotionStore, PromotionStore, StoreError};

const REPORTER: &str = "rpo-controller";

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("failed to load promotion: {0}")]
    RequestFetch(String),
    #[error("status write conflicted {attempts} times")]
    PersistConflict { attempts: u32 },
    #[error("failed to persist status: {0}")]
    PersistFatal(String),
    #[error("reconcile cancelled")]
    Cancelled,
    #[error("readiness evaluation exceeded {0:?}")]
    DeadlineExceeded(Duration),
}

pub struct ControllerContext {
    pub client: Client,
    pub cfg: RpoConfig,
    pub reconciler: PromotionReconciler,
    pub recorder: Option<Recorder>,
    pub shutdown: CancellationToken,
}

impl ControllerContext {
    pub fn new(
        client: Client,
        cfg: RpoConfig,
        oracle: Arc<dyn StatusOracle>,
        store: Arc<dyn PromotionStore>,
        shutdown: CancellationToken,
    ) -> Self {
        let evaluator =
            ReadinessEvaluator::new(oracle, cfg.evaluation_policy());
        let reconciler = PromotionReconciler::new(store, evaluator)
            .with_transition_policy(cfg.transition_time_policy())
            .with_max_conflict_retries(cfg.max_conflict_retries)
            .with_evaluation_timeout(cfg.evaluation_timeout());
        let recorder = cfg.events_enabled.then(|| {
            Recorder::new(
                client.clone(),
                Reporter {
                    controller: REPORTER.into(),
                    instance: std::env::var("POD_NAME").ok(),
                },
            )
        });
        Self {
            client,
            cfg,
            reconciler,
            recorder,
            shutdown,
        }
    }
}

pub async fn run_controller(
    client: Client,
    cfg: RpoConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let api: Api<Promotion> = match cfg.watch_namespace() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let oracle: Arc<dyn StatusOracle> =
        Arc::new(KubeStatusOracle::new(client.clone()));
    let store: Arc<dyn PromotionStore> =
        Arc::new(KubePromotionStore::new(client.clone()));
    info!(
        namespace = cfg.watch_namespace().unwrap_or("<all>"),
        evaluation_policy = %cfg.evaluation_policy(),
        transition_time_policy = %cfg.transition_time_policy(),
        "controller: starting promotion controller"
    );
    let ctx = Arc::new(ControllerContext::new(
        client,
        cfg,
        oracle,
        store,
        shutdown.clone(),
    ));

    // The controller runs at most one reconcile per object at a time and
    // folds duplicate triggers for an object into one pending run.
    let controller = Controller::new(api, Config::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    debug!(object = %obj_ref, ?action, "reconciled")
                }
                Err(e) => error!(error = %e, "reconcile error"),
            }
        });

    tokio::select! {
        _ = controller => {}
        _ = shutdown.cancelled() => {
            info!("controller: shutdown requested; stopping");
        }
    }
    Ok(())
}

#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_else(|| "default".into()), name = %obj.name_any()))]
async fn reconcile(
    obj: Arc<Promotion>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();

    let outcome = ctx.reconciler.reconcile(&ns, &name, &ctx.shutdown).await?;
    match outcome {
        ReconcileOutcome::NotFound => Ok(Action::await_change()),
        ReconcileOutcome::Reconciled(result) => {
            if let Some(recorder) = ctx.recorder.as_ref() {
                events::publish_readiness(recorder, &obj, &result).await;
            }
            // Dependent objects are not watched, so readiness is re-checked
            // on a timer.
            let secs = if result.status.dependent_objects_ready {
                ctx.cfg.ready_requeue_secs
            } else {
                ctx.cfg.unready_requeue_secs
            };
            Ok(Action::requeue(Duration::from_secs(secs)))
        }
    }
}

fn error_policy(
    obj: Arc<Promotion>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    match error {
        ReconcileErr::Cancelled => Action::await_change(),
        _ => {
            warn!(
                ns = %obj.namespace().unwrap_or_default(),
                name = %obj.name_any(),
                error = %error,
                "reconcile failed; requeueing"
            );
            Action::requeue(Duration::from_secs(ctx.cfg.error_requeue_secs))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing;
