use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::trace;

use crate::crd::{Promotion, PromotionStatus};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another writer updated the object since it was read.
    #[error("conflicting update to promotion {0}")]
    Conflict(String),
    #[error("promotion {0} not found")]
    NotFound(String),
    #[error("promotion store error: {0}")]
    Fatal(String),
}

/// Read/write access to promotion requests. Writes only ever touch the
/// status subresource.
#[async_trait]
pub trait PromotionStore: Send + Sync + 'static {
    async fn get(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<Promotion>, StoreError>;

    /// Replace the status of `promotion`, failing with
    /// [`StoreError::Conflict`] if the stored object no longer has the
    /// resource version `promotion` was read at.
    async fn replace_status(
        &self,
        promotion: &Promotion,
        status: &PromotionStatus,
    ) -> Result<(), StoreError>;
}

pub struct KubePromotionStore {
    client: Client,
}

impl KubePromotionStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn map_kube_error(key: String, e: kube::Error) -> StoreError {
    match e {
        kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict(key),
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound(key),
        other => StoreError::Fatal(other.to_string()),
    }
}

#[async_trait]
impl PromotionStore for KubePromotionStore {
    async fn get(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<Promotion>, StoreError> {
        let api: Api<Promotion> = Api::namespaced(self.client.clone(), ns);
        api.get_opt(name)
            .await
            .map_err(|e| map_kube_error(format!("{}/{}", ns, name), e))
    }

    async fn replace_status(
        &self,
        promotion: &Promotion,
        status: &PromotionStatus,
    ) -> Result<(), StoreError> {
        let ns = promotion.namespace().unwrap_or_else(|| "default".into());
        let name = promotion.name_any();
        let api: Api<Promotion> = Api::namespaced(self.client.clone(), &ns);
        // resourceVersion in the patch body makes the apiserver reject the
        // write with 409 when the object moved on.
        let patch = json!({
            "metadata": { "resourceVersion": promotion.resource_version() },
            "status": status,
        });
        trace!(%ns, %name, "store: patching status");
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(|e| map_kube_error(format!("{}/{}", ns, name), e))
    }
}
