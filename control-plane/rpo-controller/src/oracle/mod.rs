pub mod health;

use async_trait::async_trait;
use kube::api::Api;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use kube::Client;
use std::fmt;
use tracing::trace;

use crate::crd::KindDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Ready,
    InProgress,
    Failed,
    Terminating,
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Ready => write!(f, "Ready"),
            HealthStatus::InProgress => write!(f, "InProgress"),
            HealthStatus::Failed => write!(f, "Failed"),
            HealthStatus::Terminating => write!(f, "Terminating"),
            HealthStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthVerdict {
    pub status: HealthStatus,
    pub message: String,
}

impl HealthVerdict {
    pub fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == HealthStatus::Ready
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("failed to fetch {kind} {namespace}/{name}: {message}")]
    Transient {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot compute status of {object}: {message}")]
pub struct ComputeError {
    pub object: String,
    pub message: String,
}

/// Fetches dependent objects and classifies their health.
#[async_trait]
pub trait StatusOracle: Send + Sync + 'static {
    async fn fetch(
        &self,
        kind: &KindDescriptor,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, FetchError>;

    fn compute(&self, obj: &DynamicObject) -> Result<HealthVerdict, ComputeError>;
}

/// Oracle backed by the Kubernetes API through the dynamic client.
pub struct KubeStatusOracle {
    client: Client,
}

impl KubeStatusOracle {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// The kind is left empty: reads only need group, version and plural, and the
/// fetched object carries its own kind.
fn api_resource_for(kind: &KindDescriptor) -> ApiResource {
    ApiResource {
        group: kind.group.clone(),
        version: kind.version.clone(),
        api_version: kind.api_version(),
        kind: String::new(),
        plural: kind.resource.clone(),
    }
}

#[async_trait]
impl StatusOracle for KubeStatusOracle {
    async fn fetch(
        &self,
        kind: &KindDescriptor,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, FetchError> {
        let ar = api_resource_for(kind);
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &ar);
        trace!(%kind, %namespace, %name, "oracle: fetching dependent object");
        match api.get(name).await {
            Ok(obj) => Ok(obj),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                Err(FetchError::NotFound {
                    kind: kind.to_string(),
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                })
            }
            Err(e) => Err(FetchError::Transient {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn compute(&self, obj: &DynamicObject) -> Result<HealthVerdict, ComputeError> {
        health::compute(obj)
    }
}
