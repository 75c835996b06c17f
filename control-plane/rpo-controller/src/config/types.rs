use std::time::Duration;

use envconfig::Envconfig;

use crate::controller::conditions::TransitionTimePolicy;
use crate::controller::evaluator::EvaluationPolicy;

#[derive(Envconfig, Clone, Debug)]
pub struct RpoConfig {
    #[envconfig(from = "HTTP_PORT", default = "8088")]
    pub http_port: u16,

    /// Watch a single namespace instead of the whole cluster.
    /// Env: RPO_WATCH_NAMESPACE
    #[envconfig(from = "RPO_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// fail-fast | evaluate-all
    #[envconfig(from = "RPO_EVALUATION_POLICY", default = "fail-fast")]
    pub evaluation_policy: String,

    /// on-status-change | always
    #[envconfig(
        from = "RPO_TRANSITION_TIME_POLICY",
        default = "on-status-change"
    )]
    pub transition_time_policy: String,

    /// Upper bound on one readiness evaluation.
    #[envconfig(from = "RPO_EVALUATION_TIMEOUT_SECS", default = "30")]
    pub evaluation_timeout_secs: u64,

    #[envconfig(from = "RPO_MAX_CONFLICT_RETRIES", default = "3")]
    pub max_conflict_retries: u32,

    #[envconfig(from = "RPO_READY_REQUEUE_SECS", default = "300")]
    pub ready_requeue_secs: u64,
    #[envconfig(from = "RPO_UNREADY_REQUEUE_SECS", default = "15")]
    pub unready_requeue_secs: u64,
    #[envconfig(from = "RPO_ERROR_REQUEUE_SECS", default = "30")]
    pub error_requeue_secs: u64,

    /// Publish Kubernetes Events on Ready transitions and evaluation errors.
    /// Env: RPO_EVENTS_ENABLED
    #[envconfig(from = "RPO_EVENTS_ENABLED", default = "true")]
    pub events_enabled: bool,
}

impl RpoConfig {
    pub fn evaluation_policy(&self) -> EvaluationPolicy {
        EvaluationPolicy::from_str(&self.evaluation_policy)
    }

    pub fn transition_time_policy(&self) -> TransitionTimePolicy {
        TransitionTimePolicy::from_str(&self.transition_time_policy)
    }

    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluation_timeout_secs)
    }

    /// An empty `RPO_WATCH_NAMESPACE` means all namespaces.
    pub fn watch_namespace(&self) -> Option<&str> {
        self.watch_namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}
