use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::crd::LocalObjectsRef;
use crate::oracle::{
    ComputeError, FetchError, HealthVerdict, StatusOracle,
};

/// Aggregated readiness of a promotion's dependent objects. Exactly one
/// variant describes an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome {
    AllReady,
    /// References whose verdict was anything but ready, in input order.
    SomeUnready(Vec<LocalObjectsRef>),
    EvaluationFailed(EvaluationError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Compute(#[from] ComputeError),
}

/// What to do when a dependent object cannot be fetched or classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationPolicy {
    /// Stop at the first error and discard verdicts gathered so far.
    #[default]
    FailFast,
    /// Visit every reference, then report the first error encountered.
    EvaluateAll,
}

impl EvaluationPolicy {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "evaluate-all" | "evaluate_all" | "all" => {
                EvaluationPolicy::EvaluateAll
            }
            _ => EvaluationPolicy::FailFast,
        }
    }
}

impl std::fmt::Display for EvaluationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationPolicy::FailFast => write!(f, "fail-fast"),
            EvaluationPolicy::EvaluateAll => write!(f, "evaluate-all"),
        }
    }
}

/// Walks a reference set in order and asks the oracle about each entry.
/// Retries are left to the caller.
#[derive(Clone)]
pub struct ReadinessEvaluator {
    oracle: Arc<dyn StatusOracle>,
    policy: EvaluationPolicy,
}

impl ReadinessEvaluator {
    pub fn new(oracle: Arc<dyn StatusOracle>, policy: EvaluationPolicy) -> Self {
        Self { oracle, policy }
    }

    pub fn policy(&self) -> EvaluationPolicy {
        self.policy
    }

    #[instrument(skip_all, fields(ns = %owner_namespace, refs = refs.len(), policy = %self.policy))]
    pub async fn evaluate(
        &self,
        owner_namespace: &str,
        refs: &[LocalObjectsRef],
    ) -> EvaluationOutcome {
        let mut unready: Vec<LocalObjectsRef> = Vec::new();
        let mut first_error: Option<EvaluationError> = None;

        for r in refs {
            let namespace = r.resolve_namespace(owner_namespace);
            match self.check(r, namespace).await {
                Ok(verdict) => {
                    debug!(
                        resource = %r.describe(owner_namespace),
                        status = %verdict.status,
                        message = %verdict.message,
                        "evaluate: classified dependent object"
                    );
                    if !verdict.is_ready() {
                        unready.push(r.clone());
                    }
                }
                Err(e) => {
                    warn!(
                        resource = %r.describe(owner_namespace),
                        error = %e,
                        "evaluate: readiness check errored"
                    );
                    match self.policy {
                        EvaluationPolicy::FailFast => {
                            return EvaluationOutcome::EvaluationFailed(e);
                        }
                        EvaluationPolicy::EvaluateAll => {
                            first_error.get_or_insert(e);
                        }
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return EvaluationOutcome::EvaluationFailed(e);
        }
        if unready.is_empty() {
            EvaluationOutcome::AllReady
        } else {
            EvaluationOutcome::SomeUnready(unready)
        }
    }

    async fn check(
        &self,
        r: &LocalObjectsRef,
        namespace: &str,
    ) -> Result<HealthVerdict, EvaluationError> {
        let obj = self
            .oracle
            .fetch(&r.group_version_resource, namespace, &r.name)
            .await?;
        Ok(self.oracle.compute(&obj)?)
    }
}
