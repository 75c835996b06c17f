use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::crd::{ConditionStatus, PromotionStatus};

use super::ReconcileErr;
use super::conditions::TransitionTimePolicy;
use super::evaluator::{EvaluationOutcome, ReadinessEvaluator};
use super::status::{next_status, ready_condition, ready_status};
use super::store::{PromotionStore, StoreError};

/// Result of one successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The promotion no longer exists; nothing was done.
    NotFound,
    Reconciled(Reconciled),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub evaluation: EvaluationOutcome,
    pub status: PromotionStatus,
    /// False when the computed status matched the stored one.
    pub persisted: bool,
    /// `Ready` status before this invocation, `None` on first reconcile.
    pub previous_ready: Option<ConditionStatus>,
    /// Persist attempts that ended in a conflict before this one succeeded.
    pub conflicts: u32,
}

impl Reconciled {
    pub fn transitioned(&self) -> bool {
        self.persisted
            && self.previous_ready != ready_status(Some(&self.status))
    }
}

/// Fetch → evaluate → reconcile condition → persist for a single promotion.
pub struct PromotionReconciler {
    store: Arc<dyn PromotionStore>,
    evaluator: ReadinessEvaluator,
    transition_policy: TransitionTimePolicy,
    max_conflict_retries: u32,
    evaluation_timeout: Duration,
}

impl PromotionReconciler {
    pub fn new(
        store: Arc<dyn PromotionStore>,
        evaluator: ReadinessEvaluator,
    ) -> Self {
        Self {
            store,
            evaluator,
            transition_policy: TransitionTimePolicy::default(),
            max_conflict_retries: 3,
            evaluation_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_transition_policy(
        mut self,
        policy: TransitionTimePolicy,
    ) -> Self {
        self.transition_policy = policy;
        self
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn with_evaluation_timeout(mut self, timeout: Duration) -> Self {
        self.evaluation_timeout = timeout;
        self
    }

    /// Run the loop, restarting from a fresh read whenever the status write
    /// conflicts, up to `max_conflict_retries` times.
    #[instrument(skip_all, fields(ns = %ns, name = %name))]
    pub async fn reconcile(
        &self,
        ns: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcileErr> {
        let mut conflicts = 0u32;
        loop {
            match self.run_once(ns, name, cancel).await {
                Err(StepErr::Conflict)
                    if conflicts < self.max_conflict_retries =>
                {
                    conflicts += 1;
                    debug!(%ns, %name, conflicts, "reconcile: status write conflicted; restarting from fetch");
                }
                Err(StepErr::Conflict) => {
                    return Err(ReconcileErr::PersistConflict {
                        attempts: conflicts + 1,
                    });
                }
                Err(StepErr::Fatal(e)) => return Err(e),
                Ok(ReconcileOutcome::Reconciled(mut r)) => {
                    r.conflicts = conflicts;
                    return Ok(ReconcileOutcome::Reconciled(r));
                }
                Ok(ReconcileOutcome::NotFound) => {
                    return Ok(ReconcileOutcome::NotFound);
                }
            }
        }
    }

    async fn run_once(
        &self,
        ns: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, StepErr> {
        // FetchRequest
        let promotion = match self.store.get(ns, name).await {
            Ok(Some(p)) => p,
            Ok(None) | Err(StoreError::NotFound(_)) => {
                debug!(%ns, %name, "reconcile: promotion not found; nothing to do");
                return Ok(ReconcileOutcome::NotFound);
            }
            Err(e) => {
                return Err(StepErr::Fatal(ReconcileErr::RequestFetch(
                    e.to_string(),
                )));
            }
        };

        // Evaluate
        let refs = promotion.readiness_refs();
        let evaluation = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(StepErr::Fatal(ReconcileErr::Cancelled));
            }
            res = tokio::time::timeout(
                self.evaluation_timeout,
                self.evaluator.evaluate(ns, refs),
            ) => match res {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(StepErr::Fatal(ReconcileErr::DeadlineExceeded(
                        self.evaluation_timeout,
                    )));
                }
            },
        };
        trace!(%ns, %name, ?evaluation, "reconcile: evaluation finished");

        // ReconcileCondition
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let current = promotion.status.as_ref();
        let ready = ready_condition(&evaluation, ns, &now);
        let status = next_status(current, ready, self.transition_policy);
        let previous_ready = ready_status(current);

        // Persist
        if cancel.is_cancelled() {
            return Err(StepErr::Fatal(ReconcileErr::Cancelled));
        }
        if current == Some(&status) {
            trace!(%ns, %name, "reconcile: status unchanged; skipping write");
            return Ok(ReconcileOutcome::Reconciled(Reconciled {
                evaluation,
                status,
                persisted: false,
                previous_ready,
                conflicts: 0,
            }));
        }
        match self.store.replace_status(&promotion, &status).await {
            Ok(()) => {
                info!(
                    %ns, %name,
                    ready = status.dependent_objects_ready,
                    "reconcile: status persisted"
                );
                Ok(ReconcileOutcome::Reconciled(Reconciled {
                    evaluation,
                    status,
                    persisted: true,
                    previous_ready,
                    conflicts: 0,
                }))
            }
            Err(StoreError::Conflict(_)) => Err(StepErr::Conflict),
            Err(StoreError::NotFound(_)) => {
                debug!(%ns, %name, "reconcile: promotion deleted before status write");
                Ok(ReconcileOutcome::NotFound)
            }
            Err(StoreError::Fatal(msg)) => {
                warn!(%ns, %name, error = %msg, "reconcile: status write failed");
                Err(StepErr::Fatal(ReconcileErr::PersistFatal(msg)))
            }
        }
    }
}

enum StepErr {
    Conflict,
    Fatal(ReconcileErr),
}
