use crate::crd::promotion::{
    CONDITION_READY, REASON_CHECKS_FAILED, REASON_CHECKS_SUCCEEDED,
};
use crate::crd::{Condition, ConditionStatus, PromotionStatus};

use super::conditions::{TransitionTimePolicy, upsert_condition};
use super::evaluator::{EvaluationError, EvaluationOutcome};

pub const MSG_ALL_READY: &str = "All dependent objects are ready!";
pub const MSG_FETCH_FAILED: &str = "Error fetching dependent objects!";
pub const MSG_COMPUTE_FAILED: &str =
    "Error computing status of dependent objects!";

/// The `Ready` condition an evaluation maps to. One arm per outcome, so a
/// single evaluation can never produce two different conditions.
///
/// Error details stay out of the message: they go to logs and events, and a
/// fixed message keeps repeated failures from rewriting the status.
pub fn ready_condition(
    outcome: &EvaluationOutcome,
    owner_namespace: &str,
    now: &str,
) -> Condition {
    let (status, reason, message) = match outcome {
        EvaluationOutcome::AllReady => (
            ConditionStatus::True,
            REASON_CHECKS_SUCCEEDED,
            MSG_ALL_READY.to_string(),
        ),
        EvaluationOutcome::SomeUnready(refs) => (
            ConditionStatus::False,
            REASON_CHECKS_FAILED,
            format!(
                "Dependent objects are not ready:\n{}",
                refs.iter()
                    .map(|r| format!("- {}", r.describe(owner_namespace)))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        ),
        EvaluationOutcome::EvaluationFailed(e) => (
            ConditionStatus::False,
            REASON_CHECKS_FAILED,
            match e {
                EvaluationError::Fetch(_) => MSG_FETCH_FAILED.to_string(),
                EvaluationError::Compute(_) => MSG_COMPUTE_FAILED.to_string(),
            },
        ),
    };
    Condition {
        type_: CONDITION_READY.to_string(),
        status,
        reason: reason.to_string(),
        message,
        last_transition_time: now.to_string(),
    }
}

/// Build the full replacement status from the current one and a freshly
/// computed `Ready` condition. `dependent_objects_ready` is derived from the
/// merged condition so the two fields cannot disagree.
pub fn next_status(
    current: Option<&PromotionStatus>,
    ready: Condition,
    policy: TransitionTimePolicy,
) -> PromotionStatus {
    let existing = current.map(|s| s.conditions.as_slice()).unwrap_or(&[]);
    let conditions = upsert_condition(existing, ready, policy);
    let dependent_objects_ready = conditions
        .iter()
        .find(|c| c.type_ == CONDITION_READY)
        .map(|c| c.status == ConditionStatus::True)
        .unwrap_or(false);
    PromotionStatus {
        conditions,
        dependent_objects_ready,
    }
}

/// Status of the `Ready` condition, if any.
pub fn ready_status(status: Option<&PromotionStatus>) -> Option<ConditionStatus> {
    status
        .and_then(|s| s.condition(CONDITION_READY))
        .map(|c| c.status)
}
