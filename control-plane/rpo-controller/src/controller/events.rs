use kube::Resource;
use kube::runtime::events::{Event, EventType, Recorder};
use k8s_openapi::api::core::v1::ObjectReference;
use tracing::warn;

use crate::crd::promotion::CONDITION_READY;
use crate::crd::{ConditionStatus, Promotion};

use super::evaluator::EvaluationOutcome;
use super::reconcile::Reconciled;

pub const REASON_EVALUATION_ERROR: &str = "EvaluationError";
const ACTION_READINESS_CHECK: &str = "ReadinessCheck";

/// Publish events for a finished reconcile: one for a `Ready` transition and
/// one carrying the cause when evaluation errored.
pub async fn publish_readiness(
    recorder: &Recorder,
    obj: &Promotion,
    result: &Reconciled,
) {
    let reference = obj.object_ref(&());
    if result.transitioned() {
        if let Some(c) = result.status.condition(CONDITION_READY) {
            let type_ = if c.status == ConditionStatus::True {
                EventType::Normal
            } else {
                EventType::Warning
            };
            emit_event(
                recorder,
                &reference,
                type_,
                &c.reason,
                Some(c.message.clone()),
            )
            .await;
        }
    }
    if let EvaluationOutcome::EvaluationFailed(e) = &result.evaluation {
        emit_event(
            recorder,
            &reference,
            EventType::Warning,
            REASON_EVALUATION_ERROR,
            Some(e.to_string()),
        )
        .await;
    }
}

async fn emit_event(
    recorder: &Recorder,
    reference: &ObjectReference,
    type_: EventType,
    reason: &str,
    note: Option<String>,
) {
    let event = Event {
        type_,
        reason: reason.into(),
        note,
        action: ACTION_READINESS_CHECK.into(),
        secondary: None,
    };
    if let Err(e) = recorder.publish(&event, reference).await {
        warn!(error = %e, %reason, "events: failed to publish event");
    }
}
