use kube::ResourceExt;
use kube::core::DynamicObject;
use serde_json::Value;

use super::{ComputeError, HealthStatus, HealthVerdict};

/// Classify a fetched object.
///
/// Rules are checked in order: deletion in progress, unobserved generation,
/// then kind-specific rules. Kinds without a dedicated rule fall back to the
/// conventional `Ready`/`Stalled`/`Reconciling` conditions; objects that
/// expose no status at all are treated as ready.
pub fn compute(obj: &DynamicObject) -> Result<HealthVerdict, ComputeError> {
    let kind = obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("");
    let err = |message: String| ComputeError {
        object: format!(
            "{} {}/{}",
            if kind.is_empty() { "object" } else { kind },
            obj.namespace().unwrap_or_default(),
            obj.name_any()
        ),
        message,
    };

    if obj.metadata.deletion_timestamp.is_some() {
        return Ok(HealthVerdict::new(
            HealthStatus::Terminating,
            "Resource scheduled for deletion",
        ));
    }

    let status = match obj.data.get("status") {
        None | Some(Value::Null) => {
            return Ok(HealthVerdict::new(
                HealthStatus::Ready,
                "Resource is current",
            ));
        }
        Some(s) if s.is_object() => s,
        Some(_) => return Err(err(".status is not an object".into())),
    };

    let observed_generation =
        int_at(status, &["observedGeneration"]).map_err(&err)?;
    if let Some(observed) = observed_generation {
        if let Some(generation) = obj.metadata.generation {
            if observed < generation {
                return Ok(HealthVerdict::new(
                    HealthStatus::InProgress,
                    format!(
                        "Generation {} not yet observed (observed {})",
                        generation, observed
                    ),
                ));
            }
        }
    }

    let spec = obj.data.get("spec").unwrap_or(&Value::Null);
    let verdict = match kind {
        "Deployment" => deployment(spec, status),
        "StatefulSet" => stateful_set(spec, status),
        "DaemonSet" => daemon_set(status),
        "ReplicaSet" => replica_set(spec, status),
        "Job" => job(status),
        "Pod" => pod(status),
        "PersistentVolumeClaim" => claim(status),
        "Service" => service(spec, status),
        _ => generic(status),
    };
    verdict.map_err(err)
}

type Verdict = Result<HealthVerdict, String>;

fn in_progress(message: String) -> Verdict {
    Ok(HealthVerdict::new(HealthStatus::InProgress, message))
}

fn deployment(spec: &Value, status: &Value) -> Verdict {
    let desired = int_at(spec, &["replicas"])?.unwrap_or(1);
    let replicas = int_at(status, &["replicas"])?.unwrap_or(0);
    let updated = int_at(status, &["updatedReplicas"])?.unwrap_or(0);
    let ready = int_at(status, &["readyReplicas"])?.unwrap_or(0);
    let available = int_at(status, &["availableReplicas"])?.unwrap_or(0);

    if let Some(progressing) = find_condition(status, "Progressing")? {
        if progressing.reason == Some("ProgressDeadlineExceeded") {
            return Ok(HealthVerdict::new(
                HealthStatus::Failed,
                "Progress deadline exceeded",
            ));
        }
    }
    if desired > updated {
        return in_progress(format!("Updated: {}/{}", updated, desired));
    }
    if replicas > updated {
        return in_progress(format!(
            "Pending termination: {}",
            replicas - updated
        ));
    }
    if desired > available {
        return in_progress(format!("Available: {}/{}", available, desired));
    }
    if desired > ready {
        return in_progress(format!("Ready: {}/{}", ready, desired));
    }
    Ok(HealthVerdict::new(
        HealthStatus::Ready,
        format!("Deployment is available. Replicas: {}", replicas),
    ))
}

fn stateful_set(spec: &Value, status: &Value) -> Verdict {
    let desired = int_at(spec, &["replicas"])?.unwrap_or(1);
    let ready = int_at(status, &["readyReplicas"])?.unwrap_or(0);
    let current = int_at(status, &["currentReplicas"])?.unwrap_or(0);
    let updated = int_at(status, &["updatedReplicas"])?.unwrap_or(0);
    let on_delete =
        str_at(spec, &["updateStrategy", "type"])? == Some("OnDelete");

    if desired > ready {
        return in_progress(format!("Ready: {}/{}", ready, desired));
    }
    if on_delete {
        return Ok(HealthVerdict::new(
            HealthStatus::Ready,
            format!("StatefulSet is ready. Replicas: {}", ready),
        ));
    }
    let partition =
        int_at(spec, &["updateStrategy", "rollingUpdate", "partition"])?
            .unwrap_or(0);
    if partition > 0 {
        let expected = (desired - partition).max(0);
        if updated < expected {
            return in_progress(format!(
                "Partitioned rollout: {}/{} updated",
                updated, expected
            ));
        }
        return Ok(HealthVerdict::new(
            HealthStatus::Ready,
            format!("Partitioned rollout complete: {} updated", updated),
        ));
    }
    if desired > current {
        return in_progress(format!("Current: {}/{}", current, desired));
    }
    let current_rev = str_at(status, &["currentRevision"])?;
    let update_rev = str_at(status, &["updateRevision"])?;
    if current_rev != update_rev {
        return in_progress(format!(
            "Waiting for revision {} to roll out",
            update_rev.unwrap_or("<unknown>")
        ));
    }
    Ok(HealthVerdict::new(
        HealthStatus::Ready,
        format!("StatefulSet is ready. Replicas: {}", ready),
    ))
}

fn daemon_set(status: &Value) -> Verdict {
    let Some(desired) = int_at(status, &["desiredNumberScheduled"])? else {
        return in_progress("Missing .status.desiredNumberScheduled".into());
    };
    let scheduled = int_at(status, &["currentNumberScheduled"])?.unwrap_or(0);
    let updated = int_at(status, &["updatedNumberScheduled"])?.unwrap_or(0);
    let available = int_at(status, &["numberAvailable"])?.unwrap_or(0);
    let ready = int_at(status, &["numberReady"])?.unwrap_or(0);

    if desired > scheduled {
        return in_progress(format!("Scheduled: {}/{}", scheduled, desired));
    }
    if desired > updated {
        return in_progress(format!("Updated: {}/{}", updated, desired));
    }
    if desired > available {
        return in_progress(format!("Available: {}/{}", available, desired));
    }
    if desired > ready {
        return in_progress(format!("Ready: {}/{}", ready, desired));
    }
    Ok(HealthVerdict::new(
        HealthStatus::Ready,
        format!("All replicas scheduled as expected. Replicas: {}", desired),
    ))
}

fn replica_set(spec: &Value, status: &Value) -> Verdict {
    let desired = int_at(spec, &["replicas"])?.unwrap_or(1);
    let ready = int_at(status, &["readyReplicas"])?.unwrap_or(0);
    let available = int_at(status, &["availableReplicas"])?.unwrap_or(0);
    if let Some(c) = find_condition(status, "ReplicaFailure")? {
        if c.status == Some("True") {
            return in_progress(format!(
                "Replica failure: {}",
                c.message.unwrap_or("no message")
            ));
        }
    }
    if desired > available {
        return in_progress(format!("Available: {}/{}", available, desired));
    }
    if desired > ready {
        return in_progress(format!("Ready: {}/{}", ready, desired));
    }
    Ok(HealthVerdict::new(
        HealthStatus::Ready,
        format!("ReplicaSet is available. Replicas: {}", desired),
    ))
}

fn job(status: &Value) -> Verdict {
    if let Some(c) = find_condition(status, "Failed")? {
        if c.status == Some("True") {
            return Ok(HealthVerdict::new(
                HealthStatus::Failed,
                format!("Job failed: {}", c.message.unwrap_or("no message")),
            ));
        }
    }
    if let Some(c) = find_condition(status, "Complete")? {
        if c.status == Some("True") {
            return Ok(HealthVerdict::new(HealthStatus::Ready, "Job completed"));
        }
    }
    let active = int_at(status, &["active"])?.unwrap_or(0);
    let succeeded = int_at(status, &["succeeded"])?.unwrap_or(0);
    in_progress(format!(
        "Job in progress. active: {}, succeeded: {}",
        active, succeeded
    ))
}

fn pod(status: &Value) -> Verdict {
    match str_at(status, &["phase"])? {
        Some("Succeeded") => {
            Ok(HealthVerdict::new(HealthStatus::Ready, "Pod has completed"))
        }
        Some("Failed") => Ok(HealthVerdict::new(
            HealthStatus::Failed,
            "Pod has completed, but not successfully",
        )),
        Some("Running") => {
            let ready = find_condition(status, "Ready")?
                .map(|c| c.status == Some("True"))
                .unwrap_or(false);
            if ready {
                Ok(HealthVerdict::new(HealthStatus::Ready, "Pod is Ready"))
            } else {
                in_progress("Pod is running but not ready".into())
            }
        }
        Some(phase) => in_progress(format!("Pod phase: {}", phase)),
        None => in_progress("Pod phase not available".into()),
    }
}

fn claim(status: &Value) -> Verdict {
    match str_at(status, &["phase"])? {
        Some("Bound") => {
            Ok(HealthVerdict::new(HealthStatus::Ready, "PVC is Bound"))
        }
        Some("Lost") => {
            Ok(HealthVerdict::new(HealthStatus::Failed, "PVC lost its volume"))
        }
        other => in_progress(format!(
            "PVC is not Bound. phase: {}",
            other.unwrap_or("<none>")
        )),
    }
}

fn service(spec: &Value, status: &Value) -> Verdict {
    if str_at(spec, &["type"])? == Some("LoadBalancer") {
        let has_ingress = status
            .get("loadBalancer")
            .and_then(|lb| lb.get("ingress"))
            .and_then(Value::as_array)
            .map(|a| !a.is_empty())
            .unwrap_or(false);
        if !has_ingress {
            return in_progress("LoadBalancer ingress not yet assigned".into());
        }
    }
    Ok(HealthVerdict::new(HealthStatus::Ready, "Service is ready"))
}

fn generic(status: &Value) -> Verdict {
    if let Some(c) = find_condition(status, "Stalled")? {
        if c.status == Some("True") {
            return Ok(HealthVerdict::new(
                HealthStatus::Failed,
                c.message.unwrap_or("Resource is stalled"),
            ));
        }
    }
    if let Some(c) = find_condition(status, "Reconciling")? {
        if c.status == Some("True") {
            return in_progress(
                c.message.unwrap_or("Resource is reconciling").into(),
            );
        }
    }
    match find_condition(status, "Ready")? {
        Some(c) => match c.status {
            Some("True") => Ok(HealthVerdict::new(
                HealthStatus::Ready,
                c.message.unwrap_or("Resource is Ready"),
            )),
            Some("False") => in_progress(
                c.message.unwrap_or("Resource is not Ready").into(),
            ),
            _ => Ok(HealthVerdict::new(
                HealthStatus::Unknown,
                c.message.unwrap_or("Readiness is unknown"),
            )),
        },
        None => {
            Ok(HealthVerdict::new(HealthStatus::Ready, "Resource is current"))
        }
    }
}

struct ConditionView<'a> {
    status: Option<&'a str>,
    reason: Option<&'a str>,
    message: Option<&'a str>,
}

fn find_condition<'a>(
    status: &'a Value,
    type_: &str,
) -> Result<Option<ConditionView<'a>>, String> {
    let conditions = match status.get("conditions") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(".status.conditions is not a list".into()),
    };
    Ok(conditions
        .iter()
        .find(|c| c.get("type").and_then(Value::as_str) == Some(type_))
        .map(|c| ConditionView {
            status: c.get("status").and_then(Value::as_str),
            reason: c.get("reason").and_then(Value::as_str),
            message: c.get("message").and_then(Value::as_str),
        }))
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |v, key| v.get(key))
        .filter(|v| !v.is_null())
}

fn int_at(root: &Value, path: &[&str]) -> Result<Option<i64>, String> {
    match lookup(root, path) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!(".{} is not an integer", path.join("."))),
    }
}

fn str_at<'a>(
    root: &'a Value,
    path: &[&str],
) -> Result<Option<&'a str>, String> {
    match lookup(root, path) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| format!(".{} is not a string", path.join("."))),
    }
}
