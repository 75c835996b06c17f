use crate::crd::Condition;

/// When an updated condition receives a fresh `lastTransitionTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionTimePolicy {
    /// Only when `status` changes; reason/message edits keep the old time.
    #[default]
    OnStatusChange,
    /// On every update. Repeated reconciles then rewrite the status each
    /// time.
    Always,
}

impl TransitionTimePolicy {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "always" => TransitionTimePolicy::Always,
            _ => TransitionTimePolicy::OnStatusChange,
        }
    }
}

impl std::fmt::Display for TransitionTimePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionTimePolicy::OnStatusChange => {
                write!(f, "on-status-change")
            }
            TransitionTimePolicy::Always => write!(f, "always"),
        }
    }
}

/// Merge `desired` into `existing` and return the new list.
///
/// `desired.last_transition_time` is taken as "now". An entry of the same
/// type is replaced at its current position; otherwise `desired` is appended.
/// Other condition types are carried over untouched. Stray duplicates of
/// `desired`'s type (only possible if something else wrote them) are dropped
/// so the list holds one entry per type afterwards.
pub fn upsert_condition(
    existing: &[Condition],
    desired: Condition,
    policy: TransitionTimePolicy,
) -> Vec<Condition> {
    let Some(idx) = existing.iter().position(|c| c.type_ == desired.type_)
    else {
        let mut out = existing.to_vec();
        out.push(desired);
        return out;
    };

    let prior = &existing[idx];
    let refresh = match policy {
        TransitionTimePolicy::Always => true,
        TransitionTimePolicy::OnStatusChange => prior.status != desired.status,
    };
    let merged = Condition {
        last_transition_time: if refresh {
            desired.last_transition_time
        } else {
            prior.last_transition_time.clone()
        },
        ..desired
    };

    existing
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            if i == idx {
                Some(merged.clone())
            } else if c.type_ == merged.type_ {
                None
            } else {
                Some(c.clone())
            }
        })
        .collect()
}
