use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition type owned by the readiness gate.
pub const CONDITION_READY: &str = "Ready";
pub const REASON_CHECKS_SUCCEEDED: &str = "ReadinessChecksSucceeded";
pub const REASON_CHECKS_FAILED: &str = "ReadinessChecksFailed";

#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default,
)]
#[kube(
    group = "api.release-promotion-operator.io",
    version = "v1alpha1",
    kind = "Promotion",
    plural = "promotions",
    namespaced,
    status = "PromotionStatus",
    printcolumn = r#"{"name":"From","type":"string","jsonPath":".spec.from.environmentRef.name"}"#,
    printcolumn = r#"{"name":"To","type":"string","jsonPath":".spec.to.environmentRef.name"}"#,
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.dependentObjectsReady"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PromotionSpec {
    /// Where to promote from.
    pub from: FromSpec,
    /// Where to promote to.
    pub to: ToSpec,
    /// How to promote.
    #[serde(default)]
    pub strategy: Strategy,
    /// Objects that must be ready before the promotion may proceed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_checks: Option<ReadinessChecks>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FromSpec {
    pub environment_ref: EnvironmentReference,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToSpec {
    pub environment_ref: EnvironmentReference,
}

/// Reference to an `Environment` in the promotion's namespace.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct EnvironmentReference {
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct Strategy {
    /// Open a change request instead of writing to the target directly.
    #[serde(rename = "pull-request", default)]
    pub pull_request: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessChecks {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_objects_ref: Vec<LocalObjectsRef>,
}

/// A dependent object whose health gates the promotion.
#[derive(
    Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "camelCase")]
pub struct LocalObjectsRef {
    pub group_version_resource: KindDescriptor,
    pub name: String,
    /// Defaults to the namespace of the owning Promotion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Group/version/resource triple; `group` is empty for the core API.
#[derive(
    Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Hash,
    Default,
)]
pub struct KindDescriptor {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl KindDescriptor {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for KindDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.resource, self.version)
        } else {
            write!(f, "{}.{}/{}", self.resource, self.group, self.version)
        }
    }
}

impl LocalObjectsRef {
    /// The namespace this reference points into. An empty string counts as
    /// unset.
    pub fn resolve_namespace<'a>(&'a self, owner_namespace: &'a str) -> &'a str {
        self.namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(owner_namespace)
    }

    pub fn describe(&self, owner_namespace: &str) -> String {
        format!(
            "{} {}/{}",
            self.group_version_resource,
            self.resolve_namespace(owner_namespace),
            self.name
        )
    }
}

impl Promotion {
    /// References whose readiness gates this promotion, in declaration order.
    pub fn readiness_refs(&self) -> &[LocalObjectsRef] {
        self.spec
            .readiness_checks
            .as_ref()
            .map(|rc| rc.local_objects_ref.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(
    Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct PromotionStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Mirrors the status of the `Ready` condition.
    #[serde(default)]
    pub dependent_objects_ready: bool,
}

impl PromotionStatus {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    #[serde(default)]
    pub message: String,
    /// RFC 3339, second precision.
    pub last_transition_time: String,
}

#[derive(
    Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq,
)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}
