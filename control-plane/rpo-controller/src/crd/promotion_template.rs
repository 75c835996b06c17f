use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::promotion::{ReadinessChecks, Strategy};

/// Reusable defaults for promotions. Not reconciled.
#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default,
)]
#[kube(
    group = "api.release-promotion-operator.io",
    version = "v1alpha1",
    kind = "PromotionTemplate",
    plural = "promotiontemplates",
    namespaced,
    status = "PromotionTemplateStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PromotionTemplateSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_checks: Option<ReadinessChecks>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct PromotionTemplateStatus {}
