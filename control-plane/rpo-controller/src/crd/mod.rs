pub mod environment;
pub mod promotion;
pub mod promotion_template;

pub use environment::{Environment, EnvironmentSpec};
pub use promotion::{
    Condition, ConditionStatus, EnvironmentReference, FromSpec, KindDescriptor,
    LocalObjectsRef, Promotion, PromotionSpec, PromotionStatus,
    ReadinessChecks, Strategy, ToSpec,
};
pub use promotion_template::{PromotionTemplate, PromotionTemplateSpec};
