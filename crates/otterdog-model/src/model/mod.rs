//! Typed representation of a hosted organization: settings, webhooks,
//! repositories, and their owned children. Every node exposes the
//! operations named in the component design: `model_object_name`,
//! `include_field_for_diff_computation`, and `get_difference_from`.

pub mod branch_protection;
pub mod environment;
pub mod organization;
pub mod repository;
pub mod ruleset;
pub mod secret;
pub mod webhook;
pub mod workflow_settings;

pub use branch_protection::BranchProtectionRule;
pub use environment::Environment;
pub use organization::{Organization, OrganizationSettings};
pub use repository::Repository;
pub use ruleset::Ruleset;
pub use secret::Secret;
pub use webhook::Webhook;
pub use workflow_settings::{OrgWorkflowSettings, RepositoryWorkflowSettings, WorkflowSettingsBase};

use otterdog_types::FieldMap;

/// Shared contract every entity implements. The differ and applier dispatch
/// on entity *kind* directly (a closed tagged union, not `dyn ModelObject`)
/// — this trait exists so each entity's diff surface reads the same way the
/// component design names it.
pub trait ModelObject {
    fn model_object_name(&self) -> &'static str;

    /// Default: every field participates in diffing. Entities override this
    /// to mask fields per an archive/private/disabled policy (§4.1, §3).
    fn include_field_for_diff_computation(&self, _field: &str) -> bool {
        true
    }

    fn get_difference_from(&self, other: &Self) -> FieldMap
    where
        Self: Sized;
}
