//! The reconciliation engine proper: typed `Model`, `Loader`, `Validator`,
//! `Differ`/`LivePatch`, and `Planner`/`Applier`.

pub mod diffing;
pub mod dict;
pub mod differ;
pub mod loader;
pub mod model;
pub mod planner;
pub mod render;
pub mod validator;

pub use differ::LivePatch;
pub use loader::{LoadError, Loader};
pub use model::{
    BranchProtectionRule, Environment, ModelObject, Organization, OrganizationSettings, OrgWorkflowSettings,
    Repository, RepositoryWorkflowSettings, Ruleset, Secret, Webhook,
};
pub use planner::{Planner, PlannerMode, RunOutcome};
pub use render::{parse_declarative_config, render_organization, render_plan};
pub use validator::validate_organization;
