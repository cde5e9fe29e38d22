use otterdog_types::{Attr, FieldMap, UnorderedList};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dict::{attr_from, attr_from_path, put_attr};
use crate::diffing::diff_attr;
use crate::model::{
    BranchProtectionRule, ModelObject, OrgWorkflowSettings, Repository, Ruleset, Secret, Webhook,
};

/// Scalar attributes of the org itself. Workflow policy lives in
/// `OrgWorkflowSettings`, a separate owned child, matching the data model
/// table's "Workflow policy (1)" row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSettings {
    pub name: Attr<String>,
    pub description: Attr<String>,
    pub plan: Attr<String>,
    pub default_repository_permission: Attr<String>,
    pub two_factor_requirement: Attr<bool>,
    pub web_commit_signoff_required: Attr<bool>,
    pub members_can_create_public_repositories: Attr<bool>,
    pub members_can_fork_private_repositories: Attr<bool>,
    /// Team slugs. Resolved and merged in by the Provider, not present on a
    /// plain `GET /orgs/{org}` response (§4.6 supplement).
    pub security_managers: Attr<UnorderedList<String>>,
}

impl OrganizationSettings {
    pub fn from_declared(value: &Value) -> Self {
        Self {
            name: attr_from(value, "name"),
            description: attr_from(value, "description"),
            // Billing plan is reported by GitHub, never declared.
            plan: Attr::Unset,
            default_repository_permission: attr_from(value, "default_repository_permission"),
            two_factor_requirement: attr_from(value, "two_factor_requirement"),
            web_commit_signoff_required: attr_from(value, "web_commit_signoff_required"),
            members_can_create_public_repositories: attr_from(
                value,
                "members_can_create_public_repositories",
            ),
            members_can_fork_private_repositories: attr_from(
                value,
                "members_can_fork_private_repositories",
            ),
            security_managers: attr_from(value, "security_managers"),
        }
    }

    pub fn from_live(value: &Value) -> Self {
        Self {
            name: attr_from(value, "name"),
            description: attr_from(value, "description"),
            plan: attr_from_path(value, &["plan", "name"]),
            default_repository_permission: attr_from(value, "default_repository_permission"),
            two_factor_requirement: attr_from_path(value, &["two_factor_requirement_enabled"]),
            web_commit_signoff_required: attr_from(value, "web_commit_signoff_required"),
            members_can_create_public_repositories: attr_from(
                value,
                "members_can_create_public_repositories",
            ),
            members_can_fork_private_repositories: attr_from(
                value,
                "members_can_fork_private_repositories",
            ),
            security_managers: attr_from(value, "security_managers"),
        }
    }

    pub fn to_provider(&self) -> Value {
        let mut obj = serde_json::Map::new();
        put_attr(&mut obj, "name", &self.name);
        put_attr(&mut obj, "description", &self.description);
        put_attr(
            &mut obj,
            "default_repository_permission",
            &self.default_repository_permission,
        );
        put_attr(&mut obj, "two_factor_requirement", &self.two_factor_requirement);
        put_attr(
            &mut obj,
            "web_commit_signoff_required",
            &self.web_commit_signoff_required,
        );
        put_attr(
            &mut obj,
            "members_can_create_public_repositories",
            &self.members_can_create_public_repositories,
        );
        put_attr(
            &mut obj,
            "members_can_fork_private_repositories",
            &self.members_can_fork_private_repositories,
        );
        put_attr(&mut obj, "security_managers", &self.security_managers);
        Value::Object(obj)
    }
}

impl ModelObject for OrganizationSettings {
    fn model_object_name(&self) -> &'static str {
        "OrganizationSettings"
    }

    fn get_difference_from(&self, other: &Self) -> FieldMap {
        let mut diff = FieldMap::new();
        diff_attr(&mut diff, "name", &self.name, &other.name);
        diff_attr(&mut diff, "description", &self.description, &other.description);
        diff_attr(
            &mut diff,
            "default_repository_permission",
            &self.default_repository_permission,
            &other.default_repository_permission,
        );
        diff_attr(
            &mut diff,
            "two_factor_requirement",
            &self.two_factor_requirement,
            &other.two_factor_requirement,
        );
        diff_attr(
            &mut diff,
            "web_commit_signoff_required",
            &self.web_commit_signoff_required,
            &other.web_commit_signoff_required,
        );
        diff_attr(
            &mut diff,
            "members_can_create_public_repositories",
            &self.members_can_create_public_repositories,
            &other.members_can_create_public_repositories,
        );
        diff_attr(
            &mut diff,
            "members_can_fork_private_repositories",
            &self.members_can_fork_private_repositories,
            &other.members_can_fork_private_repositories,
        );
        diff_attr(
            &mut diff,
            "security_managers",
            &self.security_managers,
            &other.security_managers,
        );
        diff
    }
}

/// The tree root. `github_id` is the org's key within the process (there is
/// no parent collection to deduplicate against).
#[derive(Debug, Clone, Default)]
pub struct Organization {
    pub github_id: String,
    pub settings: OrganizationSettings,
    pub workflow_settings: OrgWorkflowSettings,
    pub webhooks: Vec<Webhook>,
    pub repositories: Vec<Repository>,
    pub secrets: Vec<Secret>,
    pub rulesets: Vec<Ruleset>,
}

impl Organization {
    pub fn new(github_id: impl Into<String>) -> Self {
        Self {
            github_id: github_id.into(),
            ..Default::default()
        }
    }

    /// All branch protection rules across every repository, used by the
    /// validator and by `requires_secrets` scans that need a flat view.
    pub fn all_branch_protection_rules(&self) -> impl Iterator<Item = (&Repository, &BranchProtectionRule)> {
        self.repositories
            .iter()
            .flat_map(|repo| repo.branch_protection_rules.iter().map(move |rule| (repo, rule)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_field_is_never_in_the_diff() {
        let expected = OrganizationSettings {
            web_commit_signoff_required: Attr::Unset,
            ..Default::default()
        };
        let current = OrganizationSettings {
            web_commit_signoff_required: Attr::Set(false),
            ..Default::default()
        };
        let diff = expected.get_difference_from(&current);
        assert!(!diff.contains_key("web_commit_signoff_required"));
    }

    #[test]
    fn changed_scalar_is_recorded() {
        let expected = OrganizationSettings {
            web_commit_signoff_required: Attr::Set(true),
            ..Default::default()
        };
        let current = OrganizationSettings {
            web_commit_signoff_required: Attr::Set(false),
            ..Default::default()
        };
        let diff = expected.get_difference_from(&current);
        assert_eq!(diff["web_commit_signoff_required"].expected, serde_json::json!(true));
        assert_eq!(diff["web_commit_signoff_required"].current, serde_json::json!(false));
    }

    #[test]
    fn to_provider_round_trips_through_from_declared() {
        let settings = OrganizationSettings {
            name: Attr::Set("acme".to_string()),
            default_repository_permission: Attr::Set("read".to_string()),
            ..Default::default()
        };
        let rendered = settings.to_provider();
        let reloaded = OrganizationSettings::from_declared(&rendered);
        assert_eq!(reloaded.name, Attr::Set("acme".to_string()));
        assert_eq!(reloaded.default_repository_permission, Attr::Set("read".to_string()));
        assert!(reloaded.description.is_unset());
    }
}
