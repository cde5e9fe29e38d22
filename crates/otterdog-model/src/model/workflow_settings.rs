use otterdog_types::{Attr, FieldMap, Severity, ValidationContext, ValidationFailure};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dict::{attr_from, put_attr};
use crate::diffing::diff_attr;
use crate::model::ModelObject;

/// Attributes shared by the org-level and repo-level workflow policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSettingsBase {
    pub default_workflow_permissions: Attr<String>,
    pub actions_can_approve_pull_request_reviews: Attr<bool>,
    pub allowed_actions: Attr<String>,
}

impl WorkflowSettingsBase {
    fn from_dict(value: &Value) -> Self {
        Self {
            default_workflow_permissions: attr_from(value, "default_workflow_permissions"),
            actions_can_approve_pull_request_reviews: attr_from(
                value,
                "actions_can_approve_pull_request_reviews",
            ),
            allowed_actions: attr_from(value, "allowed_actions"),
        }
    }

    fn put_into(&self, obj: &mut serde_json::Map<String, Value>) {
        put_attr(obj, "default_workflow_permissions", &self.default_workflow_permissions);
        put_attr(
            obj,
            "actions_can_approve_pull_request_reviews",
            &self.actions_can_approve_pull_request_reviews,
        );
        put_attr(obj, "allowed_actions", &self.allowed_actions);
    }

    fn diff_into(&self, other: &Self, diff: &mut FieldMap) {
        diff_attr(
            diff,
            "default_workflow_permissions",
            &self.default_workflow_permissions,
            &other.default_workflow_permissions,
        );
        diff_attr(
            diff,
            "actions_can_approve_pull_request_reviews",
            &self.actions_can_approve_pull_request_reviews,
            &other.actions_can_approve_pull_request_reviews,
        );
        diff_attr(diff, "allowed_actions", &self.allowed_actions, &other.allowed_actions);
    }
}

/// Org-wide workflow policy, the "Workflow policy (1)" child of Organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgWorkflowSettings {
    pub base: WorkflowSettingsBase,
    pub enabled_repositories: Attr<String>,
}

impl OrgWorkflowSettings {
    pub fn from_declared(value: &Value) -> Self {
        Self {
            base: WorkflowSettingsBase::from_dict(value),
            enabled_repositories: attr_from(value, "enabled_repositories"),
        }
    }

    pub fn from_live(value: &Value) -> Self {
        Self::from_declared(value)
    }

    pub fn to_provider(&self) -> Value {
        let mut obj = serde_json::Map::new();
        self.base.put_into(&mut obj);
        put_attr(&mut obj, "enabled_repositories", &self.enabled_repositories);
        Value::Object(obj)
    }
}

impl ModelObject for OrgWorkflowSettings {
    fn model_object_name(&self) -> &'static str {
        "OrgWorkflowSettings"
    }

    fn get_difference_from(&self, other: &Self) -> FieldMap {
        let mut diff = FieldMap::new();
        self.base.diff_into(&other.base, &mut diff);
        diff_attr(
            &mut diff,
            "enabled_repositories",
            &self.enabled_repositories,
            &other.enabled_repositories,
        );
        diff
    }
}

/// Per-repo workflow policy. Carries the forced-update quirk (§4.4) and the
/// enabled-gated field masking (§4.1 supplement).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryWorkflowSettings {
    pub base: WorkflowSettingsBase,
    pub enabled: Attr<bool>,
}

impl RepositoryWorkflowSettings {
    pub fn from_declared(value: &Value) -> Self {
        Self {
            base: WorkflowSettingsBase::from_dict(value),
            enabled: attr_from(value, "enabled"),
        }
    }

    pub fn from_live(value: &Value) -> Self {
        Self::from_declared(value)
    }

    pub fn to_provider(&self) -> Value {
        let mut obj = serde_json::Map::new();
        if matches!(self.enabled, Attr::Set(false)) {
            // Mirrors the reference implementation's payload shape: once
            // Actions is disabled for the repo, nothing else in the bundle
            // is meaningful to send.
            put_attr(&mut obj, "enabled", &self.enabled);
            return Value::Object(obj);
        }
        self.base.put_into(&mut obj);
        put_attr(&mut obj, "enabled", &self.enabled);
        Value::Object(obj)
    }

    /// §3 invariant 4 / §4.3 supplement: per-repo settings may only be more
    /// permissive than the org-level policy when the org allows it.
    pub fn validate(&self, context: &str, org: &OrgWorkflowSettings, ctx: &mut ValidationContext) {
        if let (Attr::Set(true), Attr::Set(org_enabled_repos)) =
            (&self.enabled, &org.enabled_repositories)
        {
            if org_enabled_repos == "none" {
                ctx.push(ValidationFailure {
                    severity: Severity::Error,
                    context: context.to_string(),
                    message: "repository enables Actions but the org policy is enabled_repositories=\"none\"".into(),
                });
            }
        }
        if let (Attr::Set(repo_perm), Attr::Set(org_perm)) = (
            &self.base.default_workflow_permissions,
            &org.base.default_workflow_permissions,
        ) {
            if repo_perm == "write" && org_perm == "read" {
                ctx.push(ValidationFailure {
                    severity: Severity::Error,
                    context: context.to_string(),
                    message: "repository requests default_workflow_permissions=\"write\" but the org fixes it to \"read\"".into(),
                });
            }
        }
    }
}

impl ModelObject for RepositoryWorkflowSettings {
    fn model_object_name(&self) -> &'static str {
        "RepositoryWorkflowSettings"
    }

    /// `enabled` always participates. Every other field only participates
    /// when the expected side has Actions enabled — once disabled, the rest
    /// of the bundle is unobservable.
    fn include_field_for_diff_computation(&self, field: &str) -> bool {
        if field == "enabled" {
            return true;
        }
        !matches!(self.enabled, Attr::Set(false))
    }

    fn get_difference_from(&self, other: &Self) -> FieldMap {
        let mut diff = FieldMap::new();
        if self.include_field_for_diff_computation("default_workflow_permissions") {
            self.base.diff_into(&other.base, &mut diff);
        }
        diff_attr(&mut diff, "enabled", &self.enabled, &other.enabled);
        // Forced-update rule: sending `allowed_actions` without `enabled`
        // fails validation on the provider side, so inject it even if the
        // expected and current `enabled` values agree.
        if diff.contains_key("allowed_actions") && !diff.contains_key("enabled") {
            if let (Attr::Set(e), Attr::Set(c)) = (&self.enabled, &other.enabled) {
                diff.insert(
                    "enabled",
                    otterdog_types::Change::new(serde_json::to_value(e).unwrap(), serde_json::to_value(c).unwrap()),
                );
            }
        }
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_actions_change_forces_enabled_into_the_diff() {
        let expected = RepositoryWorkflowSettings {
            base: WorkflowSettingsBase {
                allowed_actions: Attr::Set("all".into()),
                ..Default::default()
            },
            enabled: Attr::Set(true),
        };
        let current = RepositoryWorkflowSettings {
            base: WorkflowSettingsBase {
                allowed_actions: Attr::Set("selected".into()),
                ..Default::default()
            },
            enabled: Attr::Set(true),
        };
        let diff = expected.get_difference_from(&current);
        assert!(diff.contains_key("allowed_actions"));
        assert!(diff.contains_key("enabled"));
        assert_eq!(diff["enabled"].expected, diff["enabled"].current);
    }

    #[test]
    fn disabling_actions_masks_the_rest_of_the_bundle() {
        let settings = RepositoryWorkflowSettings {
            enabled: Attr::Set(false),
            ..Default::default()
        };
        assert!(settings.include_field_for_diff_computation("enabled"));
        assert!(!settings.include_field_for_diff_computation("allowed_actions"));
    }

    #[test]
    fn org_none_conflicts_with_repo_level_enable() {
        let repo = RepositoryWorkflowSettings {
            enabled: Attr::Set(true),
            ..Default::default()
        };
        let org = OrgWorkflowSettings {
            enabled_repositories: Attr::Set("none".into()),
            ..Default::default()
        };
        let mut ctx = ValidationContext::new();
        repo.validate("repo[name=\"x\"]", &org, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }
}
