use otterdog_types::{Attr, FieldMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dict::{attr_from, attr_from_path, put_attr};
use crate::diffing::diff_attr;
use crate::model::{
    BranchProtectionRule, Environment, ModelObject, Ruleset, RepositoryWorkflowSettings, Secret,
};

/// §3 invariant 2: attributes unobservable once a repository is archived,
/// covering both merge-policy and alerts attributes.
const ARCHIVE_FROZEN_FIELDS: &[&str] = &[
    "allow_merge_commit",
    "allow_squash_merge",
    "allow_rebase_merge",
    "delete_branch_on_merge",
    "has_issues",
    "has_projects",
    "dependabot_alerts_enabled",
];

/// §3 invariant 3: excluded once the repository is private.
const PRIVATE_MASKED_FIELDS: &[&str] = &["secret_scanning", "secret_scanning_push_protection"];

/// §4.4 supplement: a repository generated from a template already has these
/// copied in from the template at creation time; redeclaring them on the
/// same creation call would fight the template's own values.
const TEMPLATE_INHERITED_FIELDS: &[&str] = &[
    "allow_merge_commit",
    "allow_squash_merge",
    "allow_rebase_merge",
    "delete_branch_on_merge",
    "has_issues",
    "has_projects",
    "has_wiki",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub description: Attr<String>,
    pub private: Attr<bool>,
    pub archived: Attr<bool>,
    pub allow_merge_commit: Attr<bool>,
    pub allow_squash_merge: Attr<bool>,
    pub allow_rebase_merge: Attr<bool>,
    pub delete_branch_on_merge: Attr<bool>,
    pub has_issues: Attr<bool>,
    pub has_wiki: Attr<bool>,
    pub has_projects: Attr<bool>,
    pub allow_forking: Attr<bool>,
    pub web_commit_signoff_required: Attr<bool>,
    pub secret_scanning: Attr<String>,
    pub secret_scanning_push_protection: Attr<String>,
    pub dependabot_alerts_enabled: Attr<bool>,
    pub workflow_settings: RepositoryWorkflowSettings,
    pub branch_protection_rules: Vec<BranchProtectionRule>,
    pub secrets: Vec<Secret>,
    pub rulesets: Vec<Ruleset>,
    pub environments: Vec<Environment>,
    /// Created from a repo template rather than from scratch; consulted by
    /// `to_provider_for_add` to skip fields the template already set.
    pub created_from_template: bool,
}

impl Repository {
    pub fn from_declared(name: impl Into<String>, value: &Value) -> Self {
        let name = name.into();
        let workflow_settings = value
            .get("workflow_settings")
            .map(RepositoryWorkflowSettings::from_declared)
            .unwrap_or_default();
        let branch_protection_rules = value
            .get("branch_protection_rules")
            .and_then(Value::as_object)
            .map(|rules| {
                rules
                    .iter()
                    .map(|(pattern, v)| BranchProtectionRule::from_declared(pattern, v))
                    .collect()
            })
            .unwrap_or_default();
        let secrets = value
            .get("secrets")
            .and_then(Value::as_object)
            .map(|secrets| secrets.iter().map(|(name, v)| Secret::from_declared(name, v)).collect())
            .unwrap_or_default();
        let rulesets = value
            .get("rulesets")
            .and_then(Value::as_object)
            .map(|rulesets| rulesets.iter().map(|(name, v)| Ruleset::from_declared(name, v)).collect())
            .unwrap_or_default();
        let environments = value
            .get("environments")
            .and_then(Value::as_object)
            .map(|environments| {
                environments
                    .iter()
                    .map(|(name, v)| Environment::from_declared(name, v))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            name,
            description: attr_from(value, "description"),
            private: attr_from(value, "private"),
            archived: attr_from(value, "archived"),
            allow_merge_commit: attr_from(value, "allow_merge_commit"),
            allow_squash_merge: attr_from(value, "allow_squash_merge"),
            allow_rebase_merge: attr_from(value, "allow_rebase_merge"),
            delete_branch_on_merge: attr_from(value, "delete_branch_on_merge"),
            has_issues: attr_from(value, "has_issues"),
            has_wiki: attr_from(value, "has_wiki"),
            has_projects: attr_from(value, "has_projects"),
            allow_forking: attr_from(value, "allow_forking"),
            web_commit_signoff_required: attr_from(value, "web_commit_signoff_required"),
            secret_scanning: attr_from(value, "secret_scanning"),
            secret_scanning_push_protection: attr_from(value, "secret_scanning_push_protection"),
            dependabot_alerts_enabled: attr_from(value, "dependabot_alerts_enabled"),
            workflow_settings,
            branch_protection_rules,
            secrets,
            rulesets,
            environments,
            created_from_template: value
                .get("template_repository")
                .and_then(Value::as_str)
                .is_some(),
        }
    }

    pub fn from_live(value: &Value) -> Self {
        let name = value["name"].as_str().unwrap_or_default().to_string();
        let mut repo = Self::from_declared(&name, value);
        repo.secret_scanning = attr_from_path(
            value,
            &["security_and_analysis", "secret_scanning", "status"],
        );
        repo.secret_scanning_push_protection = attr_from_path(
            value,
            &["security_and_analysis", "secret_scanning_push_protection", "status"],
        );
        let dependabot_status: Attr<String> = attr_from_path(
            value,
            &["security_and_analysis", "dependabot_security_updates", "status"],
        );
        repo.dependabot_alerts_enabled = dependabot_status.map(|status| status == "enabled");
        repo.created_from_template = false;
        repo
    }

    pub fn to_provider(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("name".to_string(), Value::String(self.name.clone()));
        put_attr(&mut obj, "description", &self.description);
        put_attr(&mut obj, "private", &self.private);
        put_attr(&mut obj, "archived", &self.archived);
        if self.include_field_for_diff_computation("allow_merge_commit") {
            put_attr(&mut obj, "allow_merge_commit", &self.allow_merge_commit);
            put_attr(&mut obj, "allow_squash_merge", &self.allow_squash_merge);
            put_attr(&mut obj, "allow_rebase_merge", &self.allow_rebase_merge);
            put_attr(&mut obj, "delete_branch_on_merge", &self.delete_branch_on_merge);
            put_attr(&mut obj, "has_issues", &self.has_issues);
            put_attr(&mut obj, "has_projects", &self.has_projects);
        }
        if self.include_field_for_diff_computation("dependabot_alerts_enabled") {
            put_attr(&mut obj, "dependabot_alerts_enabled", &self.dependabot_alerts_enabled);
        }
        put_attr(&mut obj, "has_wiki", &self.has_wiki);
        put_attr(&mut obj, "allow_forking", &self.allow_forking);
        put_attr(&mut obj, "web_commit_signoff_required", &self.web_commit_signoff_required);
        if self.include_field_for_diff_computation("secret_scanning") {
            put_attr(&mut obj, "secret_scanning", &self.secret_scanning);
            put_attr(
                &mut obj,
                "secret_scanning_push_protection",
                &self.secret_scanning_push_protection,
            );
        }
        Value::Object(obj)
    }

    /// The payload for a Repository ADD patch. Identical to `to_provider`
    /// except when `created_from_template`, where the fields the template
    /// already set are dropped so the creation call doesn't redeclare them.
    pub fn to_provider_for_add(&self) -> Value {
        let mut payload = self.to_provider();
        if self.created_from_template {
            if let Some(obj) = payload.as_object_mut() {
                for field in TEMPLATE_INHERITED_FIELDS {
                    obj.remove(*field);
                }
            }
        }
        payload
    }
}

impl ModelObject for Repository {
    fn model_object_name(&self) -> &'static str {
        "Repository"
    }

    fn include_field_for_diff_computation(&self, field: &str) -> bool {
        if ARCHIVE_FROZEN_FIELDS.contains(&field) && matches!(self.archived, Attr::Set(true)) {
            return false;
        }
        if PRIVATE_MASKED_FIELDS.contains(&field) && matches!(self.private, Attr::Set(true)) {
            return false;
        }
        true
    }

    fn get_difference_from(&self, other: &Self) -> FieldMap {
        let mut diff = FieldMap::new();
        diff_attr(&mut diff, "description", &self.description, &other.description);
        diff_attr(&mut diff, "private", &self.private, &other.private);
        diff_attr(&mut diff, "archived", &self.archived, &other.archived);
        for field in ARCHIVE_FROZEN_FIELDS {
            if !self.include_field_for_diff_computation(field) || !other.include_field_for_diff_computation(field) {
                continue;
            }
            match *field {
                "allow_merge_commit" => diff_attr(&mut diff, field, &self.allow_merge_commit, &other.allow_merge_commit),
                "allow_squash_merge" => diff_attr(&mut diff, field, &self.allow_squash_merge, &other.allow_squash_merge),
                "allow_rebase_merge" => diff_attr(&mut diff, field, &self.allow_rebase_merge, &other.allow_rebase_merge),
                "delete_branch_on_merge" => {
                    diff_attr(&mut diff, field, &self.delete_branch_on_merge, &other.delete_branch_on_merge)
                }
                "has_issues" => diff_attr(&mut diff, field, &self.has_issues, &other.has_issues),
                "has_projects" => diff_attr(&mut diff, field, &self.has_projects, &other.has_projects),
                "dependabot_alerts_enabled" => {
                    diff_attr(&mut diff, field, &self.dependabot_alerts_enabled, &other.dependabot_alerts_enabled)
                }
                _ => unreachable!(),
            }
        }
        diff_attr(&mut diff, "has_wiki", &self.has_wiki, &other.has_wiki);
        diff_attr(&mut diff, "allow_forking", &self.allow_forking, &other.allow_forking);
        diff_attr(
            &mut diff,
            "web_commit_signoff_required",
            &self.web_commit_signoff_required,
            &other.web_commit_signoff_required,
        );
        if self.include_field_for_diff_computation("secret_scanning")
            && other.include_field_for_diff_computation("secret_scanning")
        {
            diff_attr(&mut diff, "secret_scanning", &self.secret_scanning, &other.secret_scanning);
            diff_attr(
                &mut diff,
                "secret_scanning_push_protection",
                &self.secret_scanning_push_protection,
                &other.secret_scanning_push_protection,
            );
        }
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archived_repository_masks_merge_policy_fields() {
        let repo = Repository {
            archived: Attr::Set(true),
            ..Default::default()
        };
        assert!(!repo.include_field_for_diff_computation("allow_merge_commit"));
        assert!(repo.include_field_for_diff_computation("description"));
    }

    #[test]
    fn archived_repository_merge_policy_diff_is_suppressed() {
        let expected = Repository {
            archived: Attr::Set(true),
            allow_merge_commit: Attr::Set(true),
            ..Default::default()
        };
        let current = Repository {
            archived: Attr::Set(true),
            allow_merge_commit: Attr::Set(false),
            ..Default::default()
        };
        let diff = expected.get_difference_from(&current);
        assert!(!diff.contains_key("allow_merge_commit"));
    }

    #[test]
    fn private_repository_masks_secret_scanning() {
        let repo = Repository {
            private: Attr::Set(true),
            ..Default::default()
        };
        assert!(!repo.include_field_for_diff_computation("secret_scanning"));
    }

    #[test]
    fn live_repository_reads_nested_secret_scanning_status() {
        let value = serde_json::json!({
            "name": "demo",
            "security_and_analysis": {
                "secret_scanning": {"status": "enabled"},
                "secret_scanning_push_protection": {"status": "disabled"},
            },
        });
        let repo = Repository::from_live(&value);
        assert_eq!(repo.secret_scanning, Attr::Set("enabled".to_string()));
        assert_eq!(repo.secret_scanning_push_protection, Attr::Set("disabled".to_string()));
    }

    #[test]
    fn live_repository_reads_dependabot_alerts_status_as_a_bool() {
        let value = serde_json::json!({
            "name": "demo",
            "security_and_analysis": {
                "dependabot_security_updates": {"status": "enabled"},
            },
        });
        let repo = Repository::from_live(&value);
        assert_eq!(repo.dependabot_alerts_enabled, Attr::Set(true));
    }

    #[test]
    fn template_created_repo_omits_template_inherited_fields_from_the_add_payload() {
        let repo = Repository {
            name: "demo".into(),
            has_issues: Attr::Set(true),
            has_wiki: Attr::Set(true),
            allow_forking: Attr::Set(true),
            created_from_template: true,
            ..Default::default()
        };
        let payload = repo.to_provider_for_add();
        let obj = payload.as_object().unwrap();
        assert!(!obj.contains_key("has_issues"));
        assert!(!obj.contains_key("has_wiki"));
        assert_eq!(obj["allow_forking"], serde_json::json!(true));
    }

    #[test]
    fn non_template_repo_keeps_all_fields_in_the_add_payload() {
        let repo = Repository {
            name: "demo".into(),
            has_issues: Attr::Set(true),
            created_from_template: false,
            ..Default::default()
        };
        let payload = repo.to_provider_for_add();
        assert_eq!(payload["has_issues"], serde_json::json!(true));
    }
}
