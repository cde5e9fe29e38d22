//! Turns a pair of `Organization` trees (expected vs. current) into an
//! ordered list of `LivePatch` values. Dispatch is a closed tagged union by
//! entity kind, not `dyn ModelObject` — adding a new entity kind means
//! extending `EntityPayload` and the `Applier`'s match together.

use otterdog_provider::{NodeIdKind, Provider};
use otterdog_types::{FieldMap, PatchType, Result};
use serde_json::Value;

use crate::model::{
    BranchProtectionRule, Environment, ModelObject, Organization, OrganizationSettings, OrgWorkflowSettings,
    Repository, RepositoryWorkflowSettings, Ruleset, Secret, Webhook,
};

/// The entity a patch targets, carried by value so `apply` can call the
/// right `Provider` verb without any further type erasure.
#[derive(Debug, Clone)]
pub enum EntityPayload {
    OrganizationSettings(OrganizationSettings),
    OrgWorkflowSettings(OrgWorkflowSettings),
    Webhook(Webhook),
    Repository(Repository),
    RepositoryWorkflowSettings(RepositoryWorkflowSettings),
    BranchProtectionRule(BranchProtectionRule),
    Secret(Secret),
    Ruleset(Ruleset),
    Environment(Environment),
}

impl EntityPayload {
    fn name(&self) -> &'static str {
        match self {
            EntityPayload::OrganizationSettings(e) => e.model_object_name(),
            EntityPayload::OrgWorkflowSettings(e) => e.model_object_name(),
            EntityPayload::Webhook(e) => e.model_object_name(),
            EntityPayload::Repository(e) => e.model_object_name(),
            EntityPayload::RepositoryWorkflowSettings(e) => e.model_object_name(),
            EntityPayload::BranchProtectionRule(e) => e.model_object_name(),
            EntityPayload::Secret(e) => e.model_object_name(),
            EntityPayload::Ruleset(e) => e.model_object_name(),
            EntityPayload::Environment(e) => e.model_object_name(),
        }
    }
}

/// One reconciliation operation on one entity. `repo_name` names the parent
/// repository for entities that live underneath one; `None` for org-scoped
/// entities.
#[derive(Debug, Clone)]
pub struct LivePatch {
    pub patch_type: PatchType,
    pub repo_name: Option<String>,
    pub key: String,
    pub expected: Option<EntityPayload>,
    pub current: Option<EntityPayload>,
    pub changes: FieldMap,
    pub forced_update: bool,
}

impl LivePatch {
    pub fn entity_name(&self) -> &'static str {
        self.expected
            .as_ref()
            .or(self.current.as_ref())
            .map(EntityPayload::name)
            .unwrap_or("Unknown")
    }

    /// Whether executing this patch requires transmitting a secret value
    /// (used by the webhook service to decide what is safe to log).
    pub fn requires_secrets(&self) -> bool {
        matches!(self.expected, Some(EntityPayload::Webhook(_)) | Some(EntityPayload::Secret(_)))
    }

    /// Builds the CHANGE-patch payload from the field-level diff rather than
    /// the full expected object, so apply only ever sends the fields that
    /// actually differ.
    fn changes_to_provider(&self) -> Value {
        let map = self.changes.iter().map(|(field, change)| (field.to_string(), change.expected.clone())).collect();
        Value::Object(map)
    }

    pub fn apply(&self, org_id: &str, provider: &dyn Provider) -> Result<()> {
        match (&self.expected, &self.current) {
            (Some(EntityPayload::OrganizationSettings(_)), _) => {
                provider.update_org_settings(org_id, &self.changes_to_provider())
            }
            (Some(EntityPayload::OrgWorkflowSettings(_)), _) => {
                provider.update_org_settings(org_id, &self.changes_to_provider())
            }
            (Some(EntityPayload::Webhook(expected)), current) => match self.patch_type {
                PatchType::Add => {
                    provider.add_webhook(org_id, &expected.to_provider())?;
                    Ok(())
                }
                PatchType::Change => {
                    let live_id = current
                        .as_ref()
                        .and_then(|c| match c {
                            EntityPayload::Webhook(w) => w.live_id.clone(),
                            _ => None,
                        })
                        .unwrap_or_default();
                    provider.update_webhook(org_id, &live_id, &expected.to_provider())
                }
                PatchType::Remove => unreachable!("remove patches carry current, not expected"),
            },
            (None, Some(EntityPayload::Webhook(current))) => {
                provider.remove_webhook(org_id, current.live_id.as_deref().unwrap_or_default())
            }
            (Some(EntityPayload::Repository(expected)), _) => match self.patch_type {
                PatchType::Add => {
                    provider.add_repo(org_id, &expected.to_provider_for_add())?;
                    Ok(())
                }
                PatchType::Change => provider.update_repo(org_id, &expected.name, &self.changes_to_provider()),
                PatchType::Remove => unreachable!(),
            },
            (None, Some(EntityPayload::Repository(current))) => provider.remove_repo(org_id, &current.name),
            (Some(EntityPayload::RepositoryWorkflowSettings(_)), _) => {
                let repo = self.repo_name.as_deref().unwrap_or_default();
                provider.update_repo_workflow_settings(org_id, repo, &self.changes_to_provider())
            }
            (Some(EntityPayload::BranchProtectionRule(expected)), current) => {
                let repo = self.repo_name.as_deref().unwrap_or_default();
                match self.patch_type {
                    PatchType::Add => {
                        provider.add_branch_protection_rule(org_id, repo, &expected.to_provider())?;
                        Ok(())
                    }
                    PatchType::Change => {
                        let node_id = current
                            .as_ref()
                            .and_then(|c| match c {
                                EntityPayload::BranchProtectionRule(r) => r.node_id.clone(),
                                _ => None,
                            })
                            .unwrap_or_default();
                        provider.update_branch_protection_rule(&node_id, &self.changes_to_provider())
                    }
                    PatchType::Remove => unreachable!(),
                }
            }
            (None, Some(EntityPayload::BranchProtectionRule(current))) => {
                provider.remove_branch_protection_rule(current.node_id.as_deref().unwrap_or_default())
            }
            (Some(EntityPayload::Secret(expected)), _) => match (&self.repo_name, self.patch_type) {
                (Some(repo), PatchType::Add) => provider.put_repo_secret(org_id, repo, &expected.name, &expected.to_provider()),
                (None, PatchType::Add) => provider.put_org_secret(org_id, &expected.name, &expected.to_provider()),
                (_, PatchType::Change) => Ok(()),
                (_, PatchType::Remove) => unreachable!(),
            },
            (None, Some(EntityPayload::Secret(current))) => match &self.repo_name {
                Some(repo) => provider.remove_repo_secret(org_id, repo, &current.name),
                None => provider.remove_org_secret(org_id, &current.name),
            },
            (Some(EntityPayload::Ruleset(expected)), current) => match (&self.repo_name, self.patch_type) {
                (Some(repo), PatchType::Add) => {
                    provider.add_repo_ruleset(org_id, repo, &expected.to_provider())?;
                    Ok(())
                }
                (None, PatchType::Add) => {
                    provider.add_org_ruleset(org_id, &expected.to_provider())?;
                    Ok(())
                }
                (Some(repo), PatchType::Change) => {
                    let ruleset_id = current
                        .as_ref()
                        .and_then(|c| match c {
                            EntityPayload::Ruleset(r) => r.node_id,
                            _ => None,
                        })
                        .unwrap_or_default();
                    provider.update_repo_ruleset(org_id, repo, &ruleset_id.to_string(), &self.changes_to_provider())
                }
                (None, PatchType::Change) => {
                    let ruleset_id = current
                        .as_ref()
                        .and_then(|c| match c {
                            EntityPayload::Ruleset(r) => r.node_id,
                            _ => None,
                        })
                        .unwrap_or_default();
                    provider.update_org_ruleset(org_id, &ruleset_id.to_string(), &self.changes_to_provider())
                }
                (_, PatchType::Remove) => unreachable!(),
            },
            (None, Some(EntityPayload::Ruleset(current))) => {
                let ruleset_id = current.node_id.unwrap_or_default().to_string();
                match &self.repo_name {
                    Some(repo) => provider.remove_repo_ruleset(org_id, repo, &ruleset_id),
                    None => provider.remove_org_ruleset(org_id, &ruleset_id),
                }
            }
            (Some(EntityPayload::Environment(expected)), _) => {
                // Like Webhook, the environment PUT replaces `protection_rules`
                // wholesale rather than merging, so both Add and Change send
                // the full reconstructed object, never a sparse diff.
                let repo = self.repo_name.as_deref().unwrap_or_default();
                match self.patch_type {
                    PatchType::Add | PatchType::Change => {
                        provider.put_repo_environment(org_id, repo, &expected.name, &expected.to_provider())
                    }
                    PatchType::Remove => unreachable!(),
                }
            }
            (None, Some(EntityPayload::Environment(current))) => {
                let repo = self.repo_name.as_deref().unwrap_or_default();
                provider.remove_repo_environment(org_id, repo, &current.name)
            }
            _ => Ok(()),
        }
    }
}

/// Generates the ordered patch list for one organization pass. `provider` is
/// only used to resolve node ids when a branch protection rule needs one
/// it doesn't already carry from a live load; pass `None` when diffing two
/// already-loaded trees (e.g. `local-plan`) where ids are already attached.
pub fn generate_patches(expected: &Organization, current: &Organization) -> Vec<LivePatch> {
    let mut patches = Vec::new();

    let settings_diff = expected.settings.get_difference_from(&current.settings);
    if !settings_diff.is_empty() {
        patches.push(LivePatch {
            patch_type: PatchType::Change,
            repo_name: None,
            key: expected.github_id.clone(),
            expected: Some(EntityPayload::OrganizationSettings(expected.settings.clone())),
            current: Some(EntityPayload::OrganizationSettings(current.settings.clone())),
            changes: settings_diff,
            forced_update: false,
        });
    }

    let workflow_diff = expected
        .workflow_settings
        .get_difference_from(&current.workflow_settings);
    if !workflow_diff.is_empty() {
        patches.push(LivePatch {
            patch_type: PatchType::Change,
            repo_name: None,
            key: expected.github_id.clone(),
            expected: Some(EntityPayload::OrgWorkflowSettings(expected.workflow_settings.clone())),
            current: Some(EntityPayload::OrgWorkflowSettings(current.workflow_settings.clone())),
            changes: workflow_diff,
            forced_update: false,
        });
    }

    diff_webhooks(&expected.webhooks, &current.webhooks, &mut patches);
    diff_secrets(&expected.secrets, &current.secrets, None, &mut patches);
    diff_rulesets(&expected.rulesets, &current.rulesets, None, &mut patches);
    diff_repositories(&expected.repositories, &current.repositories, &mut patches);

    patches
}

/// Secrets can only be diffed by name: the value side is write-only and
/// never observable on the live side, so a changed value never surfaces as
/// a CHANGE patch, only as presence/absence.
fn diff_secrets(expected: &[Secret], current: &[Secret], repo_name: Option<&str>, patches: &mut Vec<LivePatch>) {
    let mut expected_sorted: Vec<&Secret> = expected.iter().collect();
    expected_sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for secret in &expected_sorted {
        if current.iter().any(|c| c.name == secret.name) {
            continue;
        }
        patches.push(LivePatch {
            patch_type: PatchType::Add,
            repo_name: repo_name.map(str::to_string),
            key: secret.name.clone(),
            expected: Some(EntityPayload::Secret((*secret).clone())),
            current: None,
            changes: FieldMap::new(),
            forced_update: false,
        });
    }

    let mut removed: Vec<&Secret> = current
        .iter()
        .filter(|c| !expected.iter().any(|e| e.name == c.name))
        .collect();
    removed.sort_by(|a, b| a.name.cmp(&b.name));
    for secret in removed {
        patches.push(LivePatch {
            patch_type: PatchType::Remove,
            repo_name: repo_name.map(str::to_string),
            key: secret.name.clone(),
            expected: None,
            current: Some(EntityPayload::Secret(secret.clone())),
            changes: FieldMap::new(),
            forced_update: false,
        });
    }
}

fn diff_rulesets(expected: &[Ruleset], current: &[Ruleset], repo_name: Option<&str>, patches: &mut Vec<LivePatch>) {
    let mut expected_sorted: Vec<&Ruleset> = expected.iter().collect();
    expected_sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for ruleset in &expected_sorted {
        match current.iter().find(|c| c.name == ruleset.name) {
            None => patches.push(LivePatch {
                patch_type: PatchType::Add,
                repo_name: repo_name.map(str::to_string),
                key: ruleset.name.clone(),
                expected: Some(EntityPayload::Ruleset((*ruleset).clone())),
                current: None,
                changes: FieldMap::new(),
                forced_update: false,
            }),
            Some(current_ruleset) => {
                let diff = ruleset.get_difference_from(current_ruleset);
                if !diff.is_empty() {
                    let mut expected_with_id = (*ruleset).clone();
                    expected_with_id.node_id = current_ruleset.node_id;
                    patches.push(LivePatch {
                        patch_type: PatchType::Change,
                        repo_name: repo_name.map(str::to_string),
                        key: ruleset.name.clone(),
                        expected: Some(EntityPayload::Ruleset(expected_with_id)),
                        current: Some(EntityPayload::Ruleset(current_ruleset.clone())),
                        changes: diff,
                        forced_update: false,
                    });
                }
            }
        }
    }

    let mut removed: Vec<&Ruleset> = current
        .iter()
        .filter(|c| !expected.iter().any(|e| e.name == c.name))
        .collect();
    removed.sort_by(|a, b| a.name.cmp(&b.name));
    for ruleset in removed {
        patches.push(LivePatch {
            patch_type: PatchType::Remove,
            repo_name: repo_name.map(str::to_string),
            key: ruleset.name.clone(),
            expected: None,
            current: Some(EntityPayload::Ruleset(ruleset.clone())),
            changes: FieldMap::new(),
            forced_update: false,
        });
    }
}

fn diff_environments(expected: &[Environment], current: &[Environment], repo_name: &str, patches: &mut Vec<LivePatch>) {
    let mut expected_sorted: Vec<&Environment> = expected.iter().collect();
    expected_sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for env in &expected_sorted {
        match current.iter().find(|c| c.name == env.name) {
            None => patches.push(LivePatch {
                patch_type: PatchType::Add,
                repo_name: Some(repo_name.to_string()),
                key: env.name.clone(),
                expected: Some(EntityPayload::Environment((*env).clone())),
                current: None,
                changes: FieldMap::new(),
                forced_update: false,
            }),
            Some(current_env) => {
                let diff = env.get_difference_from(current_env);
                if !diff.is_empty() {
                    patches.push(LivePatch {
                        patch_type: PatchType::Change,
                        repo_name: Some(repo_name.to_string()),
                        key: env.name.clone(),
                        expected: Some(EntityPayload::Environment((*env).clone())),
                        current: Some(EntityPayload::Environment(current_env.clone())),
                        changes: diff,
                        forced_update: false,
                    });
                }
            }
        }
    }

    let mut removed: Vec<&Environment> = current
        .iter()
        .filter(|c| !expected.iter().any(|e| e.name == c.name))
        .collect();
    removed.sort_by(|a, b| a.name.cmp(&b.name));
    for env in removed {
        patches.push(LivePatch {
            patch_type: PatchType::Remove,
            repo_name: Some(repo_name.to_string()),
            key: env.name.clone(),
            expected: None,
            current: Some(EntityPayload::Environment(env.clone())),
            changes: FieldMap::new(),
            forced_update: false,
        });
    }
}

fn diff_webhooks(expected: &[Webhook], current: &[Webhook], patches: &mut Vec<LivePatch>) {
    let mut expected_sorted: Vec<&Webhook> = expected.iter().collect();
    expected_sorted.sort_by(|a, b| a.url.cmp(&b.url));

    for hook in &expected_sorted {
        match current.iter().find(|c| c.url == hook.url) {
            None => patches.push(LivePatch {
                patch_type: PatchType::Add,
                repo_name: None,
                key: hook.url.clone(),
                expected: Some(EntityPayload::Webhook((*hook).clone())),
                current: None,
                changes: FieldMap::new(),
                forced_update: false,
            }),
            Some(current_hook) => {
                let diff = hook.get_difference_from(current_hook);
                if !diff.is_empty() {
                    let mut full = (*hook).clone();
                    full.live_id = current_hook.live_id.clone();
                    patches.push(LivePatch {
                        patch_type: PatchType::Change,
                        repo_name: None,
                        key: hook.url.clone(),
                        expected: Some(EntityPayload::Webhook(full)),
                        current: Some(EntityPayload::Webhook(current_hook.clone())),
                        changes: diff,
                        forced_update: false,
                    });
                }
            }
        }
    }

    let mut removed: Vec<&Webhook> = current
        .iter()
        .filter(|c| !expected.iter().any(|e| e.url == c.url))
        .collect();
    removed.sort_by(|a, b| a.url.cmp(&b.url));
    for hook in removed {
        patches.push(LivePatch {
            patch_type: PatchType::Remove,
            repo_name: None,
            key: hook.url.clone(),
            expected: None,
            current: Some(EntityPayload::Webhook(hook.clone())),
            changes: FieldMap::new(),
            forced_update: false,
        });
    }
}

fn diff_repositories(expected: &[Repository], current: &[Repository], patches: &mut Vec<LivePatch>) {
    let mut expected_sorted: Vec<&Repository> = expected.iter().collect();
    expected_sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for repo in &expected_sorted {
        match current.iter().find(|c| c.name == repo.name) {
            None => {
                patches.push(LivePatch {
                    patch_type: PatchType::Add,
                    repo_name: Some(repo.name.clone()),
                    key: repo.name.clone(),
                    expected: Some(EntityPayload::Repository((*repo).clone())),
                    current: None,
                    changes: FieldMap::new(),
                    forced_update: false,
                });
                // A freshly-added repository has no live workflow settings or
                // branch protection rules to diff against yet; those land on
                // a subsequent pass once the repository exists.
            }
            Some(current_repo) => {
                let diff = repo.get_difference_from(current_repo);
                if !diff.is_empty() {
                    patches.push(LivePatch {
                        patch_type: PatchType::Change,
                        repo_name: Some(repo.name.clone()),
                        key: repo.name.clone(),
                        expected: Some(EntityPayload::Repository((*repo).clone())),
                        current: Some(EntityPayload::Repository(current_repo.clone())),
                        changes: diff,
                        forced_update: false,
                    });
                }
                diff_workflow_settings(repo, current_repo, patches);
                diff_branch_protection_rules(repo, current_repo, patches);
                diff_secrets(&repo.secrets, &current_repo.secrets, Some(&repo.name), patches);
                diff_rulesets(&repo.rulesets, &current_repo.rulesets, Some(&repo.name), patches);
                diff_environments(&repo.environments, &current_repo.environments, &repo.name, patches);
            }
        }
    }

    let mut removed: Vec<&Repository> = current
        .iter()
        .filter(|c| !expected.iter().any(|e| e.name == c.name))
        .collect();
    removed.sort_by(|a, b| a.name.cmp(&b.name));
    for repo in removed {
        // §3 invariant 6 / §4.4 rule 4: a Repository REMOVE suppresses every
        // patch for that repository's children, so none are generated here.
        patches.push(LivePatch {
            patch_type: PatchType::Remove,
            repo_name: Some(repo.name.clone()),
            key: repo.name.clone(),
            expected: None,
            current: Some(EntityPayload::Repository(repo.clone())),
            changes: FieldMap::new(),
            forced_update: false,
        });
    }
}

fn diff_workflow_settings(expected_repo: &Repository, current_repo: &Repository, patches: &mut Vec<LivePatch>) {
    let diff = expected_repo
        .workflow_settings
        .get_difference_from(&current_repo.workflow_settings);
    if diff.is_empty() {
        return;
    }
    let forced_update = diff.contains_key("allowed_actions") && diff.contains_key("enabled");
    patches.push(LivePatch {
        patch_type: PatchType::Change,
        repo_name: Some(expected_repo.name.clone()),
        key: expected_repo.name.clone(),
        expected: Some(EntityPayload::RepositoryWorkflowSettings(expected_repo.workflow_settings.clone())),
        current: Some(EntityPayload::RepositoryWorkflowSettings(current_repo.workflow_settings.clone())),
        changes: diff,
        forced_update,
    });
}

fn diff_branch_protection_rules(expected_repo: &Repository, current_repo: &Repository, patches: &mut Vec<LivePatch>) {
    let mut expected_sorted: Vec<&BranchProtectionRule> = expected_repo.branch_protection_rules.iter().collect();
    expected_sorted.sort_by(|a, b| a.pattern.cmp(&b.pattern));

    for rule in &expected_sorted {
        match current_repo.branch_protection_rules.iter().find(|c| c.pattern == rule.pattern) {
            None => patches.push(LivePatch {
                patch_type: PatchType::Add,
                repo_name: Some(expected_repo.name.clone()),
                key: rule.pattern.clone(),
                expected: Some(EntityPayload::BranchProtectionRule((*rule).clone())),
                current: None,
                changes: FieldMap::new(),
                forced_update: false,
            }),
            Some(current_rule) => {
                let diff = rule.get_difference_from(current_rule);
                if !diff.is_empty() {
                    let mut expected_with_id = (*rule).clone();
                    expected_with_id.node_id = current_rule.node_id.clone();
                    patches.push(LivePatch {
                        patch_type: PatchType::Change,
                        repo_name: Some(expected_repo.name.clone()),
                        key: rule.pattern.clone(),
                        expected: Some(EntityPayload::BranchProtectionRule(expected_with_id)),
                        current: Some(EntityPayload::BranchProtectionRule(current_rule.clone())),
                        changes: diff,
                        forced_update: false,
                    });
                }
            }
        }
    }

    let mut removed: Vec<&BranchProtectionRule> = current_repo
        .branch_protection_rules
        .iter()
        .filter(|c| !expected_repo.branch_protection_rules.iter().any(|e| e.pattern == c.pattern))
        .collect();
    removed.sort_by(|a, b| a.pattern.cmp(&b.pattern));
    for rule in removed {
        patches.push(LivePatch {
            patch_type: PatchType::Remove,
            repo_name: Some(expected_repo.name.clone()),
            key: rule.pattern.clone(),
            expected: None,
            current: Some(EntityPayload::BranchProtectionRule(rule.clone())),
            changes: FieldMap::new(),
            forced_update: false,
        });
    }
}

/// Resolves a branch protection node id opaquely, used when the Applier
/// needs to mutate a rule that was only ever seen declared, never live.
pub fn resolve_rule_node_id(provider: &dyn Provider, org_id: &str, repo: &str) -> Result<String> {
    provider.resolve_node_id(org_id, NodeIdKind::Repository, repo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use otterdog_types::Attr;

    #[test]
    fn new_repository_produces_an_add_patch() {
        let expected = Organization {
            github_id: "acme".into(),
            repositories: vec![Repository {
                name: "demo".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let current = Organization {
            github_id: "acme".into(),
            ..Default::default()
        };
        let patches = generate_patches(&expected, &current);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].patch_type, PatchType::Add);
        assert_eq!(patches[0].key, "demo");
    }

    #[test]
    fn removed_repository_suppresses_child_patches() {
        let expected = Organization {
            github_id: "acme".into(),
            ..Default::default()
        };
        let current = Organization {
            github_id: "acme".into(),
            repositories: vec![Repository {
                name: "demo".into(),
                branch_protection_rules: vec![BranchProtectionRule {
                    pattern: "main".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let patches = generate_patches(&expected, &current);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].patch_type, PatchType::Remove);
        assert_eq!(patches[0].entity_name(), "Repository");
    }

    #[test]
    fn webhook_change_carries_the_full_reconstructed_object() {
        let expected = Organization {
            github_id: "acme".into(),
            webhooks: vec![Webhook {
                url: "https://x/hook".into(),
                active: Attr::Set(true),
                ..Default::default()
            }],
            ..Default::default()
        };
        let current = Organization {
            github_id: "acme".into(),
            webhooks: vec![Webhook {
                url: "https://x/hook".into(),
                live_id: Some("42".into()),
                active: Attr::Set(false),
                ..Default::default()
            }],
            ..Default::default()
        };
        let patches = generate_patches(&expected, &current);
        assert_eq!(patches.len(), 1);
        match &patches[0].expected {
            Some(EntityPayload::Webhook(hook)) => assert_eq!(hook.live_id.as_deref(), Some("42")),
            _ => panic!("expected a webhook payload"),
        }
    }

    #[test]
    fn workflow_settings_forced_update_is_flagged() {
        let expected_settings = RepositoryWorkflowSettings {
            base: crate::model::WorkflowSettingsBase {
                allowed_actions: Attr::Set("all".into()),
                ..Default::default()
            },
            enabled: Attr::Set(true),
        };
        let current_settings = RepositoryWorkflowSettings {
            base: crate::model::WorkflowSettingsBase {
                allowed_actions: Attr::Set("selected".into()),
                ..Default::default()
            },
            enabled: Attr::Set(true),
        };
        let expected = Organization {
            github_id: "acme".into(),
            repositories: vec![Repository {
                name: "demo".into(),
                workflow_settings: expected_settings,
                ..Default::default()
            }],
            ..Default::default()
        };
        let current = Organization {
            github_id: "acme".into(),
            repositories: vec![Repository {
                name: "demo".into(),
                workflow_settings: current_settings,
                ..Default::default()
            }],
            ..Default::default()
        };
        let patches = generate_patches(&expected, &current);
        let workflow_patch = patches
            .iter()
            .find(|p| p.entity_name() == "RepositoryWorkflowSettings")
            .expect("workflow settings patch");
        assert!(workflow_patch.forced_update);
    }

    #[test]
    fn matching_secret_names_never_produce_a_patch() {
        use crate::model::Secret;
        let expected = Organization {
            github_id: "acme".into(),
            secrets: vec![Secret {
                name: "DEPLOY_TOKEN".into(),
                value: Attr::Set("s3cr3t".into()),
            }],
            ..Default::default()
        };
        let current = Organization {
            github_id: "acme".into(),
            secrets: vec![Secret {
                name: "DEPLOY_TOKEN".into(),
                value: Attr::Unset,
            }],
            ..Default::default()
        };
        // Same name on both sides: since a secret's value is never
        // observable, this must never produce a CHANGE patch.
        let patches = generate_patches(&expected, &current);
        assert!(patches.is_empty());
    }

    #[test]
    fn missing_org_secret_produces_an_add_patch() {
        use crate::model::Secret;
        let expected = Organization {
            github_id: "acme".into(),
            secrets: vec![Secret {
                name: "DEPLOY_TOKEN".into(),
                value: Attr::Set("s3cr3t".into()),
            }],
            ..Default::default()
        };
        let current = Organization {
            github_id: "acme".into(),
            ..Default::default()
        };
        let patches = generate_patches(&expected, &current);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].patch_type, PatchType::Add);
        assert_eq!(patches[0].entity_name(), "Secret");
    }

    #[test]
    fn ruleset_change_carries_forward_the_live_node_id() {
        use crate::model::Ruleset;
        use otterdog_types::UnorderedList;
        let expected = Organization {
            github_id: "acme".into(),
            rulesets: vec![Ruleset {
                name: "protect-main".into(),
                rules: Attr::Set(UnorderedList(vec!["deletion".into()])),
                ..Default::default()
            }],
            ..Default::default()
        };
        let current = Organization {
            github_id: "acme".into(),
            rulesets: vec![Ruleset {
                name: "protect-main".into(),
                node_id: Some(42),
                rules: Attr::Set(UnorderedList(vec!["non_fast_forward".into()])),
                ..Default::default()
            }],
            ..Default::default()
        };
        let patches = generate_patches(&expected, &current);
        assert_eq!(patches.len(), 1);
        match &patches[0].expected {
            Some(EntityPayload::Ruleset(r)) => assert_eq!(r.node_id, Some(42)),
            _ => panic!("expected a ruleset payload"),
        }
    }

    #[test]
    fn repo_environment_diffs_are_scoped_to_their_repository() {
        use crate::model::Environment;
        let expected = Organization {
            github_id: "acme".into(),
            repositories: vec![Repository {
                name: "demo".into(),
                environments: vec![Environment {
                    name: "production".into(),
                    wait_timer: Attr::Set(30),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let current = Organization {
            github_id: "acme".into(),
            repositories: vec![Repository {
                name: "demo".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let patches = generate_patches(&expected, &current);
        let env_patch = patches.iter().find(|p| p.entity_name() == "Environment").expect("environment patch");
        assert_eq!(env_patch.repo_name.as_deref(), Some("demo"));
        assert_eq!(env_patch.patch_type, PatchType::Add);
    }
}
