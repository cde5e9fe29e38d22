//! Assembles a `Organization` either from declarative JSON (already
//! evaluated by the external expression engine into plain data) or from a
//! live forge via a `Provider`.

use std::sync::{Arc, Mutex};
use std::thread;

use otterdog_provider::Provider;
use serde_json::Value;

use crate::model::{
    BranchProtectionRule, Environment, Organization, OrganizationSettings, OrgWorkflowSettings, Repository, Ruleset,
    Secret, Webhook,
};

/// One entity's load failed. Siblings keep loading; this is collected rather
/// than aborting the whole pass.
#[derive(Debug, Clone)]
pub struct LoadError {
    pub entity: String,
    pub cause: String,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "load error for {}: {}", self.entity, self.cause)
    }
}

/// Default width of the worker pool used when fetching per-repository
/// children (branch protection rules, workflow settings) concurrently.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 12;

pub struct Loader {
    worker_pool_size: usize,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
        }
    }
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size.max(1);
        self
    }

    /// Builds an `Organization` out of a tree of plain data already evaluated
    /// by the declarative config's expression engine.
    pub fn load_from_declared(&self, github_id: &str, root: &Value) -> Organization {
        let settings = OrganizationSettings::from_declared(&root["settings"]);
        let workflow_settings = root
            .get("workflow_settings")
            .map(OrgWorkflowSettings::from_declared)
            .unwrap_or_default();
        let webhooks = root
            .get("webhooks")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(Webhook::from_declared).collect())
            .unwrap_or_default();
        let repositories = root
            .get("repositories")
            .and_then(Value::as_object)
            .map(|repos| {
                repos
                    .iter()
                    .map(|(name, v)| Repository::from_declared(name, v))
                    .collect()
            })
            .unwrap_or_default();
        let secrets = root
            .get("secrets")
            .and_then(Value::as_object)
            .map(|secrets| secrets.iter().map(|(name, v)| Secret::from_declared(name, v)).collect())
            .unwrap_or_default();
        let rulesets = root
            .get("rulesets")
            .and_then(Value::as_object)
            .map(|rulesets| rulesets.iter().map(|(name, v)| Ruleset::from_declared(name, v)).collect())
            .unwrap_or_default();
        Organization {
            github_id: github_id.to_string(),
            settings,
            workflow_settings,
            webhooks,
            repositories,
            secrets,
            rulesets,
        }
    }

    /// Reads the live side through a `Provider`. Repository child fetches
    /// (branch protection rules, workflow settings) run on a bounded worker
    /// pool; one repository's failure does not stop the others.
    ///
    /// When `include_web` is false, web-UI-only org settings are left unset
    /// rather than fetched, so they never enter a diff.
    pub fn load_from_live(
        &self,
        github_id: &str,
        provider: &(dyn Provider + Send + Sync),
        include_web: bool,
    ) -> (Organization, Vec<LoadError>) {
        let errors = Arc::new(Mutex::new(Vec::new()));

        let mut included_keys: Vec<&str> = vec![
            "security_managers",
            "default_workflow_permissions",
            "actions_can_approve_pull_request_reviews",
            "allowed_actions",
            "enabled_repositories",
        ];
        if include_web {
            included_keys.push("web_commit_signoff_required");
        }
        let settings_value = provider.get_org_settings(github_id, &included_keys);
        let (settings, workflow_settings) = match settings_value {
            Ok(value) => (
                OrganizationSettings::from_live(&value),
                OrgWorkflowSettings::from_live(&value),
            ),
            Err(e) => {
                errors.lock().unwrap().push(LoadError {
                    entity: "OrganizationSettings".into(),
                    cause: e.to_string(),
                });
                (OrganizationSettings::default(), OrgWorkflowSettings::default())
            }
        };

        let webhooks = match provider.list_webhooks(github_id) {
            Ok(list) => list.iter().map(Webhook::from_live).collect(),
            Err(e) => {
                errors.lock().unwrap().push(LoadError {
                    entity: "Webhook".into(),
                    cause: e.to_string(),
                });
                Vec::new()
            }
        };

        let repo_values = match provider.list_repos(github_id) {
            Ok(list) => list,
            Err(e) => {
                errors.lock().unwrap().push(LoadError {
                    entity: "Repository".into(),
                    cause: e.to_string(),
                });
                Vec::new()
            }
        };

        let repositories = self.load_repositories_concurrently(github_id, provider, repo_values, &errors);

        let secrets = match provider.list_org_secrets(github_id) {
            Ok(list) => list.iter().map(Secret::from_live).collect(),
            Err(e) => {
                errors.lock().unwrap().push(LoadError {
                    entity: "Secret".into(),
                    cause: e.to_string(),
                });
                Vec::new()
            }
        };

        let rulesets = match provider.list_org_rulesets(github_id) {
            Ok(list) => list.iter().map(Ruleset::from_live).collect(),
            Err(e) => {
                errors.lock().unwrap().push(LoadError {
                    entity: "Ruleset".into(),
                    cause: e.to_string(),
                });
                Vec::new()
            }
        };

        let organization = Organization {
            github_id: github_id.to_string(),
            settings,
            workflow_settings,
            webhooks,
            repositories,
            secrets,
            rulesets,
        };
        let errors = Arc::try_unwrap(errors).unwrap().into_inner().unwrap();
        (organization, errors)
    }

    fn load_repositories_concurrently(
        &self,
        github_id: &str,
        provider: &(dyn Provider + Send + Sync),
        repo_values: Vec<Value>,
        errors: &Arc<Mutex<Vec<LoadError>>>,
    ) -> Vec<Repository> {
        let mut repositories = Vec::with_capacity(repo_values.len());
        let chunk_size = self.worker_pool_size.min(repo_values.len().max(1));

        for chunk in repo_values.chunks(chunk_size.max(1)) {
            thread::scope(|scope| {
                let mut joins = Vec::new();
                for value in chunk {
                    let mut repo = Repository::from_live(value);
                    let errors = Arc::clone(errors);
                    joins.push(scope.spawn(move || {
                        match provider.list_branch_protection_rules(github_id, &repo.name) {
                            Ok(rules) => {
                                repo.branch_protection_rules =
                                    rules.iter().map(BranchProtectionRule::from_live).collect();
                            }
                            Err(e) => {
                                errors.lock().unwrap().push(LoadError {
                                    entity: format!("BranchProtectionRule[repo={}]", repo.name),
                                    cause: e.to_string(),
                                });
                            }
                        }
                        match provider.get_repo_workflow_settings(github_id, &repo.name) {
                            Ok(value) => {
                                repo.workflow_settings =
                                    crate::model::RepositoryWorkflowSettings::from_live(&value);
                            }
                            Err(e) => {
                                errors.lock().unwrap().push(LoadError {
                                    entity: format!("RepositoryWorkflowSettings[repo={}]", repo.name),
                                    cause: e.to_string(),
                                });
                            }
                        }
                        match provider.list_repo_secrets(github_id, &repo.name) {
                            Ok(list) => {
                                repo.secrets = list.iter().map(Secret::from_live).collect();
                            }
                            Err(e) => {
                                errors.lock().unwrap().push(LoadError {
                                    entity: format!("Secret[repo={}]", repo.name),
                                    cause: e.to_string(),
                                });
                            }
                        }
                        match provider.list_repo_rulesets(github_id, &repo.name) {
                            Ok(list) => {
                                repo.rulesets = list.iter().map(Ruleset::from_live).collect();
                            }
                            Err(e) => {
                                errors.lock().unwrap().push(LoadError {
                                    entity: format!("Ruleset[repo={}]", repo.name),
                                    cause: e.to_string(),
                                });
                            }
                        }
                        match provider.list_repo_environments(github_id, &repo.name) {
                            Ok(list) => {
                                repo.environments = list.iter().map(Environment::from_live).collect();
                            }
                            Err(e) => {
                                errors.lock().unwrap().push(LoadError {
                                    entity: format!("Environment[repo={}]", repo.name),
                                    cause: e.to_string(),
                                });
                            }
                        }
                        repo
                    }));
                }
                for join in joins {
                    repositories.push(join.join().expect("repository load thread panicked"));
                }
            });
        }
        repositories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_load_reads_repositories_by_key() {
        let loader = Loader::new();
        let root = serde_json::json!({
            "settings": {"name": "acme"},
            "repositories": {"demo": {"description": "a repo"}},
        });
        let org = loader.load_from_declared("acme", &root);
        assert_eq!(org.repositories.len(), 1);
        assert_eq!(org.repositories[0].name, "demo");
    }

    #[test]
    fn load_error_display_names_the_entity() {
        let err = LoadError {
            entity: "Webhook".into(),
            cause: "timeout".into(),
        };
        assert_eq!(err.to_string(), "load error for Webhook: timeout");
    }
}
