//! The single facade the reconciliation engine talks to. `Provider` exposes
//! typed read/write verbs per entity kind while hiding which of the REST,
//! GraphQL, or web-UI transports actually serves a given field — callers
//! never see the REST/GraphQL split.
//!
//! Payloads cross this boundary as `serde_json::Value` rather than the
//! engine's own entity structs: `otterdog-model` owns the adaptation
//! (`from_live`/`to_provider`) in both directions, keeping this crate free
//! of a dependency on the model crate.

pub mod cache;
pub mod transport;

use std::collections::HashMap;
use std::sync::Mutex;

use otterdog_types::Result;
use serde_json::Value;

pub use transport::graphql::{GraphqlTransport, NodeIdKind};
pub use transport::rest::RestTransport;
pub use transport::webui::{BrowserSession, SettingLocator, WebUiSettingsTable, WebUiTransport};

/// Per-kind verbs the differ's bound `apply_fn` closures call. Branch
/// protection rules and node-id lookups always cross GraphQL; everything
/// else defaults to REST; web-UI-only settings are folded into
/// `get_org_settings`/`update_org_settings` when `include_web` is set.
pub trait Provider: Send + Sync {
    fn get_org_settings(&self, org_id: &str, included_keys: &[&str]) -> Result<Value>;
    fn update_org_settings(&self, org_id: &str, payload: &Value) -> Result<()>;

    fn list_webhooks(&self, org_id: &str) -> Result<Vec<Value>>;
    fn add_webhook(&self, org_id: &str, payload: &Value) -> Result<Value>;
    fn update_webhook(&self, org_id: &str, hook_id: &str, payload: &Value) -> Result<()>;
    fn remove_webhook(&self, org_id: &str, hook_id: &str) -> Result<()>;

    fn list_repos(&self, org_id: &str) -> Result<Vec<Value>>;
    fn add_repo(&self, org_id: &str, payload: &Value) -> Result<Value>;
    fn update_repo(&self, org_id: &str, name: &str, payload: &Value) -> Result<()>;
    fn remove_repo(&self, org_id: &str, name: &str) -> Result<()>;

    fn list_branch_protection_rules(&self, org_id: &str, repo: &str) -> Result<Vec<Value>>;
    fn add_branch_protection_rule(&self, org_id: &str, repo: &str, payload: &Value) -> Result<Value>;
    fn update_branch_protection_rule(&self, rule_node_id: &str, payload: &Value) -> Result<()>;
    fn remove_branch_protection_rule(&self, rule_node_id: &str) -> Result<()>;

    fn get_repo_workflow_settings(&self, org_id: &str, repo: &str) -> Result<Value>;
    fn update_repo_workflow_settings(&self, org_id: &str, repo: &str, payload: &Value) -> Result<()>;

    fn list_org_secrets(&self, org_id: &str) -> Result<Vec<Value>>;
    fn put_org_secret(&self, org_id: &str, name: &str, payload: &Value) -> Result<()>;
    fn remove_org_secret(&self, org_id: &str, name: &str) -> Result<()>;

    fn list_repo_secrets(&self, org_id: &str, repo: &str) -> Result<Vec<Value>>;
    fn put_repo_secret(&self, org_id: &str, repo: &str, name: &str, payload: &Value) -> Result<()>;
    fn remove_repo_secret(&self, org_id: &str, repo: &str, name: &str) -> Result<()>;

    fn list_org_rulesets(&self, org_id: &str) -> Result<Vec<Value>>;
    fn add_org_ruleset(&self, org_id: &str, payload: &Value) -> Result<Value>;
    fn update_org_ruleset(&self, org_id: &str, ruleset_id: &str, payload: &Value) -> Result<()>;
    fn remove_org_ruleset(&self, org_id: &str, ruleset_id: &str) -> Result<()>;

    fn list_repo_rulesets(&self, org_id: &str, repo: &str) -> Result<Vec<Value>>;
    fn add_repo_ruleset(&self, org_id: &str, repo: &str, payload: &Value) -> Result<Value>;
    fn update_repo_ruleset(&self, org_id: &str, repo: &str, ruleset_id: &str, payload: &Value) -> Result<()>;
    fn remove_repo_ruleset(&self, org_id: &str, repo: &str, ruleset_id: &str) -> Result<()>;

    fn list_repo_environments(&self, org_id: &str, repo: &str) -> Result<Vec<Value>>;
    fn put_repo_environment(&self, org_id: &str, repo: &str, name: &str, payload: &Value) -> Result<()>;
    fn remove_repo_environment(&self, org_id: &str, repo: &str, name: &str) -> Result<()>;

    fn get_content(&self, org_id: &str, repo: &str, path: &str) -> Result<Option<String>>;
    fn get_content_at_ref(&self, org_id: &str, repo: &str, path: &str, git_ref: &str) -> Result<Option<String>>;
    fn put_content(&self, org_id: &str, repo: &str, path: &str, content: &str, message: &str) -> Result<()>;

    fn resolve_node_id(&self, org_id: &str, kind: NodeIdKind, slug: &str) -> Result<String>;

    fn post_commit_status(&self, org_id: &str, repo: &str, sha: &str, payload: &Value) -> Result<()>;

    fn get_pull_request(&self, org_id: &str, repo: &str, number: u64) -> Result<Value>;
    fn list_open_pull_requests(&self, org_id: &str, repo: &str) -> Result<Vec<Value>>;
    fn create_issue_comment(&self, org_id: &str, repo: &str, number: u64, body: &str) -> Result<()>;
}

/// The concrete provider: REST for most reads/writes, GraphQL for branch
/// protection rules and node-id resolution, an optional web-UI session for
/// settings the API doesn't expose.
pub struct ForgeProvider<'a> {
    rest: RestTransport,
    graphql: GraphqlTransport,
    web: Option<Mutex<WebUiTransport<'a>>>,
    repo_node_ids: Mutex<HashMap<String, String>>,
}

impl<'a> ForgeProvider<'a> {
    pub fn new(token: String) -> Result<Self> {
        Ok(Self {
            rest: RestTransport::new(token.clone())?,
            graphql: GraphqlTransport::new(token)?,
            web: None,
            repo_node_ids: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_web_ui(mut self, web: WebUiTransport<'a>) -> Self {
        self.web = Some(Mutex::new(web));
        self
    }

    fn repository_node_id(&self, org_id: &str, repo: &str) -> Result<String> {
        let key = format!("{org_id}/{repo}");
        if let Some(id) = self.repo_node_ids.lock().unwrap().get(&key) {
            return Ok(id.clone());
        }
        let id = self.resolve_node_id(org_id, NodeIdKind::Repository, repo)?;
        self.repo_node_ids.lock().unwrap().insert(key, id.clone());
        Ok(id)
    }
}

impl<'a> Provider for ForgeProvider<'a> {
    fn get_org_settings(&self, org_id: &str, included_keys: &[&str]) -> Result<Value> {
        let mut settings = transport::rest::get_org_settings(&self.rest, org_id, included_keys)?;
        if let Some(web) = &self.web {
            let mut web = web.lock().unwrap();
            if let Some(obj) = settings.as_object_mut() {
                for key in included_keys {
                    if web.get_setting(key).is_ok() {
                        // Web-UI values supplement, never overwrite, an API-sourced field.
                        obj.entry(key.to_string()).or_insert(Value::Null);
                    }
                }
            }
        }
        Ok(settings)
    }

    fn update_org_settings(&self, org_id: &str, payload: &Value) -> Result<()> {
        transport::rest::update_org_settings(&self.rest, org_id, payload)?;
        if let Some(web) = &self.web {
            let mut web = web.lock().unwrap();
            if let Some(obj) = payload.as_object() {
                for (key, value) in obj {
                    let _ = web.update_setting(key, value);
                }
            }
        }
        Ok(())
    }

    fn list_webhooks(&self, org_id: &str) -> Result<Vec<Value>> {
        transport::rest::list_webhooks(&self.rest, org_id)
    }

    fn add_webhook(&self, org_id: &str, payload: &Value) -> Result<Value> {
        transport::rest::add_webhook(&self.rest, org_id, payload)
    }

    fn update_webhook(&self, org_id: &str, hook_id: &str, payload: &Value) -> Result<()> {
        transport::rest::update_webhook(&self.rest, org_id, hook_id, payload)
    }

    fn remove_webhook(&self, org_id: &str, hook_id: &str) -> Result<()> {
        transport::rest::remove_webhook(&self.rest, org_id, hook_id)
    }

    fn list_repos(&self, org_id: &str) -> Result<Vec<Value>> {
        transport::rest::list_repos(&self.rest, org_id)
    }

    fn add_repo(&self, org_id: &str, payload: &Value) -> Result<Value> {
        transport::rest::add_repo(&self.rest, org_id, payload)
    }

    fn update_repo(&self, org_id: &str, name: &str, payload: &Value) -> Result<()> {
        transport::rest::update_repo(&self.rest, org_id, name, payload)
    }

    fn remove_repo(&self, org_id: &str, name: &str) -> Result<()> {
        transport::rest::remove_repo(&self.rest, org_id, name)
    }

    fn list_branch_protection_rules(&self, org_id: &str, repo: &str) -> Result<Vec<Value>> {
        let repo_id = self.repository_node_id(org_id, repo)?;
        self.graphql.list_branch_protection_rules(&repo_id)
    }

    fn add_branch_protection_rule(&self, org_id: &str, repo: &str, payload: &Value) -> Result<Value> {
        let repo_id = self.repository_node_id(org_id, repo)?;
        self.graphql.add_branch_protection_rule(&repo_id, payload)
    }

    fn update_branch_protection_rule(&self, rule_node_id: &str, payload: &Value) -> Result<()> {
        self.graphql.update_branch_protection_rule(rule_node_id, payload)
    }

    fn remove_branch_protection_rule(&self, rule_node_id: &str) -> Result<()> {
        self.graphql.remove_branch_protection_rule(rule_node_id)
    }

    fn get_repo_workflow_settings(&self, org_id: &str, repo: &str) -> Result<Value> {
        transport::rest::get_repo_workflow_settings(&self.rest, org_id, repo)
    }

    fn update_repo_workflow_settings(&self, org_id: &str, repo: &str, payload: &Value) -> Result<()> {
        transport::rest::update_repo_workflow_settings(&self.rest, org_id, repo, payload)
    }

    fn list_org_secrets(&self, org_id: &str) -> Result<Vec<Value>> {
        transport::rest::list_org_secrets(&self.rest, org_id)
    }

    fn put_org_secret(&self, org_id: &str, name: &str, payload: &Value) -> Result<()> {
        transport::rest::put_org_secret(&self.rest, org_id, name, payload)
    }

    fn remove_org_secret(&self, org_id: &str, name: &str) -> Result<()> {
        transport::rest::remove_org_secret(&self.rest, org_id, name)
    }

    fn list_repo_secrets(&self, org_id: &str, repo: &str) -> Result<Vec<Value>> {
        transport::rest::list_repo_secrets(&self.rest, org_id, repo)
    }

    fn put_repo_secret(&self, org_id: &str, repo: &str, name: &str, payload: &Value) -> Result<()> {
        transport::rest::put_repo_secret(&self.rest, org_id, repo, name, payload)
    }

    fn remove_repo_secret(&self, org_id: &str, repo: &str, name: &str) -> Result<()> {
        transport::rest::remove_repo_secret(&self.rest, org_id, repo, name)
    }

    fn list_org_rulesets(&self, org_id: &str) -> Result<Vec<Value>> {
        transport::rest::list_org_rulesets(&self.rest, org_id)
    }

    fn add_org_ruleset(&self, org_id: &str, payload: &Value) -> Result<Value> {
        transport::rest::add_org_ruleset(&self.rest, org_id, payload)
    }

    fn update_org_ruleset(&self, org_id: &str, ruleset_id: &str, payload: &Value) -> Result<()> {
        transport::rest::update_org_ruleset(&self.rest, org_id, ruleset_id, payload)
    }

    fn remove_org_ruleset(&self, org_id: &str, ruleset_id: &str) -> Result<()> {
        transport::rest::remove_org_ruleset(&self.rest, org_id, ruleset_id)
    }

    fn list_repo_rulesets(&self, org_id: &str, repo: &str) -> Result<Vec<Value>> {
        transport::rest::list_repo_rulesets(&self.rest, org_id, repo)
    }

    fn add_repo_ruleset(&self, org_id: &str, repo: &str, payload: &Value) -> Result<Value> {
        transport::rest::add_repo_ruleset(&self.rest, org_id, repo, payload)
    }

    fn update_repo_ruleset(&self, org_id: &str, repo: &str, ruleset_id: &str, payload: &Value) -> Result<()> {
        transport::rest::update_repo_ruleset(&self.rest, org_id, repo, ruleset_id, payload)
    }

    fn remove_repo_ruleset(&self, org_id: &str, repo: &str, ruleset_id: &str) -> Result<()> {
        transport::rest::remove_repo_ruleset(&self.rest, org_id, repo, ruleset_id)
    }

    fn list_repo_environments(&self, org_id: &str, repo: &str) -> Result<Vec<Value>> {
        transport::rest::list_repo_environments(&self.rest, org_id, repo)
    }

    fn put_repo_environment(&self, org_id: &str, repo: &str, name: &str, payload: &Value) -> Result<()> {
        transport::rest::put_repo_environment(&self.rest, org_id, repo, name, payload)
    }

    fn remove_repo_environment(&self, org_id: &str, repo: &str, name: &str) -> Result<()> {
        transport::rest::remove_repo_environment(&self.rest, org_id, repo, name)
    }

    fn get_content(&self, org_id: &str, repo: &str, path: &str) -> Result<Option<String>> {
        Ok(transport::rest::get_content(&self.rest, org_id, repo, path)?.map(|(text, _)| text))
    }

    fn get_content_at_ref(&self, org_id: &str, repo: &str, path: &str, git_ref: &str) -> Result<Option<String>> {
        transport::rest::get_content_at_ref(&self.rest, org_id, repo, path, git_ref)
    }

    fn put_content(&self, org_id: &str, repo: &str, path: &str, content: &str, message: &str) -> Result<()> {
        transport::rest::put_content(&self.rest, org_id, repo, path, content, message)
    }

    fn resolve_node_id(&self, org_id: &str, kind: NodeIdKind, slug: &str) -> Result<String> {
        self.graphql.resolve_node_id(org_id, kind, slug)
    }

    fn post_commit_status(&self, org_id: &str, repo: &str, sha: &str, payload: &Value) -> Result<()> {
        transport::rest::post_commit_status(&self.rest, org_id, repo, sha, payload)
    }

    fn get_pull_request(&self, org_id: &str, repo: &str, number: u64) -> Result<Value> {
        transport::rest::get_pull_request(&self.rest, org_id, repo, number)
    }

    fn list_open_pull_requests(&self, org_id: &str, repo: &str) -> Result<Vec<Value>> {
        transport::rest::list_open_pull_requests(&self.rest, org_id, repo)
    }

    fn create_issue_comment(&self, org_id: &str, repo: &str, number: u64, body: &str) -> Result<()> {
        transport::rest::create_issue_comment(&self.rest, org_id, repo, number, body)
    }
}
