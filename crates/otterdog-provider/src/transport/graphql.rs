//! GraphQL transport: branch protection rules and anything keyed by an
//! opaque node id rather than a REST path.

use otterdog_retry::{PerErrorConfig, RetryStrategyConfig, retry_blocking};
use otterdog_types::{ErrorClass, OtterdogError, Result};
use serde_json::Value;

const GH_GRAPHQL_URL: &str = "https://api.github.com/graphql";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIdKind {
    User,
    Team,
    App,
    Repository,
}

pub struct GraphqlTransport {
    http: reqwest::blocking::Client,
    endpoint: String,
    token: String,
    retry_config: RetryStrategyConfig,
    per_error: PerErrorConfig,
}

impl GraphqlTransport {
    pub fn new(token: String) -> Result<Self> {
        Self::with_endpoint(token, GH_GRAPHQL_URL.to_string())
    }

    pub fn with_endpoint(token: String, endpoint: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent("otterdog")
            .build()
            .map_err(|e| OtterdogError::Provider {
                status: 0,
                url: endpoint.clone(),
                body: e.to_string(),
            })?;
        Ok(Self {
            http,
            endpoint,
            token,
            retry_config: RetryStrategyConfig::default(),
            per_error: PerErrorConfig::default(),
        })
    }

    pub fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        retry_blocking(
            &self.retry_config,
            &self.per_error,
            |err: &OtterdogError| match err {
                OtterdogError::BadCredentials(_) => ErrorClass::Permanent,
                OtterdogError::Provider { status, .. } if *status == 403 || *status >= 500 => {
                    ErrorClass::Retryable
                }
                _ => ErrorClass::Permanent,
            },
            |_attempt| -> std::result::Result<Value, OtterdogError> {
                let response = self
                    .http
                    .post(&self.endpoint)
                    .bearer_auth(&self.token)
                    .json(&body)
                    .send()
                    .map_err(|e| OtterdogError::Provider {
                        status: 0,
                        url: self.endpoint.clone(),
                        body: e.to_string(),
                    })?;
                let status = response.status();
                let text = response.text().unwrap_or_default();
                if status.as_u16() == 401 {
                    return Err(OtterdogError::BadCredentials(format!(
                        "401 from {}",
                        self.endpoint
                    )));
                }
                if !status.is_success() {
                    return Err(OtterdogError::Provider {
                        status: status.as_u16(),
                        url: self.endpoint.clone(),
                        body: text,
                    });
                }
                let parsed: Value = serde_json::from_str(&text).map_err(|e| OtterdogError::Provider {
                    status: status.as_u16(),
                    url: self.endpoint.clone(),
                    body: format!("invalid JSON: {e}"),
                })?;
                if let Some(errors) = parsed.get("errors").and_then(Value::as_array) {
                    if !errors.is_empty() {
                        return Err(OtterdogError::Provider {
                            status: status.as_u16(),
                            url: self.endpoint.clone(),
                            body: errors.to_string(),
                        });
                    }
                }
                Ok(parsed["data"].clone())
            },
        )
    }

    pub fn resolve_node_id(&self, org_id: &str, kind: NodeIdKind, slug: &str) -> Result<String> {
        let query = match kind {
            NodeIdKind::User => "query($login: String!) { user(login: $login) { id } }",
            NodeIdKind::Team => {
                "query($org: String!, $slug: String!) { organization(login: $org) { team(slug: $slug) { id } } }"
            }
            NodeIdKind::App => "query($login: String!) { app(login: $login) { id } }",
            NodeIdKind::Repository => {
                "query($org: String!, $name: String!) { repository(owner: $org, name: $name) { id } }"
            }
        };
        let variables = match kind {
            NodeIdKind::User | NodeIdKind::App => serde_json::json!({ "login": slug }),
            NodeIdKind::Team => serde_json::json!({ "org": org_id, "slug": slug }),
            NodeIdKind::Repository => serde_json::json!({ "org": org_id, "name": slug }),
        };
        let data = self.execute(query, variables)?;
        let id = match kind {
            NodeIdKind::User => data["user"]["id"].as_str(),
            NodeIdKind::Team => data["organization"]["team"]["id"].as_str(),
            NodeIdKind::App => data["app"]["id"].as_str(),
            NodeIdKind::Repository => data["repository"]["id"].as_str(),
        };
        id.map(String::from).ok_or_else(|| OtterdogError::Provider {
            status: 0,
            url: self.endpoint.clone(),
            body: format!("no node id resolved for {slug:?}"),
        })
    }

    pub fn list_branch_protection_rules(&self, repository_node_id: &str) -> Result<Vec<Value>> {
        let query = "query($id: ID!) { node(id: $id) { ... on Repository { branchProtectionRules(first: 100) { nodes { id pattern requiresApprovingReviews requiredApprovingReviewCount requiresStatusChecks requiredStatusCheckContexts allowsForcePushes requiresLinearHistory } } } } }";
        let data = self.execute(query, serde_json::json!({ "id": repository_node_id }))?;
        Ok(data["node"]["branchProtectionRules"]["nodes"]
            .as_array()
            .cloned()
            .unwrap_or_default())
    }

    pub fn add_branch_protection_rule(
        &self,
        repository_node_id: &str,
        payload: &Value,
    ) -> Result<Value> {
        let mutation = "mutation($input: CreateBranchProtectionRuleInput!) { createBranchProtectionRule(input: $input) { branchProtectionRule { id pattern } } }";
        let mut input = payload.clone();
        if let Some(obj) = input.as_object_mut() {
            obj.insert("repositoryId".into(), Value::String(repository_node_id.to_string()));
        }
        let data = self.execute(mutation, serde_json::json!({ "input": input }))?;
        Ok(data["createBranchProtectionRule"]["branchProtectionRule"].clone())
    }

    pub fn update_branch_protection_rule(&self, rule_node_id: &str, payload: &Value) -> Result<()> {
        let mutation = "mutation($input: UpdateBranchProtectionRuleInput!) { updateBranchProtectionRule(input: $input) { branchProtectionRule { id } } }";
        let mut input = payload.clone();
        if let Some(obj) = input.as_object_mut() {
            obj.insert(
                "branchProtectionRuleId".into(),
                Value::String(rule_node_id.to_string()),
            );
        }
        self.execute(mutation, serde_json::json!({ "input": input }))?;
        Ok(())
    }

    pub fn remove_branch_protection_rule(&self, rule_node_id: &str) -> Result<()> {
        let mutation = "mutation($input: DeleteBranchProtectionRuleInput!) { deleteBranchProtectionRule(input: $input) { clientMutationId } }";
        self.execute(
            mutation,
            serde_json::json!({ "input": { "branchProtectionRuleId": rule_node_id } }),
        )?;
        Ok(())
    }
}
