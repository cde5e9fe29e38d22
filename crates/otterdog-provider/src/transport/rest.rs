//! REST transport: JSON over HTTPS against the forge's REST API, with a
//! GET-only URL+params cache, `per_page=100` pagination, and exponential
//! backoff on transient failures.

use base64::Engine;
use otterdog_retry::{PerErrorConfig, RetryStrategyConfig, retry_blocking};
use otterdog_types::{ErrorClass, OtterdogError, Result};
use serde_json::Value;

use crate::cache::RestCache;

const GH_API_URL_ROOT: &str = "https://api.github.com";
const GH_API_VERSION: &str = "2022-11-28";
const PER_PAGE: u32 = 100;

pub struct RestTransport {
    http: reqwest::blocking::Client,
    api_root: String,
    token: String,
    cache: RestCache,
    retry_config: RetryStrategyConfig,
    per_error: PerErrorConfig,
}

fn classify_status(status: u16) -> ErrorClass {
    match status {
        401 => ErrorClass::Permanent,
        403 | 500..=599 => ErrorClass::Retryable,
        _ => ErrorClass::Permanent,
    }
}

impl RestTransport {
    pub fn new(token: String) -> Result<Self> {
        Self::with_api_root(token, GH_API_URL_ROOT.to_string())
    }

    pub fn with_api_root(token: String, api_root: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent("otterdog")
            .build()
            .map_err(|e| OtterdogError::Provider {
                status: 0,
                url: api_root.clone(),
                body: e.to_string(),
            })?;
        Ok(Self {
            http,
            api_root,
            token,
            cache: RestCache::new(),
            retry_config: RetryStrategyConfig::default(),
            per_error: PerErrorConfig::default(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_root)
    }

    fn auth_headers(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", GH_API_VERSION)
            .header("Accept", "application/vnd.github+json")
    }

    fn execute(
        &self,
        build: impl Fn() -> reqwest::blocking::RequestBuilder,
        url: &str,
    ) -> Result<Value> {
        retry_blocking(
            &self.retry_config,
            &self.per_error,
            |err: &OtterdogError| match err {
                OtterdogError::BadCredentials(_) => ErrorClass::Permanent,
                OtterdogError::Provider { status, .. } => classify_status(*status),
                _ => ErrorClass::Permanent,
            },
            |_attempt| -> std::result::Result<Value, OtterdogError> {
                let response = self
                    .auth_headers(build())
                    .send()
                    .map_err(|e| OtterdogError::Provider {
                        status: 0,
                        url: url.to_string(),
                        body: e.to_string(),
                    })?;
                let status = response.status();
                let body = response.text().unwrap_or_default();
                if status.as_u16() == 401 {
                    return Err(OtterdogError::BadCredentials(format!(
                        "401 from {url}"
                    )));
                }
                if !status.is_success() {
                    return Err(OtterdogError::Provider {
                        status: status.as_u16(),
                        url: url.to_string(),
                        body,
                    });
                }
                if body.is_empty() {
                    Ok(Value::Null)
                } else {
                    serde_json::from_str(&body).map_err(|e| OtterdogError::Provider {
                        status: status.as_u16(),
                        url: url.to_string(),
                        body: format!("invalid JSON: {e}"),
                    })
                }
            },
        )
    }

    /// Cached GET. Only safe for idempotent reads; writes never go through
    /// this path.
    pub fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.url(path);
        let key = RestCache::key(&url, params);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let value = self.execute(
            || self.http.get(&url).query(params),
            &url,
        )?;
        self.cache.put(key, value.clone());
        Ok(value)
    }

    /// Follows `per_page=100` pagination until an empty page is returned.
    pub fn get_paginated(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<Value>> {
        let mut page = 1u32;
        let mut all = Vec::new();
        loop {
            let page_str = page.to_string();
            let per_page_str = PER_PAGE.to_string();
            let mut this_page_params = params.to_vec();
            this_page_params.push(("per_page", per_page_str.as_str()));
            this_page_params.push(("page", page_str.as_str()));
            let value = self.get(path, &this_page_params)?;
            let items = value.as_array().cloned().unwrap_or_default();
            let got = items.len();
            all.extend(items);
            if got < PER_PAGE as usize {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// Same pagination loop as `get_paginated`, but for endpoints that wrap
    /// the page in an object (`{"total_count": N, "<key>": [...]}`) instead
    /// of returning a bare array.
    pub fn get_paginated_wrapped(&self, path: &str, params: &[(&str, &str)], key: &str) -> Result<Vec<Value>> {
        let mut page = 1u32;
        let mut all = Vec::new();
        loop {
            let page_str = page.to_string();
            let per_page_str = PER_PAGE.to_string();
            let mut this_page_params = params.to_vec();
            this_page_params.push(("per_page", per_page_str.as_str()));
            this_page_params.push(("page", page_str.as_str()));
            let value = self.get(path, &this_page_params)?;
            let items = value[key].as_array().cloned().unwrap_or_default();
            let got = items.len();
            all.extend(items);
            if got < PER_PAGE as usize {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    pub fn post(&self, path: &str, payload: &Value) -> Result<Value> {
        let url = self.url(path);
        self.execute(|| self.http.post(&url).json(payload), &url)
    }

    pub fn patch(&self, path: &str, payload: &Value) -> Result<Value> {
        let url = self.url(path);
        self.execute(|| self.http.patch(&url).json(payload), &url)
    }

    pub fn delete(&self, path: &str) -> Result<Value> {
        let url = self.url(path);
        self.execute(|| self.http.delete(&url), &url)
    }

    pub fn put(&self, path: &str, payload: &Value) -> Result<Value> {
        let url = self.url(path);
        self.execute(|| self.http.put(&url).json(payload), &url)
    }
}

/// Org settings filtered to `included_keys`, with `security_managers`
/// merged in from a separate call when requested — the plain settings
/// response does not carry it.
pub fn get_org_settings(
    transport: &RestTransport,
    org_id: &str,
    included_keys: &[&str],
) -> Result<Value> {
    let mut settings = transport.get(&format!("/orgs/{org_id}"), &[])?;
    if included_keys.contains(&"security_managers") {
        let teams = list_security_managers(transport, org_id)?;
        if let Some(obj) = settings.as_object_mut() {
            obj.insert("security_managers".into(), Value::Array(teams));
        }
    }
    if let Some(obj) = settings.as_object_mut() {
        obj.retain(|k, _| included_keys.is_empty() || included_keys.contains(&k.as_str()));
    }
    Ok(settings)
}

pub fn list_security_managers(transport: &RestTransport, org_id: &str) -> Result<Vec<Value>> {
    transport.get_paginated(&format!("/orgs/{org_id}/security-managers/teams"), &[])
}

/// PATCHes the scalar settings, then separately reconciles the
/// security-manager team set by add/remove rather than a bulk call.
pub fn update_org_settings(transport: &RestTransport, org_id: &str, payload: &Value) -> Result<()> {
    let mut scalar = payload.clone();
    let requested_teams: Option<Vec<String>> = scalar
        .as_object_mut()
        .and_then(|obj| obj.remove("security_managers"))
        .map(|v| {
            v.as_array()
                .map(|a| a.iter().filter_map(|s| s.as_str().map(String::from)).collect())
                .unwrap_or_default()
        });
    if scalar.as_object().is_some_and(|o| !o.is_empty()) {
        transport.patch(&format!("/orgs/{org_id}"), &scalar)?;
    }
    if let Some(requested) = requested_teams {
        update_security_managers(transport, org_id, &requested)?;
    }
    Ok(())
}

fn update_security_managers(transport: &RestTransport, org_id: &str, requested: &[String]) -> Result<()> {
    let current = list_security_managers(transport, org_id)?;
    let current_slugs: Vec<String> = current
        .iter()
        .filter_map(|t| t["slug"].as_str().map(String::from))
        .collect();
    for slug in requested {
        if !current_slugs.contains(slug) {
            transport.put(
                &format!("/orgs/{org_id}/security-managers/teams/{slug}"),
                &Value::Null,
            )?;
        }
    }
    for slug in &current_slugs {
        if !requested.contains(slug) {
            transport.delete(&format!("/orgs/{org_id}/security-managers/teams/{slug}"))?;
        }
    }
    Ok(())
}

pub fn list_webhooks(transport: &RestTransport, org_id: &str) -> Result<Vec<Value>> {
    transport.get_paginated(&format!("/orgs/{org_id}/hooks"), &[])
}

pub fn add_webhook(transport: &RestTransport, org_id: &str, payload: &Value) -> Result<Value> {
    let mut body = payload.clone();
    if let Some(obj) = body.as_object_mut() {
        obj.entry("name").or_insert_with(|| Value::String("web".into()));
    }
    transport.post(&format!("/orgs/{org_id}/hooks"), &body)
}

pub fn update_webhook(transport: &RestTransport, org_id: &str, hook_id: &str, payload: &Value) -> Result<()> {
    transport.patch(&format!("/orgs/{org_id}/hooks/{hook_id}"), payload)?;
    Ok(())
}

pub fn remove_webhook(transport: &RestTransport, org_id: &str, hook_id: &str) -> Result<()> {
    transport.delete(&format!("/orgs/{org_id}/hooks/{hook_id}"))?;
    Ok(())
}

pub fn list_repos(transport: &RestTransport, org_id: &str) -> Result<Vec<Value>> {
    transport.get_paginated(&format!("/orgs/{org_id}/repos"), &[])
}

pub fn add_repo(transport: &RestTransport, org_id: &str, payload: &Value) -> Result<Value> {
    transport.post(&format!("/orgs/{org_id}/repos"), payload)
}

pub fn update_repo(transport: &RestTransport, org_id: &str, name: &str, payload: &Value) -> Result<()> {
    transport.patch(&format!("/repos/{org_id}/{name}"), payload)?;
    Ok(())
}

pub fn remove_repo(transport: &RestTransport, org_id: &str, name: &str) -> Result<()> {
    transport.delete(&format!("/repos/{org_id}/{name}"))?;
    Ok(())
}

pub fn get_repo_workflow_settings(transport: &RestTransport, org_id: &str, repo: &str) -> Result<Value> {
    transport.get(&format!("/repos/{org_id}/{repo}/actions/permissions"), &[])
}

pub fn update_repo_workflow_settings(
    transport: &RestTransport,
    org_id: &str,
    repo: &str,
    payload: &Value,
) -> Result<()> {
    transport.put(&format!("/repos/{org_id}/{repo}/actions/permissions"), payload)?;
    Ok(())
}

/// Fetches a content blob's decoded text and its `sha`, used both for
/// reading the declarative config from a repo and for the no-op check in
/// `put_content`.
pub fn get_content(
    transport: &RestTransport,
    org_id: &str,
    repo: &str,
    path: &str,
) -> Result<Option<(String, String)>> {
    let result = transport.get(&format!("/repos/{org_id}/{repo}/contents/{path}"), &[]);
    match result {
        Ok(value) => {
            let encoded = value["content"].as_str().unwrap_or_default().replace('\n', "");
            let sha = value["sha"].as_str().unwrap_or_default().to_string();
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| OtterdogError::Provider {
                    status: 0,
                    url: path.to_string(),
                    body: format!("invalid base64 content: {e}"),
                })?;
            let text = String::from_utf8(decoded).map_err(|e| OtterdogError::Provider {
                status: 0,
                url: path.to_string(),
                body: format!("non-utf8 content: {e}"),
            })?;
            Ok(Some((text, sha)))
        }
        Err(OtterdogError::Provider { status: 404, .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Same as `get_content` but pinned to a branch or SHA, used to compare a
/// PR's base and head configuration without touching the default branch.
pub fn get_content_at_ref(
    transport: &RestTransport,
    org_id: &str,
    repo: &str,
    path: &str,
    git_ref: &str,
) -> Result<Option<String>> {
    let result = transport.get(&format!("/repos/{org_id}/{repo}/contents/{path}"), &[("ref", git_ref)]);
    match result {
        Ok(value) => {
            let encoded = value["content"].as_str().unwrap_or_default().replace('\n', "");
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| OtterdogError::Provider {
                    status: 0,
                    url: path.to_string(),
                    body: format!("invalid base64 content: {e}"),
                })?;
            let text = String::from_utf8(decoded).map_err(|e| OtterdogError::Provider {
                status: 0,
                url: path.to_string(),
                body: format!("non-utf8 content: {e}"),
            })?;
            Ok(Some(text))
        }
        Err(OtterdogError::Provider { status: 404, .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Skips the PUT entirely when the new content is byte-identical to what's
/// already there (§4.4 content-update no-op supplement).
pub fn put_content(
    transport: &RestTransport,
    org_id: &str,
    repo: &str,
    path: &str,
    content: &str,
    message: &str,
) -> Result<()> {
    let existing = get_content(transport, org_id, repo, path)?;
    if let Some((existing_text, _)) = &existing {
        if existing_text == content {
            return Ok(());
        }
    }
    let encoded = base64::engine::general_purpose::STANDARD.encode(content.as_bytes());
    let mut body = serde_json::json!({
        "message": message,
        "content": encoded,
    });
    if let Some((_, sha)) = existing {
        body["sha"] = Value::String(sha);
    }
    transport.put(&format!("/repos/{org_id}/{repo}/contents/{path}"), &body)?;
    Ok(())
}

/// Posts a commit status, used by the webhook service to report pull
/// request validation results back to the forge.
pub fn post_commit_status(transport: &RestTransport, org_id: &str, repo: &str, sha: &str, payload: &Value) -> Result<()> {
    transport.post(&format!("/repos/{org_id}/{repo}/statuses/{sha}"), payload)?;
    Ok(())
}

/// Fetches a single pull request by number, used when a webhook event only
/// carries the PR number rather than the full resource.
pub fn get_pull_request(transport: &RestTransport, org_id: &str, repo: &str, number: u64) -> Result<Value> {
    transport.get(&format!("/repos/{org_id}/{repo}/pulls/{number}"), &[])
}

pub fn list_open_pull_requests(transport: &RestTransport, org_id: &str, repo: &str) -> Result<Vec<Value>> {
    transport.get_paginated(&format!("/repos/{org_id}/{repo}/pulls"), &[("state", "open")])
}

pub fn list_org_secrets(transport: &RestTransport, org_id: &str) -> Result<Vec<Value>> {
    transport.get_paginated_wrapped(&format!("/orgs/{org_id}/actions/secrets"), &[], "secrets")
}

pub fn put_org_secret(transport: &RestTransport, org_id: &str, name: &str, payload: &Value) -> Result<()> {
    transport.put(&format!("/orgs/{org_id}/actions/secrets/{name}"), payload)?;
    Ok(())
}

pub fn remove_org_secret(transport: &RestTransport, org_id: &str, name: &str) -> Result<()> {
    transport.delete(&format!("/orgs/{org_id}/actions/secrets/{name}"))?;
    Ok(())
}

pub fn list_repo_secrets(transport: &RestTransport, org_id: &str, repo: &str) -> Result<Vec<Value>> {
    transport.get_paginated_wrapped(&format!("/repos/{org_id}/{repo}/actions/secrets"), &[], "secrets")
}

pub fn put_repo_secret(transport: &RestTransport, org_id: &str, repo: &str, name: &str, payload: &Value) -> Result<()> {
    transport.put(&format!("/repos/{org_id}/{repo}/actions/secrets/{name}"), payload)?;
    Ok(())
}

pub fn remove_repo_secret(transport: &RestTransport, org_id: &str, repo: &str, name: &str) -> Result<()> {
    transport.delete(&format!("/repos/{org_id}/{repo}/actions/secrets/{name}"))?;
    Ok(())
}

pub fn list_org_rulesets(transport: &RestTransport, org_id: &str) -> Result<Vec<Value>> {
    transport.get_paginated(&format!("/orgs/{org_id}/rulesets"), &[])
}

pub fn add_org_ruleset(transport: &RestTransport, org_id: &str, payload: &Value) -> Result<Value> {
    transport.post(&format!("/orgs/{org_id}/rulesets"), payload)
}

pub fn update_org_ruleset(transport: &RestTransport, org_id: &str, ruleset_id: &str, payload: &Value) -> Result<()> {
    transport.put(&format!("/orgs/{org_id}/rulesets/{ruleset_id}"), payload)?;
    Ok(())
}

pub fn remove_org_ruleset(transport: &RestTransport, org_id: &str, ruleset_id: &str) -> Result<()> {
    transport.delete(&format!("/orgs/{org_id}/rulesets/{ruleset_id}"))?;
    Ok(())
}

pub fn list_repo_rulesets(transport: &RestTransport, org_id: &str, repo: &str) -> Result<Vec<Value>> {
    transport.get_paginated(&format!("/repos/{org_id}/{repo}/rulesets"), &[])
}

pub fn add_repo_ruleset(transport: &RestTransport, org_id: &str, repo: &str, payload: &Value) -> Result<Value> {
    transport.post(&format!("/repos/{org_id}/{repo}/rulesets"), payload)
}

pub fn update_repo_ruleset(
    transport: &RestTransport,
    org_id: &str,
    repo: &str,
    ruleset_id: &str,
    payload: &Value,
) -> Result<()> {
    transport.put(&format!("/repos/{org_id}/{repo}/rulesets/{ruleset_id}"), payload)?;
    Ok(())
}

pub fn remove_repo_ruleset(transport: &RestTransport, org_id: &str, repo: &str, ruleset_id: &str) -> Result<()> {
    transport.delete(&format!("/repos/{org_id}/{repo}/rulesets/{ruleset_id}"))?;
    Ok(())
}

pub fn list_repo_environments(transport: &RestTransport, org_id: &str, repo: &str) -> Result<Vec<Value>> {
    transport.get_paginated_wrapped(&format!("/repos/{org_id}/{repo}/environments"), &[], "environments")
}

pub fn put_repo_environment(transport: &RestTransport, org_id: &str, repo: &str, name: &str, payload: &Value) -> Result<()> {
    transport.put(&format!("/repos/{org_id}/{repo}/environments/{name}"), payload)?;
    Ok(())
}

pub fn remove_repo_environment(transport: &RestTransport, org_id: &str, repo: &str, name: &str) -> Result<()> {
    transport.delete(&format!("/repos/{org_id}/{repo}/environments/{name}"))?;
    Ok(())
}

/// Pull request comments live on the issues endpoint on every forge this
/// provider targets.
pub fn create_issue_comment(transport: &RestTransport, org_id: &str, repo: &str, number: u64, body: &str) -> Result<()> {
    transport.post(
        &format!("/repos/{org_id}/{repo}/issues/{number}/comments"),
        &serde_json::json!({ "body": body }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_server() -> (tiny_http::Server, String) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();
        (server, format!("http://{addr}"))
    }

    fn respond(server: &tiny_http::Server, status: u16, body: &str) {
        let request = server.recv().unwrap();
        let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
        let response = tiny_http::Response::from_string(body)
            .with_status_code(status)
            .with_header(header);
        request.respond(response).unwrap();
    }

    #[test]
    fn get_caches_repeat_requests() {
        let (server, base) = start_server();
        let transport = RestTransport::with_api_root("token".into(), base).unwrap();
        let handle = std::thread::spawn(move || {
            respond(&server, 200, r#"{"login":"acme"}"#);
        });
        let first = transport.get("/orgs/acme", &[]).unwrap();
        handle.join().unwrap();
        assert_eq!(first["login"], "acme");
        // Second call must not hit the network (server already stopped responding).
        let second = transport.get("/orgs/acme", &[]).unwrap();
        assert_eq!(second["login"], "acme");
    }

    #[test]
    fn unauthorized_is_not_retried() {
        let (server, base) = start_server();
        let transport = RestTransport::with_api_root("bad-token".into(), base).unwrap();
        let handle = std::thread::spawn(move || {
            respond(&server, 401, r#"{"message":"Bad credentials"}"#);
        });
        let result = transport.get("/orgs/acme", &[]);
        handle.join().unwrap();
        assert!(matches!(result, Err(OtterdogError::BadCredentials(_))));
    }

    #[test]
    fn not_found_surfaces_as_forge_error_with_status() {
        let (server, base) = start_server();
        let transport = RestTransport::with_api_root("token".into(), base).unwrap();
        let handle = std::thread::spawn(move || {
            respond(&server, 404, r#"{"message":"Not Found"}"#);
        });
        let result = transport.get("/orgs/nope", &[]);
        handle.join().unwrap();
        match result {
            Err(OtterdogError::Provider { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected ForgeError, got {other:?}"),
        }
    }

    #[test]
    fn content_round_trip_decodes_base64() {
        let (server, base) = start_server();
        let transport = RestTransport::with_api_root("token".into(), base).unwrap();
        let body = serde_json::json!({
            "content": base64::engine::general_purpose::STANDARD.encode(b"hello = 1\n"),
            "sha": "abc123",
        })
        .to_string();
        let handle = std::thread::spawn(move || {
            respond(&server, 200, &body);
        });
        let (text, sha) = get_content(&transport, "acme", "config", "acme.jsonnet")
            .unwrap()
            .unwrap();
        handle.join().unwrap();
        assert_eq!(text, "hello = 1\n");
        assert_eq!(sha, "abc123");
    }

    #[test]
    fn missing_content_path_is_none() {
        let (server, base) = start_server();
        let transport = RestTransport::with_api_root("token".into(), base).unwrap();
        let handle = std::thread::spawn(move || {
            respond(&server, 404, r#"{"message":"Not Found"}"#);
        });
        let result = get_content(&transport, "acme", "config", "missing.jsonnet").unwrap();
        handle.join().unwrap();
        assert!(result.is_none());
    }
}
