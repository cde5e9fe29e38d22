//! Per-organization credential resolution.
//!
//! Resolution order: an org-scoped environment variable, then a process-wide
//! fallback environment variable, then an on-disk credentials file. A
//! `CredentialResolver` trait seam exists for secret managers (bitwarden,
//! pass) named by tag in a profile; this crate ships only the env/file
//! resolvers, the external-secret-manager resolvers are out of scope.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use otterdog_types::{OtterdogError, Result};
use serde::{Deserialize, Serialize};

/// The fully resolved credential bundle for one organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub totp_seed: Option<String>,
    pub api_token: Option<String>,
    pub github_app_id: Option<String>,
    pub github_app_private_key: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.api_token.is_none()
            && self.github_app_id.is_none()
    }
}

/// How a profile declares where its secrets live. `Bitwarden`/`Pass` name the
/// external manager a `CredentialResolver` implementation would target; this
/// crate's default chain only implements `Env`/`File`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CredentialProfile {
    Env,
    File,
    Bitwarden { item: String },
    Pass { path: String },
}

/// A pluggable secret-manager lookup. Implemented by this crate for
/// `Env`/`File`; a bitwarden/pass-backed resolver would implement this trait
/// without touching the resolution chain below.
pub trait CredentialResolver {
    fn resolve(&self, org: &str, profile: &CredentialProfile) -> Result<Credentials>;
}

pub const CREDENTIALS_FILE: &str = "credentials.toml";

fn otterdog_home_dir() -> Result<PathBuf> {
    if let Ok(home) = env::var("OTTERDOG_HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|h| h.join(".otterdog"))
        .ok_or_else(|| OtterdogError::Credential("neither OTTERDOG_HOME nor HOME is set".into()))
}

fn normalize_for_env(org: &str) -> String {
    org.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

fn token_from_env(org: &str) -> Option<String> {
    let scoped = format!("OTTERDOG_{}_TOKEN", normalize_for_env(org));
    env::var(scoped)
        .ok()
        .or_else(|| env::var("OTTERDOG_TOKEN").ok())
        .filter(|s| !s.trim().is_empty())
}

#[derive(Deserialize, Default)]
struct CredentialsFile {
    #[serde(default)]
    default: Option<CredentialsFileEntry>,
    #[serde(default)]
    orgs: HashMap<String, CredentialsFileEntry>,
}

#[derive(Deserialize, Default, Clone)]
struct CredentialsFileEntry {
    username: Option<String>,
    password: Option<String>,
    totp_seed: Option<String>,
    api_token: Option<String>,
    github_app_id: Option<String>,
    github_app_private_key: Option<String>,
}

impl From<CredentialsFileEntry> for Credentials {
    fn from(e: CredentialsFileEntry) -> Self {
        Credentials {
            username: e.username,
            password: e.password,
            totp_seed: e.totp_seed,
            api_token: e.api_token,
            github_app_id: e.github_app_id,
            github_app_private_key: e.github_app_private_key,
        }
    }
}

fn credentials_from_file(org: &str) -> Result<Option<Credentials>> {
    let home = otterdog_home_dir()?;
    let path = home.join(CREDENTIALS_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| OtterdogError::Credential(format!("reading {}: {e}", path.display())))?;
    let parsed: CredentialsFile = toml::from_str(&contents)
        .map_err(|e| OtterdogError::Credential(format!("parsing {}: {e}", path.display())))?;
    if let Some(entry) = parsed.orgs.get(org) {
        return Ok(Some(entry.clone().into()));
    }
    Ok(parsed.default.map(Into::into))
}

/// The default env/file resolver, ordered per §6 of the reconciliation
/// engine's external interfaces.
pub struct DefaultCredentialResolver;

impl CredentialResolver for DefaultCredentialResolver {
    fn resolve(&self, org: &str, profile: &CredentialProfile) -> Result<Credentials> {
        match profile {
            CredentialProfile::Env => {
                let token = token_from_env(org).ok_or_else(|| {
                    OtterdogError::Credential(format!(
                        "no OTTERDOG_{}_TOKEN or OTTERDOG_TOKEN set",
                        normalize_for_env(org)
                    ))
                })?;
                Ok(Credentials {
                    api_token: Some(token),
                    ..Default::default()
                })
            }
            CredentialProfile::File => credentials_from_file(org)?.ok_or_else(|| {
                OtterdogError::Credential(format!(
                    "no credentials for org '{org}' in {}",
                    otterdog_home_dir()
                        .map(|h| h.join(CREDENTIALS_FILE).display().to_string())
                        .unwrap_or_default()
                ))
            }),
            CredentialProfile::Bitwarden { .. } | CredentialProfile::Pass { .. } => {
                Err(OtterdogError::Credential(
                    "external secret-manager resolvers are not implemented".into(),
                ))
            }
        }
    }
}

/// Resolves credentials the way the CLI and service do by default: try the
/// env resolver first (cheap, no filesystem access), then fall back to the
/// credentials file.
pub fn resolve_credentials(org: &str) -> Result<Credentials> {
    let resolver = DefaultCredentialResolver;
    if let Ok(creds) = resolver.resolve(org, &CredentialProfile::Env) {
        return Ok(creds);
    }
    resolver.resolve(org, &CredentialProfile::File)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    struct EnvGuard {
        key: String,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let previous = env::var(key).ok();
            unsafe {
                env::set_var(key, value);
            }
            Self { key: key.to_string(), previous }
        }

        fn unset(key: &str) -> Self {
            let previous = env::var(key).ok();
            unsafe {
                env::remove_var(key);
            }
            Self { key: key.to_string(), previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            unsafe {
                match &self.previous {
                    Some(v) => env::set_var(&self.key, v),
                    None => env::remove_var(&self.key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn org_scoped_env_var_wins_over_global() {
        let _global = EnvGuard::set("OTTERDOG_TOKEN", "global-token");
        let _scoped = EnvGuard::set("OTTERDOG_ACME_TOKEN", "scoped-token");
        let creds = resolve_credentials("acme").unwrap();
        assert_eq!(creds.api_token.as_deref(), Some("scoped-token"));
    }

    #[test]
    #[serial]
    fn global_env_var_is_the_fallback() {
        let _scoped_absent = EnvGuard::unset("OTTERDOG_ACME_TOKEN");
        let _global = EnvGuard::set("OTTERDOG_TOKEN", "global-token");
        let creds = resolve_credentials("acme").unwrap();
        assert_eq!(creds.api_token.as_deref(), Some("global-token"));
    }

    #[test]
    #[serial]
    fn falls_back_to_credentials_file_when_no_env_var_is_set() {
        let _scoped_absent = EnvGuard::unset("OTTERDOG_ACME_TOKEN");
        let _global_absent = EnvGuard::unset("OTTERDOG_TOKEN");
        let dir = tempfile::tempdir().unwrap();
        let _home = EnvGuard::set("OTTERDOG_HOME", dir.path().to_str().unwrap());
        let mut f = std::fs::File::create(dir.path().join(CREDENTIALS_FILE)).unwrap();
        writeln!(f, "[orgs.acme]\napi_token = \"file-token\"").unwrap();
        let creds = resolve_credentials("acme").unwrap();
        assert_eq!(creds.api_token.as_deref(), Some("file-token"));
    }

    #[test]
    fn normalizes_org_names_for_env_lookup() {
        assert_eq!(normalize_for_env("my-org.io"), "MY_ORG_IO");
    }
}
