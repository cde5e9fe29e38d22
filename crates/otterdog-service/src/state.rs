//! Explicit, passed-in context in place of a process-wide app singleton:
//! every task handler receives a `TaskContext` rather than reaching for
//! global credential lookup, store handles, or config.

use std::sync::Arc;

use otterdog_config::{OtterdogSettings, resolve_credentials};
use otterdog_provider::ForgeProvider;
use otterdog_store::{Collection, SnapshotStore};
use otterdog_types::{OtterdogError, Result};

use crate::engine::TaskEngine;
use crate::task::{InstallationModel, PullRequestModel, TaskModel};

pub const DEFAULT_VALIDATION_CONTEXT: &str = "otterdog/validation";
pub const DEFAULT_ORG_CONFIG_FILE: &str = "otterdog.json";
pub const DEFAULT_CONFIG_REPO: &str = ".otterdog";

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<OtterdogSettings>,
    pub installations: Arc<Collection<InstallationModel>>,
    pub pull_requests: Arc<Collection<PullRequestModel>>,
    pub snapshots: Arc<SnapshotStore>,
    pub engine: TaskEngine,
    pub webhook_secret: Arc<str>,
    pub validation_context: Arc<str>,
    pub admin_team: Arc<str>,
    pub config_repo: Arc<str>,
    pub org_config_file: Arc<str>,
}

impl AppState {
    pub fn new(settings: OtterdogSettings, webhook_secret: impl Into<Arc<str>>) -> Self {
        let tasks = Arc::new(Collection::<TaskModel>::new());
        Self {
            settings: Arc::new(settings),
            installations: Arc::new(Collection::new()),
            pull_requests: Arc::new(Collection::new()),
            snapshots: Arc::new(SnapshotStore::new("./.otterdog-state/snapshots")),
            engine: TaskEngine::new(tasks),
            webhook_secret: webhook_secret.into(),
            validation_context: Arc::from(DEFAULT_VALIDATION_CONTEXT),
            admin_team: Arc::from("admins"),
            config_repo: Arc::from(DEFAULT_CONFIG_REPO),
            org_config_file: Arc::from(DEFAULT_ORG_CONFIG_FILE),
        }
    }

    /// Builds a `Provider` for `org` from the resolved credential chain.
    /// Web-UI scraping is never used from the service: the installation
    /// token the app authenticates with has no interactive browser session.
    pub fn provider_for(&self, org: &str) -> Result<Arc<dyn otterdog_provider::Provider + Send + Sync>> {
        let credentials = resolve_credentials(org)?;
        let token = credentials
            .api_token
            .ok_or_else(|| OtterdogError::Credential(format!("no api token resolved for org '{org}'")))?;
        let provider = ForgeProvider::new(token)?;
        Ok(Arc::new(provider))
    }
}
