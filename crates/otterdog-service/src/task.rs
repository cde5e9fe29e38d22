//! Persisted task records. `TaskModel`'s identity fields are flattened
//! (rather than nested under an `identity` object) so `Collection::query`'s
//! top-level field filters can select on kind/org/repo/pull directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ValidatePullRequest,
    CheckConfigurationInSync,
    ApplyChanges,
    FetchConfig,
    FetchAllPullRequests,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::ValidatePullRequest => "ValidatePullRequestTask",
            TaskKind::CheckConfigurationInSync => "CheckConfigurationInSyncTask",
            TaskKind::ApplyChanges => "ApplyChangesTask",
            TaskKind::FetchConfig => "FetchConfigTask",
            TaskKind::FetchAllPullRequests => "FetchAllPullRequestsTask",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_in_flight(self) -> bool {
        matches!(self, TaskStatus::Queued | TaskStatus::Running)
    }
}

/// One unit of asynchronous work. `(kind, org, repo, pull)` is the identity
/// the task engine deduplicates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskModel {
    pub id: String,
    pub kind: TaskKind,
    pub org: String,
    pub repo: Option<String>,
    pub pull: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub log: Vec<String>,
}

impl TaskModel {
    pub fn new(id: impl Into<String>, kind: TaskKind, org: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind,
            org: org.into(),
            repo: None,
            pull: None,
            created_at: now,
            updated_at: now,
            status: TaskStatus::Queued,
            log: Vec::new(),
        }
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn with_pull(mut self, pull: u64) -> Self {
        self.pull = Some(pull);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstallationStatus {
    Installed,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationModel {
    pub installation_id: u64,
    pub org: String,
    pub status: InstallationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplyStatus {
    NotApplicable,
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestModel {
    pub org: String,
    pub repo: String,
    pub pull: u64,
    pub status: String,
    pub valid: bool,
    pub in_sync: bool,
    pub requires_manual_apply: bool,
    pub apply_status: ApplyStatus,
}

impl PullRequestModel {
    pub fn key(org: &str, repo: &str, pull: u64) -> String {
        format!("{org}/{repo}#{pull}")
    }
}
