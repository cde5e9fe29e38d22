//! Inbound webhook payload shapes and the PR state mapping rule, adapted
//! from the forge's own event schema rather than invented.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestStatus {
    Open,
    Merged,
    Closed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Actor,
    pub default_branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ref {
    pub r#ref: String,
    pub sha: String,
    pub repo: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: String,
    pub merged: Option<bool>,
    pub head: Ref,
    pub base: Ref,
}

impl PullRequest {
    /// `state=open → OPEN`; `state=closed, merged=true → MERGED`;
    /// `state=closed, merged=false → CLOSED`. Any other combination is
    /// invalid input (P8: total over valid inputs, deterministic).
    pub fn status(&self) -> Result<PullRequestStatus, String> {
        match self.state.as_str() {
            "open" => Ok(PullRequestStatus::Open),
            "closed" if self.merged == Some(true) => Ok(PullRequestStatus::Merged),
            "closed" => Ok(PullRequestStatus::Closed),
            other => Err(format!("unexpected pull request state '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Installation {
    pub id: u64,
    pub account: Actor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub installation: Option<Installation>,
    pub repository: Repository,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationEvent {
    pub action: String,
    pub installation: Installation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    pub installation: Option<Installation>,
    pub r#ref: String,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentEvent {
    pub action: String,
    pub installation: Option<Installation>,
    pub repository: Repository,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(state: &str, merged: Option<bool>) -> PullRequest {
        PullRequest {
            number: 1,
            state: state.into(),
            merged,
            head: Ref {
                r#ref: "feature".into(),
                sha: "abc".into(),
                repo: Repository {
                    name: "config".into(),
                    full_name: "acme/config".into(),
                    owner: Actor { login: "acme".into() },
                    default_branch: "main".into(),
                },
            },
            base: Ref {
                r#ref: "main".into(),
                sha: "def".into(),
                repo: Repository {
                    name: "config".into(),
                    full_name: "acme/config".into(),
                    owner: Actor { login: "acme".into() },
                    default_branch: "main".into(),
                },
            },
        }
    }

    #[test]
    fn open_maps_to_open() {
        assert_eq!(pr("open", None).status().unwrap(), PullRequestStatus::Open);
    }

    #[test]
    fn closed_and_merged_maps_to_merged() {
        assert_eq!(pr("closed", Some(true)).status().unwrap(), PullRequestStatus::Merged);
    }

    #[test]
    fn closed_and_not_merged_maps_to_closed() {
        assert_eq!(pr("closed", Some(false)).status().unwrap(), PullRequestStatus::Closed);
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(pr("draft", None).status().is_err());
    }
}
