//! Installation lifecycle: `suspend`/`unsuspend` flip an existing
//! `InstallationModel`'s status in place; `created`/`deleted` reconcile the
//! configured-organizations list against what the forge app reports
//! installed, rather than patching a single row.

use crate::state::AppState;
use crate::task::{InstallationModel, InstallationStatus, TaskKind};
use crate::tasks::{fetch_all_pull_requests, fetch_config};

pub struct Input {
    pub installation_id: u64,
    pub org: String,
    pub config_repo: String,
    pub action: String,
}

pub async fn run(state: AppState, input: Input) -> anyhow::Result<Vec<String>> {
    match input.action.as_str() {
        "suspend" => {
            set_status(&state, input.installation_id, InstallationStatus::Suspended);
            Ok(vec![format!("installation {} suspended", input.installation_id)])
        }
        "unsuspend" => {
            set_status(&state, input.installation_id, InstallationStatus::Installed);
            Ok(vec![format!("installation {} unsuspended", input.installation_id)])
        }
        "created" => {
            state.installations.upsert(
                input.installation_id.to_string(),
                InstallationModel {
                    installation_id: input.installation_id,
                    org: input.org.clone(),
                    status: InstallationStatus::Installed,
                },
            );
            state
                .engine
                .schedule(TaskKind::FetchConfig, &input.org, None, None, {
                    let state = state.clone();
                    let org_id = input.org.clone();
                    move || fetch_config::run(state, fetch_config::Input { org_id })
                })
                .await;
            state
                .engine
                .schedule(TaskKind::FetchAllPullRequests, &input.org, Some(&input.config_repo), None, {
                    let state = state.clone();
                    let org_id = input.org.clone();
                    let repo_name = input.config_repo.clone();
                    move || fetch_all_pull_requests::run(state, fetch_all_pull_requests::Input { org_id, repo_name })
                })
                .await;
            Ok(vec![format!("installation {} created, scheduled initial sync", input.installation_id)])
        }
        "deleted" => {
            state.installations.remove(&input.installation_id.to_string());
            Ok(vec![format!("installation {} deleted", input.installation_id)])
        }
        other => anyhow::bail!("unhandled installation action '{other}'"),
    }
}

fn set_status(state: &AppState, installation_id: u64, status: InstallationStatus) {
    if let Some(mut model) = state.installations.get(&installation_id.to_string()) {
        model.status = status;
        state.installations.upsert(installation_id.to_string(), model);
    }
}
