//! Re-validates every currently open pull request against the configuration
//! repository, scheduled alongside `FetchConfigTask` when an installation
//! transitions to `INSTALLED`.

use crate::github::PullRequest;
use crate::state::AppState;
use crate::task::TaskKind;
use crate::tasks::validate_pull_request;

pub struct Input {
    pub org_id: String,
    pub repo_name: String,
}

pub async fn run(state: AppState, input: Input) -> anyhow::Result<Vec<String>> {
    let provider = state.provider_for(&input.org_id)?;
    let org_id = input.org_id.clone();
    let repo_name = input.repo_name.clone();

    let pulls = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<PullRequest>> {
        let values = provider.list_open_pull_requests(&org_id, &repo_name)?;
        Ok(values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect())
    })
    .await??;

    let count = pulls.len();
    for pull_request in pulls {
        let number = pull_request.number;
        state
            .engine
            .schedule(TaskKind::ValidatePullRequest, &input.org_id, Some(&input.repo_name), Some(number), {
                let state = state.clone();
                let validate_input = validate_pull_request::Input {
                    org_id: input.org_id.clone(),
                    repo_name: input.repo_name.clone(),
                    pull_request,
                };
                move || validate_pull_request::run(state, validate_input)
            })
            .await;
    }

    Ok(vec![format!("re-validated {count} open pull request(s)")])
}
