//! Checks whether the live organization state is already in sync with the
//! configuration on the default branch, independent of what a PR proposes.
//! Runs alongside `ValidatePullRequestTask` and updates the same
//! `PullRequestModel.in_sync` field once it completes.

use otterdog_model::{Loader, Planner};

use crate::config::parse_declarative_config;
use crate::state::AppState;
use crate::tasks::validate_pull_request::Input;

pub async fn run(state: AppState, input: Input) -> anyhow::Result<Vec<String>> {
    let provider = state.provider_for(&input.org_id)?;
    let org_id = input.org_id.clone();
    let config_repo = state.config_repo.to_string();
    let org_config_file = state.org_config_file.to_string();

    let in_sync = tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let declared_text = provider
            .get_content(&org_id, &config_repo, &org_config_file)?
            .unwrap_or_else(|| "{}".to_string());
        let declared_value = parse_declarative_config(&declared_text)?;
        let loader = Loader::new();
        let expected = loader.load_from_declared(&org_id, &declared_value);
        let (current, _errors) = loader.load_from_live(&org_id, provider.as_ref(), false);

        let outcome = Planner::new().plan(&org_id, &expected, &current);
        Ok(outcome.status.is_empty())
    })
    .await??;

    let key = crate::task::PullRequestModel::key(&input.org_id, &input.repo_name, input.pull_request.number);
    if let Some(mut model) = state.pull_requests.get(&key) {
        model.in_sync = in_sync;
        state.pull_requests.upsert(key, model);
    }

    Ok(vec![format!("in_sync={in_sync}")])
}
