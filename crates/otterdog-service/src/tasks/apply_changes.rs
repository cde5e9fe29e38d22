//! Applies the configuration that was merged into the default branch.
//! Scheduled when a config-repo pull request is merged and its
//! `apply_status` is not yet `COMPLETED`.

use otterdog_model::{Loader, Planner};
use otterdog_provider::Provider;

use crate::config::parse_declarative_config;
use crate::state::AppState;
use crate::task::{ApplyStatus, PullRequestModel};

pub struct Input {
    pub org_id: String,
    pub repo_name: String,
    pub pull: u64,
}

pub async fn run(state: AppState, input: Input) -> anyhow::Result<Vec<String>> {
    let provider = state.provider_for(&input.org_id)?;
    let org_id = input.org_id.clone();
    let config_repo = state.config_repo.to_string();
    let org_config_file = state.org_config_file.to_string();
    let delete_extras = state.settings.planner.delete_extras;

    let key = PullRequestModel::key(&input.org_id, &input.repo_name, input.pull);
    mark_apply_status(&state, &key, ApplyStatus::Pending);

    let outcome = {
        let provider = std::sync::Arc::clone(&provider);
        tokio::task::spawn_blocking(move || -> anyhow::Result<otterdog_model::RunOutcome> {
            let declared_text = provider
                .get_content(&org_id, &config_repo, &org_config_file)?
                .unwrap_or_else(|| "{}".to_string());
            let declared_value = parse_declarative_config(&declared_text)?;
            let loader = Loader::new();
            let expected = loader.load_from_declared(&org_id, &declared_value);
            let (current, _errors) = loader.load_from_live(&org_id, provider.as_ref(), false);

            let planner = Planner::new().with_delete_extras(delete_extras);
            Ok(planner.apply(&org_id, &expected, &current, provider.as_ref())?)
        })
        .await?
    };

    match outcome {
        Ok(outcome) => {
            mark_apply_status(&state, &key, ApplyStatus::Completed);
            Ok(vec![outcome.summary_line(otterdog_model::PlannerMode::Apply)])
        }
        Err(e) => {
            mark_apply_status(&state, &key, ApplyStatus::Failed);
            post_failure_comment(&provider, &input, &e.to_string()).await.ok();
            Err(e)
        }
    }
}

fn mark_apply_status(state: &AppState, key: &str, status: ApplyStatus) {
    if let Some(mut model) = state.pull_requests.get(key) {
        model.apply_status = status;
        state.pull_requests.upsert(key.to_string(), model);
    }
}

async fn post_failure_comment(
    provider: &std::sync::Arc<dyn Provider + Send + Sync>,
    input: &Input,
    message: &str,
) -> anyhow::Result<()> {
    let provider = std::sync::Arc::clone(provider);
    let org = input.org_id.clone();
    let repo = input.repo_name.clone();
    let pull = input.pull;
    let body = format!("Applying the merged configuration failed:\n\n```\n{message}\n```\n");
    tokio::task::spawn_blocking(move || provider.create_issue_comment(&org, &repo, pull, &body)).await??;
    Ok(())
}
