//! Validates a pull request against the configuration repository and posts
//! the result as both a commit status and a PR comment.

use std::sync::Arc;

use otterdog_model::{Loader, Planner};
use otterdog_provider::Provider;

use crate::config::{parse_declarative_config, render_plan};
use crate::github::PullRequest;
use crate::state::AppState;
use crate::task::{ApplyStatus, PullRequestModel, TaskKind};

#[derive(Clone)]
pub struct Input {
    pub org_id: String,
    pub repo_name: String,
    pub pull_request: PullRequest,
}

struct ValidationResult {
    plan_output: String,
    validation_success: bool,
    requires_secrets: bool,
}

pub async fn run(state: AppState, input: Input) -> anyhow::Result<Vec<String>> {
    let mut log = Vec::new();
    let provider = state.provider_for(&input.org_id)?;
    let sha = input.pull_request.head.sha.clone();

    create_status(&provider, &state, &input, &sha, "pending", "validating configuration change using otterdog").await?;
    log.push("posted pending status".into());

    state
        .engine
        .schedule(
            TaskKind::CheckConfigurationInSync,
            &input.org_id,
            Some(&input.repo_name),
            Some(input.pull_request.number),
            {
                let state = state.clone();
                let input = input.clone();
                move || crate::tasks::check_sync::run(state, input)
            },
        )
        .await;

    let result = match compute_validation(&provider, &state, &input).await {
        Ok(result) => result,
        Err(e) => {
            create_status(&provider, &state, &input, &sha, "failure", "otterdog validation failed, please contact an admin").await?;
            return Err(e);
        }
    };

    let (status, description) = if result.validation_success {
        ("success", "otterdog validation completed successfully")
    } else {
        ("error", "otterdog validation failed, check validation result in comment history")
    };
    create_status(&provider, &state, &input, &sha, status, description).await?;
    log.push(format!("final status: {status}"));

    let mut warnings = Vec::new();
    if result.requires_secrets {
        warnings.push("some of the requested changes require secrets, need to apply these changes manually".to_string());
    }
    let comment = render_comment(&state, &input, &result, &warnings);
    post_comment(&provider, &input, &comment).await?;
    log.push("posted validation comment".into());

    let pr_status = input
        .pull_request
        .status()
        .map_err(|e| anyhow::anyhow!(e))?;
    let model = PullRequestModel {
        org: input.org_id.clone(),
        repo: input.repo_name.clone(),
        pull: input.pull_request.number,
        status: format!("{pr_status:?}"),
        valid: result.validation_success,
        in_sync: true,
        requires_manual_apply: result.requires_secrets,
        apply_status: ApplyStatus::NotApplicable,
    };
    state
        .pull_requests
        .upsert(PullRequestModel::key(&input.org_id, &input.repo_name, input.pull_request.number), model);

    Ok(log)
}

async fn create_status(
    provider: &Arc<dyn Provider + Send + Sync>,
    state: &AppState,
    input: &Input,
    sha: &str,
    gh_state: &str,
    description: &str,
) -> anyhow::Result<()> {
    let provider = Arc::clone(provider);
    let org = input.org_id.clone();
    let repo = input.repo_name.clone();
    let sha = sha.to_string();
    let context = state.validation_context.to_string();
    let description = description.to_string();
    let gh_state = gh_state.to_string();
    tokio::task::spawn_blocking(move || {
        provider.post_commit_status(
            &org,
            &repo,
            &sha,
            &serde_json::json!({ "state": gh_state, "context": context, "description": description }),
        )
    })
    .await??;
    Ok(())
}

async fn compute_validation(
    provider: &Arc<dyn Provider + Send + Sync>,
    state: &AppState,
    input: &Input,
) -> anyhow::Result<ValidationResult> {
    let provider = Arc::clone(provider);
    let org_id = input.org_id.clone();
    let config_repo = state.config_repo.to_string();
    let org_config_file = state.org_config_file.to_string();
    let base_ref = input.pull_request.base.r#ref.clone();
    let head_owner = input.pull_request.head.repo.owner.login.clone();
    let head_repo = input.pull_request.head.repo.name.clone();
    let head_ref = input.pull_request.head.r#ref.clone();

    tokio::task::spawn_blocking(move || -> anyhow::Result<ValidationResult> {
        let base_text = provider.get_content_at_ref(&org_id, &config_repo, &org_config_file, &base_ref)?;
        let head_text = provider.get_content_at_ref(&head_owner, &head_repo, &org_config_file, &head_ref)?;

        if base_text == head_text {
            return Ok(ValidationResult {
                plan_output: "No changes.".to_string(),
                validation_success: true,
                requires_secrets: false,
            });
        }

        let base_value = parse_declarative_config(base_text.as_deref().unwrap_or("{}"))?;
        let head_value = parse_declarative_config(head_text.as_deref().unwrap_or("{}"))?;

        let loader = Loader::new();
        let current = loader.load_from_declared(&org_id, &base_value);
        let expected = loader.load_from_declared(&org_id, &head_value);

        let outcome = Planner::new().plan(&org_id, &expected, &current);
        let requires_secrets = outcome.patches.iter().any(|p| p.requires_secrets());
        Ok(ValidationResult {
            plan_output: render_plan(&outcome.patches),
            validation_success: !outcome.validation.has_errors(),
            requires_secrets,
        })
    })
    .await?
}

fn render_comment(state: &AppState, input: &Input, result: &ValidationResult, warnings: &[String]) -> String {
    let mut comment = format!(
        "Validation result for commit `{}`:\n\n```\n{}\n```\n",
        input.pull_request.head.sha, result.plan_output
    );
    for warning in warnings {
        comment.push_str(&format!("\n:warning: {warning}\n"));
    }
    comment.push_str(&format!("\ncc {}/{}\n", input.org_id, state.admin_team));
    comment
}

async fn post_comment(provider: &Arc<dyn Provider + Send + Sync>, input: &Input, comment: &str) -> anyhow::Result<()> {
    let provider = Arc::clone(provider);
    let org = input.org_id.clone();
    let repo = input.repo_name.clone();
    let number = input.pull_request.number;
    let comment = comment.to_string();
    tokio::task::spawn_blocking(move || provider.create_issue_comment(&org, &repo, number, &comment)).await??;
    Ok(())
}
