//! The webhook HTTP surface: one POST endpoint, signature-checked before any
//! task is scheduled, dispatching on `X-GitHub-Event`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;

use crate::github::{InstallationEvent, IssueCommentEvent, PullRequestEvent, PushEvent};
use crate::signature::verify;
use crate::state::AppState;
use crate::task::TaskKind;
use crate::tasks::{apply_changes, fetch_config, installation, validate_pull_request};

pub fn router(state: AppState) -> Router {
    Router::new().route("/webhook", post(handle_webhook)).with_state(state)
}

async fn handle_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> (StatusCode, &'static str) {
    let signature_header = headers.get("X-Hub-Signature-256").and_then(|v| v.to_str().ok());
    if let Err(e) = verify(&state.webhook_secret, signature_header, &body) {
        tracing::warn!(error = %e, "rejecting webhook delivery: signature verification failed");
        return (StatusCode::UNAUTHORIZED, "invalid signature");
    }

    let Some(event) = headers.get("X-GitHub-Event").and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "missing X-GitHub-Event header");
    };

    let result = match event {
        "pull_request" => dispatch_pull_request(&state, &body).await,
        "installation" => dispatch_installation(&state, &body).await,
        "issue_comment" => dispatch_issue_comment(&state, &body).await,
        "push" => dispatch_push(&state, &body).await,
        other => {
            tracing::debug!(event = other, "ignoring unhandled event type");
            Ok(())
        }
    };

    match result {
        Ok(()) => (StatusCode::OK, "accepted"),
        Err(e) => {
            tracing::warn!(error = %e, event, "failed to handle webhook payload");
            (StatusCode::BAD_REQUEST, "malformed payload")
        }
    }
}

async fn dispatch_pull_request(state: &AppState, body: &[u8]) -> anyhow::Result<()> {
    let event: PullRequestEvent = serde_json::from_slice(body)?;
    if event.repository.name != *state.config_repo {
        return Ok(());
    }
    let org_id = event.repository.owner.login.clone();
    let repo_name = event.repository.name.clone();
    let number = event.pull_request.number;

    match event.action.as_str() {
        "opened" | "synchronize" | "reopened" => {
            state
                .engine
                .schedule(TaskKind::ValidatePullRequest, &org_id, Some(&repo_name), Some(number), {
                    let state = state.clone();
                    let input = validate_pull_request::Input {
                        org_id,
                        repo_name,
                        pull_request: event.pull_request.clone(),
                    };
                    move || validate_pull_request::run(state, input)
                })
                .await;
        }
        "closed" if event.pull_request.merged == Some(true) => {
            let key = crate::task::PullRequestModel::key(&org_id, &repo_name, number);
            let already_completed = state
                .pull_requests
                .get(&key)
                .is_some_and(|m| m.apply_status == crate::task::ApplyStatus::Completed);
            if !already_completed {
                state
                    .engine
                    .schedule(TaskKind::ApplyChanges, &org_id, Some(&repo_name), Some(number), {
                        let state = state.clone();
                        let input = apply_changes::Input {
                            org_id,
                            repo_name,
                            pull: number,
                        };
                        move || apply_changes::run(state, input)
                    })
                    .await;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Installation lifecycle handling runs directly on the request path (it
/// only updates `InstallationModel` and schedules downstream Tasks) rather
/// than going through `TaskEngine::schedule` itself — it is not one of the
/// persisted task kinds.
async fn dispatch_installation(state: &AppState, body: &[u8]) -> anyhow::Result<()> {
    let event: InstallationEvent = serde_json::from_slice(body)?;
    let input = installation::Input {
        installation_id: event.installation.id,
        org: event.installation.account.login,
        config_repo: state.config_repo.to_string(),
        action: event.action,
    };
    installation::run(state.clone(), input).await?;
    Ok(())
}

async fn dispatch_issue_comment(_state: &AppState, body: &[u8]) -> anyhow::Result<()> {
    let _event: IssueCommentEvent = serde_json::from_slice(body)?;
    Ok(())
}

async fn dispatch_push(state: &AppState, body: &[u8]) -> anyhow::Result<()> {
    let event: PushEvent = serde_json::from_slice(body)?;
    if event.repository.name != *state.config_repo {
        return Ok(());
    }
    let default_ref = format!("refs/heads/{}", event.repository.default_branch);
    if event.r#ref != default_ref {
        return Ok(());
    }
    let org_id = event.repository.owner.login.clone();
    state
        .engine
        .schedule(TaskKind::FetchConfig, &org_id, None, None, {
            let state = state.clone();
            let input = fetch_config::Input { org_id };
            move || fetch_config::run(state, input)
        })
        .await;
    Ok(())
}
