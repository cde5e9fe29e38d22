//! Schedules and runs Tasks. Per-`(org, repo)` work is serialized by a
//! mutex held for the duration of the task; disjoint keys run in parallel.
//! Scheduling an identical `(kind, org, repo, pull)` while one is already
//! in flight is a no-op (P7).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use otterdog_store::{Collection, PageRequest};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::task::{TaskKind, TaskModel, TaskStatus};

#[derive(Clone)]
pub struct TaskEngine {
    tasks: Arc<Collection<TaskModel>>,
    locks: Arc<AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl TaskEngine {
    pub fn new(tasks: Arc<Collection<TaskModel>>) -> Self {
        Self {
            tasks,
            locks: Arc::new(AsyncMutex::new(HashMap::new())),
        }
    }

    fn lock_key(org: &str, repo: Option<&str>) -> String {
        match repo {
            Some(repo) => format!("{org}/{repo}"),
            None => org.to_string(),
        }
    }

    async fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(key.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }

    fn already_in_flight(&self, kind: TaskKind, org: &str, repo: Option<&str>, pull: Option<u64>) -> bool {
        let kind_value = serde_json::to_value(kind).unwrap_or_default();
        let mut request = PageRequest::new(0, 1).filter("kind", kind_value).filter("org", org);
        if let Some(repo) = repo {
            request = request.filter("repo", repo);
        }
        if let Some(pull) = pull {
            request = request.filter("pull", pull);
        }
        self.tasks
            .query(&request)
            .items
            .into_iter()
            .any(|task| task.status.is_in_flight())
    }

    /// Idempotently schedules `work` under identity `(kind, org, repo, pull)`.
    /// Persists the `TaskModel` before and after execution; errors from
    /// `work` are caught at the task boundary and recorded as `FAILED`,
    /// never propagated to the caller (the webhook handler already returned).
    pub async fn schedule<F, Fut>(&self, kind: TaskKind, org: &str, repo: Option<&str>, pull: Option<u64>, work: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Vec<String>>> + Send + 'static,
    {
        if self.already_in_flight(kind, org, repo, pull) {
            info!(task = kind.as_str(), org, "skipping schedule: identical task already in flight");
            return;
        }

        let id = format!("{}-{}-{}", kind.as_str(), org, uuid_like());
        let mut model = TaskModel::new(id.clone(), kind, org, Utc::now());
        if let Some(repo) = repo {
            model = model.with_repo(repo);
        }
        if let Some(pull) = pull {
            model = model.with_pull(pull);
        }
        self.tasks.upsert(id.clone(), model.clone());

        let lock_key = Self::lock_key(org, repo);
        let lock = self.lock_for(&lock_key).await;
        let tasks = Arc::clone(&self.tasks);

        tokio::spawn(async move {
            let _guard = lock.lock().await;
            model.status = TaskStatus::Running;
            model.updated_at = Utc::now();
            tasks.upsert(id.clone(), model.clone());

            match work().await {
                Ok(log) => {
                    model.status = TaskStatus::Succeeded;
                    model.log.extend(log);
                }
                Err(e) => {
                    warn!(task = %id, error = %e, "task failed");
                    model.status = TaskStatus::Failed;
                    model.log.push(format!("{e:#}"));
                }
            }
            model.updated_at = Utc::now();
            tasks.upsert(id, model);
        });
    }
}

/// A process-unique-enough suffix without pulling in a UUID crate: the
/// task store already dedups on identity, so collisions here only affect
/// the id's readability, not correctness.
fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{n:x}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn duplicate_in_flight_schedule_is_a_no_op() {
        let tasks = Arc::new(Collection::new());
        let engine = TaskEngine::new(Arc::clone(&tasks));

        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = Arc::clone(&runs);
        engine
            .schedule(TaskKind::ValidatePullRequest, "acme", Some("config"), Some(1), move || async move {
                // Never actually completes during the test, simulating an in-flight task.
                futures_never_resolve().await;
                let _ = runs_clone.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            })
            .await;

        // Give the spawned task a chance to persist its Queued->Running transition.
        tokio::task::yield_now().await;

        engine
            .schedule(TaskKind::ValidatePullRequest, "acme", Some("config"), Some(1), || async { Ok(vec![]) })
            .await;

        let page = tasks.query(&PageRequest::new(0, 10));
        assert_eq!(page.total_count, 1);
    }

    async fn futures_never_resolve() {
        std::future::pending::<()>().await;
    }
}
