//! Task bodies. Each runs under `TaskEngine::schedule` with the core
//! reconciliation engine (synchronous) invoked through `spawn_blocking`,
//! matching the async-handler/synchronous-core split named for this
//! service.

pub mod apply_changes;
pub mod check_sync;
pub mod fetch_all_pull_requests;
pub mod fetch_config;
pub mod installation;
pub mod validate_pull_request;
