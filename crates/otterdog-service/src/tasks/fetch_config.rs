//! Fetches the live organization state and stores it as a snapshot,
//! scheduled when an installation transitions to `INSTALLED`.

use otterdog_model::Loader;
use otterdog_store::Snapshot;

use crate::config::render_organization;
use crate::state::AppState;

pub struct Input {
    pub org_id: String,
}

pub async fn run(state: AppState, input: Input) -> anyhow::Result<Vec<String>> {
    let provider = state.provider_for(&input.org_id)?;
    let org_id = input.org_id.clone();
    let snapshots = state.snapshots.clone();
    let worker_pool_size = state.settings.loader.worker_pool_size;

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let loader = Loader::new().with_worker_pool_size(worker_pool_size);
        let (organization, errors) = loader.load_from_live(&org_id, provider.as_ref(), false);
        for error in &errors {
            tracing::warn!(%error, "fetch_config: partial load error");
        }
        snapshots.save(&Snapshot::new(org_id, render_organization(&organization)))?;
        Ok(())
    })
    .await??;

    Ok(vec!["fetched live configuration into snapshot".to_string()])
}
