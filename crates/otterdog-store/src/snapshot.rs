//! Versioned on-disk snapshots of a live-loaded `Organization`, one file per
//! org, so `local-plan` and `fetch`/`import` can stand a previously fetched
//! live state in for a fresh provider round-trip.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CURRENT_SNAPSHOT_VERSION: &str = "otterdog.snapshot.v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub github_id: String,
    pub fetched_at: DateTime<Utc>,
    /// The `Organization` tree, JSON-erased here so this crate doesn't
    /// depend on `otterdog-model`; the Loader re-hydrates it on read.
    pub organization: Value,
}

impl Snapshot {
    pub fn new(github_id: impl Into<String>, organization: Value) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION.to_string(),
            github_id: github_id.into(),
            fetched_at: Utc::now(),
            organization,
        }
    }

    /// Forward-migration hook: today there is only `v1`, but the field stays
    /// a plain string rather than an enum so a future `v2` reader can
    /// recognize and upgrade an old file without a breaking schema change.
    fn migrate(mut self) -> Result<Self> {
        match self.version.as_str() {
            CURRENT_SNAPSHOT_VERSION => Ok(self),
            other => bail!("unsupported snapshot version: {other}"),
        }
    }
}

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, github_id: &str) -> PathBuf {
        self.dir.join(format!("{github_id}.snapshot.json"))
    }

    /// Atomic write: serialize to a sibling `.tmp` file, then rename over
    /// the final path so a reader never observes a half-written snapshot.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create snapshot dir: {}", self.dir.display()))?;
        let path = self.path_for(&snapshot.github_id);
        let tmp_path = path.with_extension("tmp");
        let content = serde_json::to_string_pretty(snapshot).context("failed to serialize snapshot")?;
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("failed to write snapshot: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to install snapshot: {}", path.display()))?;
        Ok(())
    }

    pub fn load(&self, github_id: &str) -> Result<Option<Snapshot>> {
        let path = self.path_for(github_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).with_context(|| format!("failed to parse snapshot: {}", path.display()))?;
        Ok(Some(snapshot.migrate()?))
    }

    pub fn exists(&self, github_id: &str) -> bool {
        self.path_for(github_id).exists()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let snapshot = Snapshot::new("acme", serde_json::json!({"settings": {"name": "acme"}}));
        store.save(&snapshot).unwrap();
        let loaded = store.load("acme").unwrap().expect("snapshot present");
        assert_eq!(loaded.github_id, "acme");
        assert_eq!(loaded.version, CURRENT_SNAPSHOT_VERSION);
    }

    #[test]
    fn missing_snapshot_is_none_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load("does-not-exist").unwrap().is_none());
    }

    #[test]
    fn unsupported_version_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let mut snapshot = Snapshot::new("acme", serde_json::json!({}));
        snapshot.version = "otterdog.snapshot.v99".to_string();
        store.save(&snapshot).unwrap();
        assert!(store.load("acme").is_err());
    }
}
