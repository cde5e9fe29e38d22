//! Process-wide and per-run settings, loaded from TOML with defaults for
//! every field so a minimal config file is always valid.

use std::path::{Path, PathBuf};

use otterdog_retry::RetryStrategyConfig;
use otterdog_types::OtterdogError;
use serde::{Deserialize, Serialize};

fn default_worker_pool_size() -> usize {
    12
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("./orgs")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("./.otterdog-state")
}

/// Controls for the Loader's bounded worker pool (§4.2, §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
        }
    }
}

/// Controls the Provider's transports (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub no_web_ui: bool,
    #[serde(default)]
    pub retry: RetryStrategyConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            no_web_ui: false,
            retry: RetryStrategyConfig::default(),
        }
    }
}

/// Controls the Planner/Applier (§4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub delete_extras: bool,
    #[serde(default)]
    pub keep_going: bool,
}

/// The top-level, on-disk settings file (`otterdog.toml` by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtterdogSettings {
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
}

impl Default for OtterdogSettings {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            state_dir: default_state_dir(),
            loader: LoaderConfig::default(),
            provider: ProviderConfig::default(),
            planner: PlannerConfig::default(),
        }
    }
}

impl OtterdogSettings {
    /// Loads `path` if it exists, else returns defaults — a missing config
    /// file is not an error, matching the teacher's "committed defaults,
    /// optional override file" layering.
    pub fn load(path: &Path) -> Result<Self, OtterdogError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OtterdogError::ConfigLoad(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| OtterdogError::ConfigLoad(format!("parsing {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let settings = OtterdogSettings::load(Path::new("/nonexistent/otterdog.toml")).unwrap();
        assert_eq!(settings.loader.worker_pool_size, 12);
        assert!(!settings.provider.no_web_ui);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("otterdog.toml");
        std::fs::write(&path, "[provider]\nno_web_ui = true\n").unwrap();
        let settings = OtterdogSettings::load(&path).unwrap();
        assert!(settings.provider.no_web_ui);
        assert_eq!(settings.loader.worker_pool_size, 12);
    }
}
