use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_INSPECTOR_CONFIG: &str = include_str!("data/inspector_config.json");

pub const INSPECTOR_CONFIG_ENV: &str = "SAVE_INSPECTOR_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    archive: ArchiveConfig,
    history: HistoryConfig,
    refresh: RefreshConfig,
}

impl InspectorConfig {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_INSPECTOR_CONFIG)
            .expect("builtin inspector config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, InspectorConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| InspectorConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let config = InspectorConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn archive(&self) -> &ArchiveConfig {
        &self.archive
    }

    pub fn history(&self) -> &HistoryConfig {
        &self.history
    }

    pub fn refresh(&self) -> &RefreshConfig {
        &self.refresh
    }
}

#[derive(Debug, Error)]
pub enum InspectorConfigError {
    #[error("failed to parse inspector config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read inspector config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where saves live inside a directory and how the world document is written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    extension: String,
    world_document: String,
    json_indent: usize,
}

impl ArchiveConfig {
    pub fn extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }

    pub fn world_document(&self) -> &str {
        &self.world_document
    }

    pub fn json_indent(&self) -> usize {
        self.json_indent
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            extension: "timber".to_string(),
            world_document: "world.json".to_string(),
            json_indent: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    database_file: String,
    legacy_file: String,
}

impl HistoryConfig {
    pub fn database_path(&self, directory: &Path) -> PathBuf {
        directory.join(&self.database_file)
    }

    pub fn legacy_path(&self, directory: &Path) -> PathBuf {
        directory.join(&self.legacy_file)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database_file: "historical_data.db".to_string(),
            legacy_file: "historical_data.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    interval_secs: u64,
    debounce_ms: u64,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_secs = interval.as_secs();
        self
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            debounce_ms: 500,
        }
    }
}

/// Load the inspector configuration, honouring `SAVE_INSPECTOR_CONFIG_PATH`.
///
/// Returns the path the configuration came from, or `None` for the builtin.
pub fn load_inspector_config_from_env() -> (InspectorConfig, Option<PathBuf>) {
    let Some(path) = env::var_os(INSPECTOR_CONFIG_ENV).map(PathBuf::from) else {
        tracing::debug!(
            target: "save_inspector::config",
            "inspector_config.loaded=builtin"
        );
        return (InspectorConfig::builtin(), None);
    };

    match InspectorConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "save_inspector::config",
                path = %path.display(),
                "inspector_config.loaded=file"
            );
            (config, Some(path))
        }
        Err(err) => {
            tracing::warn!(
                target: "save_inspector::config",
                path = %path.display(),
                error = %err,
                "inspector_config.load_failed"
            );
            (InspectorConfig::builtin(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_parses() {
        let config = InspectorConfig::builtin();
        assert_eq!(config.archive().extension(), "timber");
        assert_eq!(config.archive().world_document(), "world.json");
        assert_eq!(config.archive().json_indent(), 4);
        assert_eq!(config.refresh().interval(), Duration::from_secs(10));
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config = InspectorConfig::from_json_str(r#"{ "archive": { "extension": ".sav" } }"#)
            .expect("partial config should parse");
        assert_eq!(config.archive().extension(), "sav");
        assert_eq!(config.archive().world_document(), "world.json");
        assert_eq!(
            config.history().legacy_path(Path::new("saves")),
            Path::new("saves").join("historical_data.json")
        );
    }

    #[test]
    fn missing_file_reports_path() {
        let err = InspectorConfig::from_file(Path::new("/nonexistent/inspector.json"))
            .expect_err("missing file should fail");
        assert!(matches!(err, InspectorConfigError::ReadFailed { .. }));
        assert!(err.to_string().contains("inspector.json"));
    }
}
