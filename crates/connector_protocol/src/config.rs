use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadLimits {
    pub max_line_bytes: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Seconds between intermediate emissions of the live record counter.
    pub log_interval_secs: u64,
}

impl MetricsConfig {
    pub fn log_interval(&self) -> Duration {
        Duration::from_secs(self.log_interval_secs)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            log_interval_secs: 60,
        }
    }
}

/// Settings for [`crate::MessageReader`].
///
/// ```toml
/// [limits]
/// max_line_bytes = 1048576
///
/// [metrics]
/// log_interval_secs = 30
/// ```
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    pub limits: ReadLimits,
    pub metrics: MetricsConfig,
}

impl ReaderConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|source| ConfigError::TomlDecode { source })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ReaderConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.metrics.log_interval(), Duration::from_secs(60));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = ReaderConfig::from_toml_str("[limits]\nmax_line_bytes = 128\n").unwrap();
        assert_eq!(config.limits.max_line_bytes, 128);
        assert_eq!(config.metrics, MetricsConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ReaderConfig::from_toml_str("[limits]\nmax_bytes = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlDecode { .. }));
    }

    #[test]
    fn load_reports_missing_files_with_their_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        match ReaderConfig::load(&path) {
            Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
