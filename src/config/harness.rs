use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::fs_op::backup::RetryPolicy;

/// Settings for a fixture run. Every field has a default, so an empty TOML
/// document is a valid configuration.
///
/// ```toml
/// data_dir_prefix = "tankTemporaryTestData"
/// project_tank_name = "project_code"
///
/// [retry]
/// max_attempts = 5
/// backoff = "linear"
/// step_ms = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory that receives per-run data directories. Defaults to the OS
    /// temp dir.
    pub temp_root: Option<PathBuf>,
    pub data_dir_prefix: String,
    /// Source fixture data (`default_core`, `env`, `hooks`, ...).
    pub test_data_path: PathBuf,
    pub project_tank_name: String,
    pub mock_server_url: String,
    pub mock_script_name: String,
    pub mock_api_key: String,
    pub retry: RetryPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            temp_root: None,
            data_dir_prefix: "tankTemporaryTestData".to_string(),
            test_data_path: Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data"),
            project_tank_name: "project_code".to_string(),
            mock_server_url: "http://unit_test_mock_sg".to_string(),
            mock_script_name: "mock_user".to_string(),
            mock_api_key: "mock_key".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl HarnessConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(temp_root.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_op::backup::Backoff;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = HarnessConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, HarnessConfig::default());
        assert_eq!(cfg.retry.max_attempts, 5);
        assert!(cfg.test_data_path.ends_with("tests/data"));
    }

    #[test]
    fn partial_document_overrides_fields() {
        let cfg = HarnessConfig::from_toml_str(
            r#"
            temp_root = "/scratch"
            project_tank_name = "studio/project"

            [retry]
            backoff = "exponential"
            step_ms = 50
            "#,
        )
        .unwrap();
        assert_eq!(cfg.temp_root(), PathBuf::from("/scratch"));
        assert_eq!(cfg.project_tank_name, "studio/project");
        assert_eq!(cfg.retry.backoff, Backoff::Exponential);
        assert_eq!(cfg.retry.step_ms, 50);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.data_dir_prefix, "tankTemporaryTestData");
    }

    #[test]
    fn unknown_backoff_is_rejected() {
        let err = HarnessConfig::from_toml_str("[retry]\nbackoff = \"random\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
