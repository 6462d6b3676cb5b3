//! Engine configuration.
//!
//! Values come from defaults, an optional JSON file and `TESTFLOW_*`
//! environment variables, in that order of precedence (last wins).

use crate::errors::ConfigError;
use crate::observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`EngineConfig::kill_grace_ms`].
pub const ENV_KILL_GRACE_MS: &str = "TESTFLOW_KILL_GRACE_MS";
/// Environment variable overriding [`EngineConfig::output_tail_lines`].
pub const ENV_OUTPUT_TAIL_LINES: &str = "TESTFLOW_OUTPUT_TAIL_LINES";
/// Environment variable overriding [`EngineConfig::tmp_dir`].
pub const ENV_TMP_DIR: &str = "TESTFLOW_TMP_DIR";
/// Environment variable overriding [`EngineConfig::log_format`].
pub const ENV_LOG_FORMAT: &str = "TESTFLOW_LOG_FORMAT";

/// Settings shared by every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Milliseconds between the termination signal and the hard kill.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    /// Output lines kept per process for failure reports.
    #[serde(default = "default_output_tail_lines")]
    pub output_tail_lines: usize,
    /// Scratch directory handed to plugins. A fresh directory under the
    /// system temp dir is used when unset.
    #[serde(default)]
    pub tmp_dir: Option<PathBuf>,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_kill_grace_ms() -> u64 {
    5000
}

fn default_output_tail_lines() -> usize {
    20
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kill_grace_ms: default_kill_grace_ms(),
            output_tail_lines: default_output_tail_lines(),
            tmp_dir: None,
            log_format: LogFormat::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, unknown fields or
    /// values of the wrong type.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Applies `TESTFLOW_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] naming the first variable whose
    /// value cannot be parsed.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides using `lookup` in place of the process environment.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_KILL_GRACE_MS) {
            self.kill_grace_ms = parse_env(ENV_KILL_GRACE_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_OUTPUT_TAIL_LINES) {
            self.output_tail_lines = parse_env(ENV_OUTPUT_TAIL_LINES, &value)?;
        }
        if let Some(value) = lookup(ENV_TMP_DIR) {
            if value.trim().is_empty() {
                return Err(invalid(ENV_TMP_DIR, &value));
            }
            self.tmp_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_LOG_FORMAT) {
            self.log_format = value.parse().map_err(|_| invalid(ENV_LOG_FORMAT, &value))?;
        }
        Ok(self)
    }

    /// Sets the kill grace period.
    #[must_use]
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the scratch directory.
    #[must_use]
    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    /// Sets the output tail length.
    #[must_use]
    pub fn with_output_tail_lines(mut self, lines: usize) -> Self {
        self.output_tail_lines = lines;
        self
    }

    /// Kill grace period as a `Duration`.
    #[must_use]
    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.kill_grace_ms, 5000);
        assert_eq!(config.output_tail_lines, 20);
        assert_eq!(config.tmp_dir, None);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.kill_grace(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{"kill_grace_ms": 250, "log_format": "json"}"#).unwrap();
        assert_eq!(config.kill_grace_ms, 250);
        assert_eq!(config.output_tail_lines, 20);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_json_str(r#"{"kill_grace": 1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"output_tail_lines": 3, "tmp_dir": "/var/tmp/tf"}}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.output_tail_lines, 3);
        assert_eq!(config.tmp_dir, Some(PathBuf::from("/var/tmp/tf")));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file("/no/such/testflow.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::default()
            .with_overrides_from(env(&[
                (ENV_KILL_GRACE_MS, "100"),
                (ENV_OUTPUT_TAIL_LINES, "7"),
                (ENV_TMP_DIR, "/tmp/x"),
                (ENV_LOG_FORMAT, "JSON"),
            ]))
            .unwrap();

        assert_eq!(config.kill_grace_ms, 100);
        assert_eq!(config.output_tail_lines, 7);
        assert_eq!(config.tmp_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_env_value() {
        let err = EngineConfig::default()
            .with_overrides_from(env(&[(ENV_KILL_GRACE_MS, "soon")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidEnv { key, value } => {
                assert_eq!(key, ENV_KILL_GRACE_MS);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_kill_grace(Duration::from_millis(1500))
            .with_output_tail_lines(0)
            .with_tmp_dir("/scratch");
        assert_eq!(config.kill_grace_ms, 1500);
        assert_eq!(config.output_tail_lines, 0);
        assert_eq!(config.tmp_dir.as_deref(), Some(Path::new("/scratch")));
    }
}
