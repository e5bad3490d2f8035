//! Planner configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration file.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

/// Environment variable naming the configuration file for the C ABI
pub const CONFIG_ENV_VAR: &str = "AETHRA_PLANNER_CONFIG";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Maximum number of live isolates per registry
    #[serde(default = "default_max_isolates")]
    pub max_isolates: usize,

    /// Match table and column identifiers case-sensitively
    #[serde(default)]
    pub case_sensitive: bool,

    /// Keep each database catalog cached inside the isolate that loaded it
    #[serde(default)]
    pub cache_catalogs: bool,

    /// Upper bound on rewrite passes per rule
    #[serde(default = "default_max_rule_iterations")]
    pub max_rule_iterations: usize,

    /// Minimum log severity: trace, info, warn, error or fatal
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_isolates() -> usize {
    16
}
fn default_max_rule_iterations() -> usize {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_isolates: default_max_isolates(),
            case_sensitive: false,
            cache_catalogs: false,
            max_rule_iterations: default_max_rule_iterations(),
            log_level: default_log_level(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: PlannerConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `AETHRA_PLANNER_CONFIG`, or defaults if unset
    pub fn from_env() -> ConfigResult<Self> {
        match env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Validate field ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_isolates == 0 {
            return Err(ConfigError::Invalid("max_isolates must be > 0".into()));
        }

        if self.max_rule_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_rule_iterations must be > 0".into(),
            ));
        }

        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error or fatal.",
                self.log_level
            )));
        }

        Ok(())
    }

    /// The configured minimum log severity
    pub fn log_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = PlannerConfig::from_json("{}").unwrap();
        assert_eq!(config.max_isolates, 16);
        assert!(!config.case_sensitive);
        assert!(!config.cache_catalogs);
        assert_eq!(config.max_rule_iterations, 1000);
        assert_eq!(config.log_severity(), Severity::Info);
        assert_eq!(config, PlannerConfig::default());
    }

    #[test]
    fn test_config_rejects_zero_isolates() {
        let result = PlannerConfig::from_json(r#"{"max_isolates": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_rejects_unknown_log_level() {
        let result = PlannerConfig::from_json(r#"{"log_level": "chatty"}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_rejects_malformed_json() {
        let result = PlannerConfig::from_json("{max_isolates:");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("planner.json");
        fs::write(
            &path,
            r#"{"max_isolates": 2, "cache_catalogs": true, "log_level": "warn"}"#,
        )
        .unwrap();

        let config = PlannerConfig::load(&path).unwrap();
        assert_eq!(config.max_isolates, 2);
        assert!(config.cache_catalogs);
        assert_eq!(config.log_severity(), Severity::Warn);
    }

    #[test]
    fn test_config_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = PlannerConfig::load(&temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
