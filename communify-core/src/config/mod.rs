//! Configuration management for Communify
//!
//! Defaults, environment overrides, TOML files and validation.

use crate::core_community::{DEFAULT_MAX_ATTEMPTS, DEFAULT_PREVIEW_LIMIT};
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory backend configuration
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Join protocol configuration
    #[serde(default)]
    pub join: JoinConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dashboard configuration
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Which Directory implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    /// Process-local, lost on exit
    Memory,
    /// SQLite database file
    #[default]
    Sqlite,
}

impl FromStr for DirectoryBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(DirectoryBackend::Memory),
            "sqlite" => Ok(DirectoryBackend::Sqlite),
            other => Err(ConfigError::InvalidValue(format!(
                "Unknown directory backend: {}",
                other
            ))),
        }
    }
}

/// Directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Backend to open
    pub backend: DirectoryBackend,

    /// SQLite database path
    pub database_path: PathBuf,

    /// Maximum pooled SQLite connections
    pub pool_size: u32,

    /// How long a connection waits on a locked database
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

/// Join protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Read-modify-write attempts before giving up on conflicts
    pub max_attempts: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Number of open Communities in the preview
    pub open_preview_limit: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::Sqlite,
            database_path: PathBuf::from("./data/communify.db"),
            pool_size: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            open_preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

fn parse_var<T: FromStr>(value: &str, what: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", what, e)))
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: COMMUNIFY_<SECTION>_<KEY>
    /// Example: COMMUNIFY_DIRECTORY_DATABASE_PATH=/var/lib/communify.db
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Apply overrides from `lookup` on top of the defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Overwrite fields that have a COMMUNIFY_* variable set
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Directory config
        if let Some(backend) = lookup("COMMUNIFY_DIRECTORY_BACKEND") {
            self.directory.backend = backend.parse()?;
        }
        if let Some(path) = lookup("COMMUNIFY_DIRECTORY_DATABASE_PATH") {
            self.directory.database_path = PathBuf::from(path);
        }
        if let Some(size) = lookup("COMMUNIFY_DIRECTORY_POOL_SIZE") {
            self.directory.pool_size = parse_var(&size, "pool size")?;
        }
        if let Some(timeout) = lookup("COMMUNIFY_DIRECTORY_BUSY_TIMEOUT") {
            self.directory.busy_timeout = humantime_serde::re::humantime::parse_duration(&timeout)
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid busy timeout: {}", e)))?;
        }

        // Join config
        if let Some(attempts) = lookup("COMMUNIFY_JOIN_MAX_ATTEMPTS") {
            self.join.max_attempts = parse_var(&attempts, "max attempts")?;
        }

        // Logging config
        if let Some(level) = lookup("COMMUNIFY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("COMMUNIFY_LOG_JSON") {
            self.logging.json_format = parse_var(&json, "JSON flag")?;
        }

        // Dashboard config
        if let Some(limit) = lookup("COMMUNIFY_DASHBOARD_OPEN_PREVIEW_LIMIT") {
            self.dashboard.open_preview_limit = parse_var(&limit, "preview limit")?;
        }

        Ok(())
    }

    /// Load and validate configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file without validating it, for callers that
    /// layer further overrides on top and validate the result
    pub fn parse_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        if self.directory.backend == DirectoryBackend::Sqlite
            && self.directory.database_path.as_os_str().is_empty()
        {
            return Err(ConfigError::ValidationFailed(
                "database_path is required for the sqlite backend".to_string(),
            ));
        }

        if self.join.max_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if LogLevel::from_str(&self.logging.level).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.join.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.dashboard.open_preview_limit, 4);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.directory.pool_size = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.join.max_attempts = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.directory.database_path = PathBuf::new();
        assert!(config.validate().is_err());

        config.directory.backend = DirectoryBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_log_level_any_case() {
        let config = Config::from_lookup(lookup_from(&[("COMMUNIFY_LOG_LEVEL", "DEBUG")])).unwrap();
        assert_eq!(LogLevel::from_str(&config.logging.level), Some(LogLevel::Debug));
    }

    #[test]
    fn test_invalid_file_value_fixed_by_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layered.toml");
        std::fs::write(&path, "[directory]\nbackend = \"sqlite\"\ndatabase_path = \"c.db\"\npool_size = 0\nbusy_timeout = \"5s\"\n").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::ValidationFailed(_))
        ));

        let mut config = Config::parse_file(&path).unwrap();
        config
            .apply_overrides(lookup_from(&[("COMMUNIFY_DIRECTORY_POOL_SIZE", "4")]))
            .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.directory.pool_size, 4);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("COMMUNIFY_DIRECTORY_BACKEND", "memory"),
            ("COMMUNIFY_DIRECTORY_BUSY_TIMEOUT", "250ms"),
            ("COMMUNIFY_JOIN_MAX_ATTEMPTS", "7"),
            ("COMMUNIFY_LOG_JSON", "true"),
            ("COMMUNIFY_DASHBOARD_OPEN_PREVIEW_LIMIT", "10"),
        ]))
        .unwrap();

        assert_eq!(config.directory.backend, DirectoryBackend::Memory);
        assert_eq!(config.directory.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.join.max_attempts, 7);
        assert!(config.logging.json_format);
        assert_eq!(config.dashboard.open_preview_limit, 10);
    }

    #[test]
    fn test_env_invalid_values() {
        let bad_number = Config::from_lookup(lookup_from(&[("COMMUNIFY_JOIN_MAX_ATTEMPTS", "lots")]));
        assert!(matches!(bad_number, Err(ConfigError::InvalidValue(_))));

        let bad_backend = Config::from_lookup(lookup_from(&[("COMMUNIFY_DIRECTORY_BACKEND", "redis")]));
        assert!(matches!(bad_backend, Err(ConfigError::InvalidValue(_))));

        let zero_attempts = Config::from_lookup(lookup_from(&[("COMMUNIFY_JOIN_MAX_ATTEMPTS", "0")]));
        assert!(matches!(zero_attempts, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("communify.toml");

        let mut config = Config::default();
        config.directory.busy_timeout = Duration::from_secs(2);
        config.join.max_attempts = 5;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.directory.busy_timeout, Duration::from_secs(2));
        assert_eq!(loaded.join.max_attempts, 5);
        assert_eq!(loaded.directory.backend, DirectoryBackend::Sqlite);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[join]\nmax_attempts = 9\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.join.max_attempts, 9);
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/communify.toml");
        assert!(matches!(result, Err(ConfigError::FileReadError(_))));
    }
}
