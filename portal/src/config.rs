use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::PortalError;

/// Default busy timeout (ms) applied to every connection.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration stored in `.portal/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub portal: PortalSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite file. `${VAR}` is expanded from the environment.
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    "${PORTAL_DB}".to_string()
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSettings {
    /// Directory reports are written to when no explicit path is given.
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
        }
    }
}

fn default_report_dir() -> String {
    "reports".to_string()
}

impl PortalConfig {
    pub fn load(path: &Path) -> Result<Self, PortalError> {
        let content = std::fs::read_to_string(path).map_err(|err| PortalError::Config {
            message: format!("failed to read {}: {err}", path.display()),
        })?;
        let config: PortalConfig = toml::from_str(&content).map_err(|err| PortalError::Config {
            message: format!("failed to parse {}: {err}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, PortalError> {
        toml::to_string_pretty(self).map_err(|err| PortalError::Config {
            message: format!("failed to serialize config: {err}"),
        })
    }

    pub fn validate(&self) -> Result<(), PortalError> {
        if self.database.busy_timeout_ms == 0 {
            return Err(PortalError::Config {
                message: "database.busy_timeout_ms must be greater than zero".to_string(),
            });
        }
        if self.database.path.trim().is_empty() {
            return Err(PortalError::Config {
                message: "database.path must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Database path with environment variables expanded.
    pub fn database_path(&self) -> Result<PathBuf, PortalError> {
        expand_env(&self.database.path).map(PathBuf::from)
    }
}

/// Expands a whole-value `${VAR}` reference; any other value is returned as is.
pub fn expand_env(value: &str) -> Result<String, PortalError> {
    if let Some(var_name) = value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        std::env::var(var_name).map_err(|_| PortalError::Config {
            message: format!("environment variable {var_name} not set"),
        })
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PortalConfig::default();
        assert_eq!(config.database.path, "${PORTAL_DB}");
        assert_eq!(config.database.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.portal.report_dir, "reports");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: PortalConfig = toml::from_str("[database]\npath = \"portal.db\"\n").unwrap();
        assert_eq!(config.database.path, "portal.db");
        assert_eq!(config.database.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.database_path().unwrap(), PathBuf::from("portal.db"));
    }

    #[test]
    fn zero_busy_timeout_is_rejected() {
        let mut config = PortalConfig::default();
        config.database.busy_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(PortalError::Config { .. })));
    }

    #[test]
    fn unset_variable_is_a_config_error() {
        let err = expand_env("${PORTAL_TEST_SURELY_UNSET_VARIABLE}").unwrap_err();
        assert!(err.to_string().contains("PORTAL_TEST_SURELY_UNSET_VARIABLE"));
        assert_eq!(expand_env("plain.db").unwrap(), "plain.db");
    }

    #[test]
    fn config_serialization() {
        let toml_str = PortalConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("busy_timeout_ms"));
        assert!(toml_str.contains("report_dir"));
    }
}
