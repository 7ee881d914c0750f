//! Configuration parsing for the audit ledger.
//!
//! A small TOML file points at the database and tunes read defaults:
//!
//! ```toml
//! [ledger]
//! database = "/var/lib/finguard/audit.db"
//! default_read_limit = 50
//! busy_timeout_ms = 5000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed.
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized.
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FinguardConfig {
    /// Ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl FinguardConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Default `limit` for history reads when the caller gives none.
    #[serde(default = "default_read_limit")]
    pub default_read_limit: u64,

    /// Busy timeout applied to the database connection.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            default_read_limit: default_read_limit(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("finguard.db")
}

const fn default_read_limit() -> u64 {
    50
}

const fn default_busy_timeout_ms() -> u64 {
    5000
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FinguardConfig::default();
        assert_eq!(config.ledger.database, PathBuf::from("finguard.db"));
        assert_eq!(config.ledger.default_read_limit, 50);
        assert_eq!(config.ledger.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_from_toml() {
        let config = FinguardConfig::from_toml(
            r#"
            [ledger]
            database = "/tmp/audit.db"
            default_read_limit = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.database, PathBuf::from("/tmp/audit.db"));
        assert_eq!(config.ledger.default_read_limit, 10);
        // Unset fields fall back to defaults.
        assert_eq!(config.ledger.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config = FinguardConfig::from_toml("").unwrap();
        assert_eq!(config.ledger.default_read_limit, 50);
    }

    #[test]
    fn test_round_trip() {
        let config = FinguardConfig::default();
        let toml = config.to_toml().unwrap();
        let parsed = FinguardConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed.ledger.database, config.ledger.database);
    }
}
