//! Ledger configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Ledger configuration.
///
/// Missing fields fall back to their defaults when loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Balance given to newly registered accounts.
    pub initial_balance: f64,
    /// How many times an append re-reads the tip after losing a race.
    pub max_append_retries: u32,
    /// Market price settings.
    pub oracle: OracleConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1000.0,
            max_append_retries: 16,
            oracle: OracleConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Name of the config file inside a data directory.
    pub const FILE_NAME: &'static str = "config.json";

    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_balance must be a non-negative number, got {}",
                self.initial_balance
            )));
        }
        if self.max_append_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_append_retries must be at least 1".into(),
            ));
        }
        self.oracle.validate()
    }
}

/// Market price settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Price at process start.
    pub initial_price: f64,
    /// Lowest allowed price.
    pub floor: f64,
    /// Highest allowed price.
    pub ceiling: f64,
    /// Price movement per unit of traded or produced volume.
    pub unit_adjustment: f64,
    /// Number of recent price points kept.
    pub history_len: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            initial_price: 5.0,
            floor: 1.0,
            ceiling: 15.0,
            unit_adjustment: 0.001,
            history_len: 10,
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            self.initial_price,
            self.floor,
            self.ceiling,
            self.unit_adjustment,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(ConfigError::Invalid(
                "oracle settings must be finite numbers".into(),
            ));
        }
        if !(self.floor <= self.initial_price && self.initial_price <= self.ceiling) {
            return Err(ConfigError::Invalid(format!(
                "initial_price {} outside [{}, {}]",
                self.initial_price, self.floor, self.ceiling
            )));
        }
        if self.unit_adjustment < 0.0 {
            return Err(ConfigError::Invalid(
                "unit_adjustment must not be negative".into(),
            ));
        }
        if self.history_len == 0 {
            return Err(ConfigError::Invalid(
                "history_len must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.oracle.initial_price, 5.0);
        assert_eq!(config.oracle.history_len, 10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{"initial_balance": 250.0, "oracle": {"ceiling": 20.0}}"#)
                .unwrap();
        assert_eq!(config.initial_balance, 250.0);
        assert_eq!(config.max_append_retries, 16);
        assert_eq!(config.oracle.ceiling, 20.0);
        assert_eq!(config.oracle.floor, 1.0);
    }

    #[test]
    fn test_invalid_settings() {
        let mut config = LedgerConfig::default();
        config.max_append_retries = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = LedgerConfig::default();
        config.oracle.initial_price = 20.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = LedgerConfig::default();
        config.oracle.history_len = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.initial_balance = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LedgerConfig::FILE_NAME);

        let mut config = LedgerConfig::default();
        config.initial_balance = 42.0;
        config.save(&path).unwrap();

        assert_eq!(LedgerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LedgerConfig::FILE_NAME);
        fs::write(&path, r#"{"oracle": {"floor": 10.0, "ceiling": 2.0}}"#).unwrap();

        assert!(matches!(
            LedgerConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LedgerConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
