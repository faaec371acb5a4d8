//! Configuration for the ledger engine

use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name, used in operational logs
    pub service_name: String,

    /// Comparison tolerance in minor units
    ///
    /// Absorbs rounding noise from upstream decimal inputs when validating
    /// item totals and classifying balances as settled. One minor unit
    /// (0.01) unless an embedder has a reason to widen it.
    pub epsilon_minor_units: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "expense-ledger".to_string(),
            epsilon_minor_units: 1,
        }
    }
}

impl Config {
    /// Tolerance as a money value
    pub fn epsilon(&self) -> Money {
        Money::from_minor(self.epsilon_minor_units)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(name) = std::env::var("LEDGER_SERVICE_NAME") {
            config.service_name = name;
        }

        if let Ok(epsilon) = std::env::var("LEDGER_EPSILON_MINOR_UNITS") {
            if let Ok(value) = epsilon.parse() {
                config.epsilon_minor_units = value;
            }
        }

        config
    }
}
