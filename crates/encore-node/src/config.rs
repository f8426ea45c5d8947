//! Daemon configuration loading.

use encore_core::config::{EngineConfig, OnchainConfig, SweeperConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration for the Encore settlement daemon.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EncoreConfig {
    /// Verification engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// On-chain rail acceptance policy.
    #[serde(default)]
    pub onchain: OnchainConfig,

    /// Reconciliation sweeper schedule.
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EncoreConfig {
    /// Load configuration from a TOML file; missing sections use defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Serialize the default configuration for `--init`.
    pub fn default_toml() -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}
