//! CLI configuration with TOML file support.

use drip_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CliError;

/// Configuration for the `drip` tool.
///
/// Can be loaded from a TOML file via [`CliConfig::from_toml_file`] or built
/// programmatically (e.g. for tests). Command-line flags override file values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CliConfig {
    /// Account allowed to mint, burn and change minting speeds.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Stop the replay at the first rejected entry.
    #[serde(default = "default_true")]
    pub fail_fast: bool,

    /// Re-check the ledger invariants after every applied entry.
    #[serde(default)]
    pub verify_each_step: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_issuer() -> String {
    "issuer".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, CliError> {
        toml::from_str(s).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, CliError> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            fail_fast: default_true(),
            verify_each_step: false,
        }
    }
}
