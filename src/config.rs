//! Validator configuration
//!
//! Coercion mode:
//! - `lax` (default): lossless conversions such as `"1997"` -> 1997
//! - `strict`: only values whose JSON type already matches
//!
//! Logging threshold: events below it are not written. `None` (default)
//! silences the validator entirely, so validation performs no I/O unless
//! a threshold is set.

use serde::{Deserialize, Serialize};

use crate::observability::Severity;

/// How raw values are converted to declared types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
    /// Lossless conversions allowed
    #[default]
    Lax,
    /// JSON type must already match
    Strict,
}

/// Configuration for a `SchemaValidator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Coercion mode applied to input values
    pub coercion: CoercionMode,
    /// Lowest severity written to the log
    pub log_level: Option<Severity>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            coercion: CoercionMode::Lax,
            log_level: None,
        }
    }
}

impl ValidatorConfig {
    /// Create config with strict coercion.
    pub fn strict() -> Self {
        Self {
            coercion: CoercionMode::Strict,
            ..Self::default()
        }
    }

    /// Create config that never logs.
    pub fn quiet() -> Self {
        Self {
            log_level: None,
            ..Self::default()
        }
    }

    /// Override the logging threshold.
    pub fn with_log_level(mut self, level: Option<Severity>) -> Self {
        self.log_level = level;
        self
    }

    /// Check if an event of this severity is written.
    pub fn should_log(&self, severity: Severity) -> bool {
        self.log_level.map_or(false, |threshold| severity >= threshold)
    }

    /// Parse a config from JSON; absent keys take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
