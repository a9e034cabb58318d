//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use std::collections::BTreeMap;

use heron_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Analysis settings.
///
/// # Example
///
/// ```
/// use heron_config::AnalysisConfig;
///
/// let config = AnalysisConfig {
///     arity_limit: 8,
///     ..Default::default()
/// };
/// assert!(config.parallel);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Maximum number of members (success plus errors) in a typed response
    /// union. Larger contracts degrade to a dynamic result.
    #[serde(default = "default_arity_limit")]
    pub arity_limit: usize,

    /// Analyze batches on worker threads.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Worker thread count for batches. `None` uses the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            arity_limit: default_arity_limit(),
            parallel: true,
            workers: None,
        }
    }
}

fn default_arity_limit() -> usize {
    6
}

fn default_true() -> bool {
    true
}

/// Additions to the built-in lookup tables.
///
/// Everything here extends the built-in tables; nothing replaces them.
///
/// ```toml
/// [tables]
/// primitives = ["Money"]
/// textual = ["Slug"]
/// format_only_constraints = ["slug"]
/// factory_receivers = ["Problem"]
///
/// [tables.constraints]
/// ulid = ["Ulid"]
///
/// [tables.aliases]
/// "SmolStr" = "String"
///
/// [tables.factories]
/// gone = "not_found"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TablesConfig {
    /// Typed route constraints: name to accepted canonical type names.
    #[serde(default)]
    pub constraints: BTreeMap<String, Vec<String>>,

    /// Constraints that restrict format but accept any type.
    #[serde(default)]
    pub format_only_constraints: Vec<String>,

    /// Extra primitive type names.
    #[serde(default)]
    pub primitives: Vec<String>,

    /// Extra textual type names (accepted by catch-all segments).
    #[serde(default)]
    pub textual: Vec<String>,

    /// Type spellings that canonicalize to another name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    /// Extra outcome factory receivers (beside `Error`).
    #[serde(default)]
    pub factory_receivers: Vec<String>,

    /// Extra factories: method name to outcome kind label, or `"custom"`.
    #[serde(default)]
    pub factories: BTreeMap<String, String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts to the subscriber configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            filter: self.level.clone(),
            format: self.format,
            file_line_info: self.include_location,
            ansi: self.ansi_enabled,
            ..LogConfig::default()
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
