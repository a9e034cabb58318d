//! Facade error types.

use heron_config::ConfigError;
use heron_syntax::LowerError;
use heron_telemetry::TelemetryError;
use thiserror::Error;

/// Errors raised outside the per-handler analysis.
///
/// Analysis problems are never errors: they are reported as diagnostics on
/// the [`HandlerAnalysis`](crate::HandlerAnalysis). These are the failures
/// that prevent analysis from starting at all.
#[derive(Debug, Error)]
pub enum HeronError {
    /// The configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source file could not be lowered into handler inputs.
    #[error("source error: {0}")]
    Source(#[from] LowerError),

    /// The logging subscriber could not be installed.
    #[error("logging error: {0}")]
    Logging(#[from] TelemetryError),
}

/// Result type for facade operations.
pub type HeronResult<T> = Result<T, HeronError>;
