//! Typed configuration for Heron.
//!
//! This crate provides a strongly-typed configuration for the analyzer with
//! support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides, optionally from a `.env` file
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`HeronConfig`] has three sections:
//!
//! - [`AnalysisConfig`] - arity limit and batch parallelism
//! - [`TablesConfig`] - additions to the built-in constraint, type and
//!   outcome-factory tables
//! - [`LoggingConfig`] - log level and format
//!
//! # Configuration File Format
//!
//! ```toml
//! [analysis]
//! arity_limit = 6
//! parallel = true
//!
//! [tables]
//! primitives = ["Money"]
//! factory_receivers = ["Problem"]
//!
//! [tables.constraints]
//! ulid = ["Ulid"]
//!
//! [tables.factories]
//! gone = "not_found"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `HERON__ANALYSIS__ARITY_LIMIT=8`
//! - `HERON__LOGGING__FORMAT=pretty`
//! - `HERON__TABLES__PRIMITIVES=Money,Ulid`

#![doc(html_root_url = "https://docs.rs/heron-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HeronConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{AnalysisConfig, LoggingConfig, TablesConfig};
