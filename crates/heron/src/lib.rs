//! # Heron
//!
//! **Static analysis of HTTP handler bindings and response contracts**
//!
//! Given a handler's route template, parameter list, return type and body,
//! Heron decides where every parameter's value comes from and which
//! responses the handler can produce:
//!
//! - **Route parsing**: placeholders, constraints, optional and catch-all
//!   segments, with located syntax diagnostics
//! - **Binding classification**: a fixed priority chain maps each parameter
//!   to the route, query, headers, body, form, services or a parameter object
//! - **Outcome inference**: calls to outcome factories are found in the body
//!   and in every local helper it reaches
//! - **Response contracts**: a typed union of outcomes when it fits the arity
//!   limit, a dynamic result listing status codes otherwise
//!
//! ## Quick Start
//!
//! ```
//! let source = r#"
//!     #[handler(method = "GET", path = "/users/{id:int}")]
//!     async fn get_user(id: i32) -> Result<Json<User>, Error> {
//!         Err(Error::not_found("user"))
//!     }
//! "#;
//!
//! let analyses = heron::analyze_source(source).unwrap();
//! let analysis = &analyses[0];
//! assert!(analysis.usable);
//!
//! let contract = analysis.contract.as_ref().unwrap();
//! let codes: Vec<u16> = contract.status_codes().into_iter().collect();
//! assert_eq!(codes, vec![200, 400, 404, 500]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! HandlerInput → route parse → classify → validate → infer → contract
//!                                                              ↓
//!                                   HandlerAnalysis ← diagnostics
//! ```
//!
//! Every pass is pure: equal inputs always give equal analyses, which is
//! what [`AnalysisCache`] relies on.

#![doc(html_root_url = "https://docs.rs/heron/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod analyzer;
mod cache;
mod error;

pub use analyzer::{Analyzer, HandlerAnalysis};
pub use cache::{AnalysisCache, CacheStats};
pub use error::{HeronError, HeronResult};

// Re-export the pass crates
pub use heron_bind as bind;
pub use heron_config as config;
pub use heron_contract as contract;
pub use heron_core as core;
pub use heron_infer as infer;
pub use heron_route as route;
pub use heron_syntax as syntax;
pub use heron_telemetry as telemetry;

// Re-export the types every caller touches
pub use heron_config::{ConfigLoader, HeronConfig};
pub use heron_core::{
    AnalysisTables, BindingSource, ContractMode, DeclaredOutcome, Diagnostic, DiagnosticCode,
    EndpointContract, MiddlewarePolicy, ParameterSignature, Severity, SuccessKind, TypeRef,
};
pub use heron_infer::{HandlerBody, HandlerInput};
pub use http::Method;

/// Analyzes every `#[handler]` function in a Rust source file with the
/// default analyzer.
///
/// # Errors
///
/// Returns [`HeronError::Source`] if the source does not parse. Malformed
/// handlers are reported in place; see [`Analyzer::analyze_source`].
pub fn analyze_source(source: &str) -> HeronResult<Vec<HandlerAnalysis>> {
    Analyzer::default().analyze_source(source)
}

/// Installs the logging subscriber described by `config`.
///
/// # Errors
///
/// Returns [`HeronError::Logging`] if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &HeronConfig) -> HeronResult<()> {
    heron_telemetry::init_logging(&config.logging.to_log_config())?;
    Ok(())
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use heron::prelude::*;
///
/// let analyzer = Analyzer::default();
/// assert_eq!(analyzer.arity_limit(), 6);
/// ```
pub mod prelude {
    pub use crate::{
        analyze_source, AnalysisCache, Analyzer, HandlerAnalysis, HeronConfig, HeronError,
        HeronResult,
    };
    pub use heron_core::{
        BindingSource, ContractMode, DeclaredOutcome, Diagnostic, DiagnosticCode, Severity,
        SuccessKind,
    };
    pub use heron_infer::{HandlerBody, HandlerInput};
    pub use http::Method;
}
