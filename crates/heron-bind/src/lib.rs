//! Parameter binding classifier for Heron.
//!
//! Decides, for every handler parameter, where its value comes from at
//! invocation time, then checks the parameter list as a whole: conflicting
//! attributes, competing request-body readers, route constraints that reject
//! the bound type, and route parameters nobody binds.
//!
//! # Example
//!
//! ```rust
//! use heron_bind::classify_handler;
//! use heron_core::{AnalysisTables, BindingSource, ParameterSignature, TypeRef};
//! use http::Method;
//!
//! let route = heron_route::parse("/users/{id}");
//! let params = vec![
//!     ParameterSignature::new(0, "id", TypeRef::named("u64")),
//!     ParameterSignature::new(1, "repo", TypeRef::named("Arc<dyn UserRepository>")),
//! ];
//!
//! let tables = AnalysisTables::builtin();
//! let bindings = classify_handler("get_user", &Method::GET, &params, &route.parameters, &tables);
//!
//! assert!(bindings.is_valid());
//! assert_eq!(bindings.descriptors[0].source, BindingSource::Route("id".into()));
//! assert_eq!(bindings.descriptors[1].source, BindingSource::Service);
//! ```

#![doc(html_root_url = "https://docs.rs/heron-bind/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod classifier;
mod forms;
mod rules;
pub mod validate;

pub use classifier::{classify, classify_for, classify_handler, ParameterBindings};

/// Returns the names of the priority-chain rules, in evaluation order.
pub fn rule_names() -> impl Iterator<Item = &'static str> {
    rules::RULES.iter().map(|rule| rule.name)
}
