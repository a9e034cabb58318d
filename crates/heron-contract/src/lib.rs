//! # Heron Contract
//!
//! Builds the response contract of a handler from its success kind, the
//! outcomes inferred from its body, the outcomes it declares and the
//! middleware wrapped around it.
//!
//! Every handler implicitly answers `400` when parameter binding fails and
//! `500` when it panics or an error escapes. When the resulting set fits the
//! arity limit and every status is representable, the contract is a typed
//! union; otherwise it degrades to a dynamic result that only lists the
//! status codes.

#![doc(html_root_url = "https://docs.rs/heron-contract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;

pub use builder::{build, success_outcome, ContractInput, DEFAULT_ARITY_LIMIT};
