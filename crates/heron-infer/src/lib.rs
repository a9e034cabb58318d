//! Error-outcome inference for Heron.
//!
//! Scans a lowered handler body for calls to known outcome factories
//! (`Error::not_found(..)`, `Error::custom(422, "Order.Invalid")`, ...) and
//! follows calls and references into local helpers, constants and methods.
//!
//! The body model ([`SyntaxNode`]) is produced by a front end; the scan
//! reads symbol bodies through the [`SymbolSource`] trait so hosts can back
//! it with their own storage.
//!
//! [`HandlerInput`] bundles a handler's signature facts with its lowered
//! body; it is what front ends produce and what the analyzer consumes.

#![doc(html_root_url = "https://docs.rs/heron-infer/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod fold;
mod handler;
mod infer;
mod syntax;

pub use fold::{fold, fold_code, fold_status};
pub use handler::{HandlerBody, HandlerInput};
pub use infer::{infer, InferenceReport};
pub use syntax::{CallTarget, Callee, SymbolId, SymbolRef, SymbolSource, SymbolTable, SyntaxNode};
