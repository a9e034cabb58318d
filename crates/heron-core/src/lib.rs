//! # Heron Core
//!
//! Core data model shared by every Heron analysis pass.
//!
//! This crate provides the types that flow between the passes:
//!
//! - [`ParameterSignature`] / [`TypeRef`] - what the signature front end supplies
//! - [`ParameterDescriptor`] / [`BindingSource`] - what the classifier decides
//! - [`EndpointContract`] / [`OutcomeDescriptor`] - what the contract builder produces
//! - [`Diagnostic`] / [`DiagnosticCode`] - what every pass reports
//! - [`AnalysisTables`] - the read-only lookup tables injected into each pass
//!
//! Every type here is an immutable value: equal inputs produce equal outputs,
//! so hosts can memoize by structural equality.

#![doc(html_root_url = "https://docs.rs/heron-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod binding;
mod diagnostic;
mod error;
pub mod method;
mod outcome;
mod signature;
pub mod tables;
mod types;

pub use binding::{BindingProtocol, BindingSource, BodyGroup, ParameterDescriptor};
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity, Span};
pub use error::{ClassificationError, ClassificationResult};
pub use outcome::{
    is_representable_status, ContractMode, CustomOutcome, DeclaredOutcome, EndpointContract,
    FallbackReason, MiddlewarePolicy, OutcomeDescriptor, OutcomeKind, OutcomeOrigin,
    PayloadShape, SuccessKind, REPRESENTABLE_STATUSES,
};
pub use signature::{AttributeInstance, AttributeKind, LiteralValue, ParameterSignature};
pub use tables::{
    AnalysisTables, ConstraintClass, ConstraintTable, FactoryRule, FactoryTable, TypeTable,
    WellKnownType,
};
pub use types::{Constructor, FactoryShape, ParseShape, TypeCapabilities, TypeRef};
