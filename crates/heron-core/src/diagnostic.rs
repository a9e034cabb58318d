//! Diagnostics raised by the analysis passes.
//!
//! A [`Diagnostic`] is a `(code, severity, args, location)` tuple. Rendering is
//! left to the consumer; [`Diagnostic::message`] fills the code's template
//! for logs and tests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagnostic severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; behaviour is correct but less precise.
    Info,
    /// Likely mistake; analysis continues normally.
    Warning,
    /// The handler cannot be used for code generation.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// The route template is malformed.
    RouteSyntaxError,
    /// A route parameter name appears twice.
    DuplicateRouteParameter,
    /// A route parameter is bound by no handler parameter.
    RouteParameterNotBound,
    /// More than one parameter reads the request body.
    MultipleBodySources,
    /// A route constraint does not match the bound parameter's type.
    RouteConstraintTypeMismatch,
    /// A parameter carries conflicting binding attributes.
    AmbiguousParameterBinding,
    /// The response union degraded to a dynamic contract.
    TooManyOutcomeTypes,
    /// A parameter object was nested in another.
    NestedParameterObjectNotSupported,
    /// A call on an outcome receiver names no known factory.
    UnknownOutcomeFactory,
    /// The parameter type cannot be bound from the requested source.
    UnsupportedBindingType,
    /// A parameter object has no usable constructor.
    InvalidParameterObject,
    /// A call whose outcomes cannot be inferred and were not declared.
    UnresolvedOutcomeCall,
    /// The handler could not be analyzed at all.
    HandlerAnalysisFailed,
}

impl DiagnosticCode {
    /// Returns the stable identifier.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::RouteSyntaxError => "HRN0001",
            Self::DuplicateRouteParameter => "HRN0002",
            Self::RouteParameterNotBound => "HRN0003",
            Self::MultipleBodySources => "HRN0004",
            Self::RouteConstraintTypeMismatch => "HRN0005",
            Self::AmbiguousParameterBinding => "HRN0006",
            Self::TooManyOutcomeTypes => "HRN0007",
            Self::NestedParameterObjectNotSupported => "HRN0008",
            Self::UnknownOutcomeFactory => "HRN0009",
            Self::UnsupportedBindingType => "HRN0010",
            Self::InvalidParameterObject => "HRN0011",
            Self::UnresolvedOutcomeCall => "HRN0012",
            Self::HandlerAnalysisFailed => "HRN0013",
        }
    }

    /// Returns the severity the code is raised with.
    #[must_use]
    pub const fn default_severity(&self) -> Severity {
        match self {
            Self::RouteConstraintTypeMismatch | Self::UnknownOutcomeFactory => Severity::Warning,
            Self::TooManyOutcomeTypes => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// Returns the message template; `{n}` is replaced by the n-th argument.
    #[must_use]
    pub const fn template(&self) -> &'static str {
        match self {
            Self::RouteSyntaxError => "route template '{0}' is malformed: {1}",
            Self::DuplicateRouteParameter => {
                "route parameter '{0}' appears more than once in '{1}'"
            }
            Self::RouteParameterNotBound => {
                "route parameter '{0}' is not bound by any handler parameter"
            }
            Self::MultipleBodySources => {
                "handler '{0}' reads the request body from more than one source: {1}"
            }
            Self::RouteConstraintTypeMismatch => {
                "route parameter '{0}' has constraint '{1}' but is bound to type '{2}'"
            }
            Self::AmbiguousParameterBinding => {
                "parameter '{0}' carries conflicting binding attributes: {1}"
            }
            Self::TooManyOutcomeTypes => {
                "handler '{0}' reports a dynamic response contract: {1}"
            }
            Self::NestedParameterObjectNotSupported => {
                "parameter '{0}' nests a parameter object inside '{1}'"
            }
            Self::UnknownOutcomeFactory => "'{0}' is not a known outcome factory",
            Self::UnsupportedBindingType => {
                "parameter '{0}' of type '{1}' cannot be bound from {2}"
            }
            Self::InvalidParameterObject => {
                "type '{1}' of parameter '{0}' has no public constructor with parameters"
            }
            Self::UnresolvedOutcomeCall => {
                "call to '{0}' may produce outcomes that cannot be inferred; declare them explicitly"
            }
            Self::HandlerAnalysisFailed => "handler '{0}' could not be analyzed: {1}",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Byte range within the route template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start offset, inclusive.
    pub start: usize,
    /// End offset, exclusive.
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Where a diagnostic applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Handler name.
    pub handler: String,
    /// Parameter name, when the diagnostic concerns one parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Span in the route template, for route diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Location {
    /// A location covering the whole handler.
    #[must_use]
    pub fn handler(name: impl Into<String>) -> Self {
        Self {
            handler: name.into(),
            parameter: None,
            span: None,
        }
    }

    /// Narrows the location to one parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    /// Narrows the location to a template span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// A single diagnostic.
///
/// # Example
///
/// ```
/// use heron_core::{Diagnostic, DiagnosticCode, Location, Severity};
///
/// let diag = Diagnostic::new(
///     DiagnosticCode::RouteParameterNotBound,
///     Location::handler("get_user"),
/// )
/// .with_arg("id");
///
/// assert_eq!(diag.severity, Severity::Error);
/// assert_eq!(diag.message(), "route parameter 'id' is not bound by any handler parameter");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic code.
    pub code: DiagnosticCode,
    /// Severity.
    pub severity: Severity,
    /// Message template arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Location.
    pub location: Location,
}

impl Diagnostic {
    /// Creates a diagnostic with the code's default severity.
    #[must_use]
    pub fn new(code: DiagnosticCode, location: Location) -> Self {
        Self {
            code,
            severity: code.default_severity(),
            args: Vec::new(),
            location,
        }
    }

    /// Appends a template argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Returns true for error-severity diagnostics.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Fills the code's template with the arguments.
    #[must_use]
    pub fn message(&self) -> String {
        let mut message = self.code.template().to_string();
        for (i, arg) in self.args.iter().enumerate() {
            message = message.replace(&format!("{{{i}}}"), arg);
        }
        message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code, self.severity, self.message())?;
        match &self.location.parameter {
            Some(p) => write!(f, " (handler `{}`, parameter `{p}`)", self.location.handler),
            None => write!(f, " (handler `{}`)", self.location.handler),
        }
    }
}
