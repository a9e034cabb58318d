//! Parsed route templates and their syntax issues.

use heron_core::{Diagnostic, DiagnosticCode, Location, Span};
use serde::{Deserialize, Serialize};

use crate::params::{RouteParameter, RouteParameters};

/// Kind of template syntax problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyntaxIssueKind {
    /// The template is empty or whitespace.
    EmptyTemplate,
    /// A placeholder has no name (`{}`, `{*}`, `{?}`).
    EmptyParameterName,
    /// A brace is not matched.
    MismatchedBraces,
    /// A parameter name repeats, ignoring case.
    DuplicateParameter {
        /// The repeated name.
        name: String,
    },
}

impl SyntaxIssueKind {
    /// Short description used in diagnostics.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::EmptyTemplate => "the template is empty",
            Self::EmptyParameterName => "a parameter has no name",
            Self::MismatchedBraces => "braces are not balanced",
            Self::DuplicateParameter { .. } => "a parameter name is repeated",
        }
    }
}

/// A syntax issue located in the template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyntaxIssue {
    /// What is wrong.
    pub kind: SyntaxIssueKind,
    /// Where.
    pub span: Span,
}

impl SyntaxIssue {
    /// Creates a new issue.
    #[must_use]
    pub fn new(kind: SyntaxIssueKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// A run of template text, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "piece", content = "value", rename_all = "snake_case")]
pub enum Piece {
    /// Literal text, brace escapes kept as written.
    Literal(String),
    /// Index into [`RouteTemplate::parameters`].
    Parameter(usize),
}

/// The result of parsing a route template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteTemplate {
    /// The template as written.
    pub raw: String,
    /// Parameters in order of appearance.
    pub parameters: RouteParameters,
    /// Syntax issues; any issue makes the template unusable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<SyntaxIssue>,
    pub(crate) pieces: Vec<Piece>,
}

impl RouteTemplate {
    /// Returns true if the template parsed without issues.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Looks up a parameter, ignoring case.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&RouteParameter> {
        self.parameters.get(name)
    }

    /// Returns the literal and parameter pieces in source order.
    #[must_use]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Renders the template from its pieces.
    ///
    /// For templates without issues this reproduces the input, except that
    /// repeated `*` markers collapse to one.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Parameter(index) => {
                    if let Some(param) = self.parameters.as_slice().get(*index) {
                        out.push_str(&param.render());
                    }
                }
            }
        }
        out
    }

    /// Converts the issues into diagnostics located on `handler`.
    #[must_use]
    pub fn diagnostics(&self, handler: &str) -> Vec<Diagnostic> {
        self.issues
            .iter()
            .map(|issue| {
                let location = Location::handler(handler).with_span(issue.span);
                match &issue.kind {
                    SyntaxIssueKind::DuplicateParameter { name } => {
                        Diagnostic::new(DiagnosticCode::DuplicateRouteParameter, location)
                            .with_arg(name)
                            .with_arg(&self.raw)
                    }
                    kind => Diagnostic::new(DiagnosticCode::RouteSyntaxError, location)
                        .with_arg(&self.raw)
                        .with_arg(kind.describe()),
                }
            })
            .collect()
    }
}
