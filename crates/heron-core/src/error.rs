//! Classification errors.
//!
//! A [`ClassificationError`] never aborts analysis: the offending parameter
//! falls back to [`BindingSource::Service`](crate::BindingSource::Service) and
//! the error is reported as a diagnostic.

use thiserror::Error;

use crate::diagnostic::{Diagnostic, DiagnosticCode, Location};

/// Result type alias using [`ClassificationError`].
pub type ClassificationResult<T> = Result<T, ClassificationError>;

/// Errors raised while classifying one parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    /// Type cannot be bound from a route segment.
    #[error("parameter '{parameter}' of type '{type_name}' cannot be bound from the route")]
    UnsupportedRouteType {
        /// Parameter name.
        parameter: String,
        /// Declared type.
        type_name: String,
    },

    /// Type cannot be bound from the query string.
    #[error("parameter '{parameter}' of type '{type_name}' cannot be bound from the query string")]
    UnsupportedQueryType {
        /// Parameter name.
        parameter: String,
        /// Declared type.
        type_name: String,
    },

    /// A parameter object was nested inside another.
    #[error("parameter '{parameter}' nests a parameter object inside '{parent}'")]
    NestedParameterObject {
        /// Nested parameter name.
        parameter: String,
        /// Enclosing parameter name.
        parent: String,
    },

    /// A parameter object type has no public constructor.
    #[error("type '{type_name}' of parameter '{parameter}' has no public constructor")]
    NoPublicConstructor {
        /// Parameter name.
        parameter: String,
        /// Declared type.
        type_name: String,
    },

    /// A parameter object's widest public constructor takes no parameters.
    #[error("the public constructor of '{type_name}' (parameter '{parameter}') takes no parameters")]
    EmptyConstructor {
        /// Parameter name.
        parameter: String,
        /// Declared type.
        type_name: String,
    },
}

impl ClassificationError {
    /// Returns the diagnostic code for this error.
    #[must_use]
    pub const fn code(&self) -> DiagnosticCode {
        match self {
            Self::UnsupportedRouteType { .. } | Self::UnsupportedQueryType { .. } => {
                DiagnosticCode::UnsupportedBindingType
            }
            Self::NestedParameterObject { .. } => DiagnosticCode::NestedParameterObjectNotSupported,
            Self::NoPublicConstructor { .. } | Self::EmptyConstructor { .. } => {
                DiagnosticCode::InvalidParameterObject
            }
        }
    }

    /// Returns the name of the parameter the error concerns.
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::UnsupportedRouteType { parameter, .. }
            | Self::UnsupportedQueryType { parameter, .. }
            | Self::NestedParameterObject { parameter, .. }
            | Self::NoPublicConstructor { parameter, .. }
            | Self::EmptyConstructor { parameter, .. } => parameter,
        }
    }

    /// Converts the error into a diagnostic located on `handler`.
    ///
    /// `top_level` is the handler parameter the error surfaced through; it
    /// differs from [`parameter`](Self::parameter) for expanded children.
    #[must_use]
    pub fn to_diagnostic(&self, handler: &str, top_level: &str) -> Diagnostic {
        let location = Location::handler(handler).with_parameter(top_level);
        let diag = Diagnostic::new(self.code(), location);
        match self {
            Self::UnsupportedRouteType {
                parameter,
                type_name,
            } => diag.with_arg(parameter).with_arg(type_name).with_arg("the route"),
            Self::UnsupportedQueryType {
                parameter,
                type_name,
            } => diag
                .with_arg(parameter)
                .with_arg(type_name)
                .with_arg("the query string"),
            Self::NestedParameterObject { parameter, parent } => {
                diag.with_arg(parameter).with_arg(parent)
            }
            Self::NoPublicConstructor {
                parameter,
                type_name,
            }
            | Self::EmptyConstructor {
                parameter,
                type_name,
            } => diag.with_arg(parameter).with_arg(type_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClassificationError::UnsupportedRouteType {
            parameter: "filter".into(),
            type_name: "Filter".into(),
        };
        assert_eq!(
            err.to_string(),
            "parameter 'filter' of type 'Filter' cannot be bound from the route"
        );
    }

    #[test]
    fn test_codes() {
        let nested = ClassificationError::NestedParameterObject {
            parameter: "inner".into(),
            parent: "outer".into(),
        };
        assert_eq!(nested.code(), DiagnosticCode::NestedParameterObjectNotSupported);
        assert_eq!(nested.parameter(), "inner");

        let empty = ClassificationError::EmptyConstructor {
            parameter: "args".into(),
            type_name: "Args".into(),
        };
        assert_eq!(empty.code(), DiagnosticCode::InvalidParameterObject);
    }

    #[test]
    fn test_to_diagnostic_uses_top_level_parameter() {
        let err = ClassificationError::UnsupportedQueryType {
            parameter: "filter".into(),
            type_name: "Filter".into(),
        };
        let diag = err.to_diagnostic("search", "args");
        assert_eq!(diag.location.parameter.as_deref(), Some("args"));
        assert_eq!(
            diag.message(),
            "parameter 'filter' of type 'Filter' cannot be bound from the query string"
        );
    }
}
