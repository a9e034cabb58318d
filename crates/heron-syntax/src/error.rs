//! Front end error types.

use thiserror::Error;

/// Errors raised while lowering source into handler inputs.
#[derive(Debug, Error)]
pub enum LowerError {
    /// The source is not valid Rust, or a type-level attribute is malformed.
    #[error("failed to parse source: {0}")]
    Parse(#[from] syn::Error),

    /// A handler or parameter attribute is malformed.
    #[error("handler `{handler}`: {source}")]
    Attribute {
        /// Handler name.
        handler: String,
        /// Underlying parse error.
        #[source]
        source: syn::Error,
    },

    /// The handler signature cannot be analyzed.
    #[error("handler `{handler}`: {message}")]
    Signature {
        /// Handler name.
        handler: String,
        /// What is wrong.
        message: String,
    },
}

impl LowerError {
    /// Wraps an attribute parse error.
    pub fn attribute(handler: impl Into<String>, source: syn::Error) -> Self {
        Self::Attribute {
            handler: handler.into(),
            source,
        }
    }

    /// Returns the handler the error belongs to, if any.
    #[must_use]
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::Parse(_) => None,
            Self::Attribute { handler, .. } | Self::Signature { handler, .. } => Some(handler),
        }
    }

    /// Returns what is wrong, without the handler prefix.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Parse(err) | Self::Attribute { source: err, .. } => err.to_string(),
            Self::Signature { message, .. } => message.clone(),
        }
    }

    /// Creates a signature error.
    pub fn signature(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Signature {
            handler: handler.into(),
            message: message.into(),
        }
    }
}
