//! Response outcomes and endpoint contracts.
//!
//! An [`EndpointContract`] lists every response a handler can produce. In
//! [`ContractMode::Union`] each member keeps its payload shape; in
//! [`ContractMode::Fallback`] only the distinct status codes survive.
//!
//! # Outcome kinds and status codes
//!
//! | `OutcomeKind` | Status | Shape |
//! |---|---|---|
//! | `Validation` | 400 | `ValidationProblem` |
//! | `Unauthorized` | 401 | `Problem` |
//! | `Forbidden` | 403 | `Problem` |
//! | `NotFound` | 404 | `Problem` |
//! | `Conflict` | 409 | `Problem` |
//! | `Failure` | 500 | `Problem` |
//! | `Unexpected` | 500 | `Problem` |
//! | `Custom` | as declared | `Problem` |

use std::collections::BTreeSet;

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Status codes the response union can represent with a concrete type.
pub const REPRESENTABLE_STATUSES: [u16; 11] =
    [200, 201, 202, 204, 400, 401, 403, 404, 409, 429, 500];

/// Returns true if the status code has a concrete union member type.
#[must_use]
pub fn is_representable_status(status: u16) -> bool {
    REPRESENTABLE_STATUSES.contains(&status)
}

/// A custom outcome with an explicit status code and error code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomOutcome {
    /// HTTP status code, when statically known.
    pub status: Option<u16>,
    /// Application error code.
    pub code: String,
}

impl CustomOutcome {
    /// Creates a custom outcome with a known status code.
    #[must_use]
    pub fn new(status: u16, code: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: code.into(),
        }
    }
}

/// Canonical categories of non-success results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Input failed validation.
    Validation,
    /// Caller is not authenticated.
    Unauthorized,
    /// Caller is not permitted.
    Forbidden,
    /// Resource does not exist.
    NotFound,
    /// Conflicting state.
    Conflict,
    /// Expected failure.
    Failure,
    /// Unexpected failure.
    Unexpected,
    /// Explicit status code and error code.
    Custom(CustomOutcome),
}

impl OutcomeKind {
    /// Returns the HTTP status code for this kind.
    ///
    /// Custom outcomes without a statically known status return `None`.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Validation => Some(StatusCode::BAD_REQUEST),
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Self::Forbidden => Some(StatusCode::FORBIDDEN),
            Self::NotFound => Some(StatusCode::NOT_FOUND),
            Self::Conflict => Some(StatusCode::CONFLICT),
            Self::Failure | Self::Unexpected => Some(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Custom(custom) => custom.status.and_then(|s| StatusCode::from_u16(s).ok()),
        }
    }

    /// Returns the raw status code for this kind.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Custom(custom) => custom.status,
            other => other.status_code().map(|s| s.as_u16()),
        }
    }

    /// Returns the payload shape this kind produces.
    #[must_use]
    pub const fn shape(&self) -> PayloadShape {
        match self {
            Self::Validation => PayloadShape::ValidationProblem,
            _ => PayloadShape::Problem,
        }
    }

    /// Returns a stable snake_case label.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Validation => "validation".to_string(),
            Self::Unauthorized => "unauthorized".to_string(),
            Self::Forbidden => "forbidden".to_string(),
            Self::NotFound => "not_found".to_string(),
            Self::Conflict => "conflict".to_string(),
            Self::Failure => "failure".to_string(),
            Self::Unexpected => "unexpected".to_string(),
            Self::Custom(custom) => format!("custom:{}", custom.code),
        }
    }

    /// Parses the label of a fixed kind (`"not_found"`, `"validation"`, ...).
    ///
    /// Custom kinds have no fixed label and return `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let kind = match label {
            "validation" => Self::Validation,
            "unauthorized" => Self::Unauthorized,
            "forbidden" => Self::Forbidden,
            "not_found" => Self::NotFound,
            "conflict" => Self::Conflict,
            "failure" => Self::Failure,
            "unexpected" => Self::Unexpected,
            _ => return None,
        };
        Some(kind)
    }
}

/// Response payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "shape", content = "type", rename_all = "snake_case")]
pub enum PayloadShape {
    /// No body.
    Empty,
    /// A typed value.
    Value(String),
    /// Single problem-details document.
    Problem,
    /// Structured multi-field validation problem.
    ValidationProblem,
}

/// Why an outcome is part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeOrigin {
    /// The handler's success result.
    Success,
    /// Request binding can fail for any handler.
    BindingFailure,
    /// Catch-all for unhandled failures.
    SafetyNet,
    /// Found in the handler body.
    Inferred,
    /// Declared on the handler.
    Declared,
    /// Added by authorization or rate-limiting middleware.
    Middleware,
}

/// One member of an endpoint's response set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomeDescriptor {
    /// HTTP status code.
    pub status: u16,
    /// Payload shape.
    pub shape: PayloadShape,
    /// Why this outcome is present.
    pub origin: OutcomeOrigin,
}

impl OutcomeDescriptor {
    /// Creates a new outcome descriptor.
    #[must_use]
    pub fn new(status: u16, shape: PayloadShape, origin: OutcomeOrigin) -> Self {
        Self {
            status,
            shape,
            origin,
        }
    }

    /// Returns the typed status code, if valid.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status).ok()
    }

    /// Identity used for de-duplication: status plus payload shape.
    #[must_use]
    pub fn key(&self) -> (u16, &PayloadShape) {
        (self.status, &self.shape)
    }
}

/// What the handler returns on success.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum SuccessKind {
    /// A typed value.
    Value(String),
    /// A no-content marker.
    NoContent,
    /// A created marker wrapping a value.
    Created(String),
    /// An accepted marker, optionally wrapping a value.
    Accepted(Option<String>),
}

/// An outcome declared explicitly on the handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclaredOutcome {
    /// HTTP status code.
    pub status: u16,
    /// Outcome kind, when named.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OutcomeKind>,
}

impl DeclaredOutcome {
    /// Declares a bare status code.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self { status, kind: None }
    }

    /// Declares an outcome kind; the status comes from the kind.
    ///
    /// Custom kinds without a known status declare status 0, which no table
    /// can represent.
    #[must_use]
    pub fn kind(kind: OutcomeKind) -> Self {
        Self {
            status: kind.status().unwrap_or(0),
            kind: Some(kind),
        }
    }

    /// Returns the payload shape of the declared outcome.
    #[must_use]
    pub fn shape(&self) -> PayloadShape {
        self.kind
            .as_ref()
            .map_or(PayloadShape::Problem, OutcomeKind::shape)
    }
}

/// Middleware applied to the handler that can short-circuit a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MiddlewarePolicy {
    /// Authorization is required.
    #[serde(default)]
    pub requires_authorization: bool,
    /// Anonymous access overrides the authorization requirement.
    #[serde(default)]
    pub allow_anonymous: bool,
    /// Rate limiting applies.
    #[serde(default)]
    pub rate_limited: bool,
    /// Rate limiting is explicitly disabled for this handler.
    #[serde(default)]
    pub rate_limiting_disabled: bool,
}

impl MiddlewarePolicy {
    /// Returns true if authorization failures can occur.
    #[must_use]
    pub const fn authorization_enforced(&self) -> bool {
        self.requires_authorization && !self.allow_anonymous
    }

    /// Returns true if rate-limit rejections can occur.
    #[must_use]
    pub const fn rate_limit_enforced(&self) -> bool {
        self.rate_limited && !self.rate_limiting_disabled
    }
}

/// Contract precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractMode {
    /// Finite union of typed outcomes.
    Union,
    /// Dynamic result; only status codes are known.
    Fallback,
}

/// Why a contract degraded to [`ContractMode::Fallback`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    /// More members than the arity limit allows.
    ArityExceeded {
        /// Member count.
        members: usize,
        /// Configured limit.
        limit: usize,
    },
    /// A status code has no concrete union member type.
    UnrepresentableStatus {
        /// The status, or `None` if it could not be determined.
        status: Option<u16>,
    },
    /// A union needs at least two members.
    TooFewMembers {
        /// Member count.
        members: usize,
    },
}

impl FallbackReason {
    /// Short description used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::ArityExceeded { members, limit } => {
                format!("{members} outcomes exceed the limit of {limit}")
            }
            Self::UnrepresentableStatus { status: Some(s) } => {
                format!("status {s} has no typed outcome")
            }
            Self::UnrepresentableStatus { status: None } => {
                "a status code cannot be determined statically".to_string()
            }
            Self::TooFewMembers { members } => format!("{members} outcome is not a union"),
        }
    }
}

/// The complete response contract of one handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointContract {
    /// The success outcome.
    pub success: OutcomeDescriptor,
    /// Error outcomes, ascending by status. Empty in fallback mode.
    pub errors: Vec<OutcomeDescriptor>,
    /// The arity limit the contract was built against.
    pub arity_limit: usize,
    /// Contract precision.
    pub mode: ContractMode,
    /// Distinct status codes, in fallback mode.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub fallback_status_codes: BTreeSet<u16>,
    /// Why the contract degraded, in fallback mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl EndpointContract {
    /// Returns true in union mode.
    #[must_use]
    pub fn is_union(&self) -> bool {
        self.mode == ContractMode::Union
    }

    /// Returns the union members: success followed by errors.
    pub fn members(&self) -> impl Iterator<Item = &OutcomeDescriptor> {
        std::iter::once(&self.success).chain(self.errors.iter())
    }

    /// Returns the distinct status codes the handler can produce.
    #[must_use]
    pub fn status_codes(&self) -> BTreeSet<u16> {
        match self.mode {
            ContractMode::Union => self.members().map(|m| m.status).collect(),
            ContractMode::Fallback => self.fallback_status_codes.clone(),
        }
    }
}
