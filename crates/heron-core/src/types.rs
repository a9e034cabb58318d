//! Semantic type information.
//!
//! A [`TypeRef`] is everything the classifier needs to know about a declared
//! parameter type: its spelling, whether it is an enumeration, which custom
//! binding conventions it implements, and its constructors (used when the
//! type is expanded into individual parameters).

use serde::{Deserialize, Serialize};

use crate::signature::ParameterSignature;

/// Shape of a type's string-parsing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseShape {
    /// `parse(text) -> Option<Self>`
    Plain,
    /// `parse(text, format) -> Option<Self>`
    WithFormat,
}

/// Shape of a type's asynchronous request factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryShape {
    /// `bind(ctx) -> Future<Output = Self>`
    Context,
    /// `bind(ctx, parameter_metadata) -> Future<Output = Self>`
    ContextWithMetadata,
}

/// Custom binding conventions implemented by a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeCapabilities {
    /// Static string-parsing function, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse: Option<ParseShape>,
    /// Whether the type implements the bindable-from-request marker.
    #[serde(default)]
    pub bindable: bool,
    /// Static async factory taking the request context, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_factory: Option<FactoryShape>,
}

impl TypeCapabilities {
    /// Returns true if no custom convention is implemented.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.parse.is_none() && !self.bindable && self.async_factory.is_none()
    }
}

/// A constructor of a complex type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constructor {
    /// Whether the constructor is publicly accessible.
    pub public: bool,
    /// Constructor parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<ParameterSignature>,
}

impl Constructor {
    /// Creates a public constructor with the given parameters.
    #[must_use]
    pub fn public(parameters: Vec<ParameterSignature>) -> Self {
        Self {
            public: true,
            parameters,
        }
    }

    /// Creates a non-public constructor with the given parameters.
    #[must_use]
    pub fn private(parameters: Vec<ParameterSignature>) -> Self {
        Self {
            public: false,
            parameters,
        }
    }
}

/// A declared type, as reported by the signature front end.
///
/// # Example
///
/// ```
/// use heron_core::{ParseShape, TypeRef};
///
/// let ty = TypeRef::named("OrderId").with_parse(ParseShape::Plain);
/// assert!(ty.is_parse_capable());
/// assert!(!ty.is_enum);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Type name as spelled in the signature (e.g. `i32`, `Vec<String>`).
    pub name: String,
    /// Whether the type is an enumeration (enumerations bind like primitives).
    #[serde(default)]
    pub is_enum: bool,
    /// Custom binding conventions.
    #[serde(default)]
    pub capabilities: TypeCapabilities,
    /// Constructors, for complex types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<Constructor>,
}

impl TypeRef {
    /// Creates a type with no capabilities and no constructors.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_enum: false,
            capabilities: TypeCapabilities::default(),
            constructors: Vec::new(),
        }
    }

    /// Creates an enumeration type.
    #[must_use]
    pub fn enumeration(name: impl Into<String>) -> Self {
        Self {
            is_enum: true,
            ..Self::named(name)
        }
    }

    /// Marks the type as implementing a string-parsing function.
    #[must_use]
    pub fn with_parse(mut self, shape: ParseShape) -> Self {
        self.capabilities.parse = Some(shape);
        self
    }

    /// Marks the type as bindable from the request context.
    #[must_use]
    pub fn bindable(mut self) -> Self {
        self.capabilities.bindable = true;
        self
    }

    /// Marks the type as implementing an async request factory.
    #[must_use]
    pub fn with_async_factory(mut self, shape: FactoryShape) -> Self {
        self.capabilities.async_factory = Some(shape);
        self
    }

    /// Adds a constructor.
    #[must_use]
    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Returns true if the type can be parsed from a single string.
    #[must_use]
    pub const fn is_parse_capable(&self) -> bool {
        self.capabilities.parse.is_some()
    }

    /// Returns the public constructor with the most parameters.
    ///
    /// Ties go to the constructor declared first.
    #[must_use]
    pub fn widest_public_constructor(&self) -> Option<&Constructor> {
        self.constructors
            .iter()
            .filter(|c| c.public)
            .fold(None, |best: Option<&Constructor>, c| match best {
                Some(b) if b.parameters.len() >= c.parameters.len() => Some(b),
                _ => Some(c),
            })
    }
}
