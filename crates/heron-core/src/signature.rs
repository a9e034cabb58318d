//! Parameter signatures and declarative attributes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::TypeRef;

/// A literal attribute argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    /// String literal.
    Str(String),
    /// Integer literal.
    Int(i64),
    /// Boolean literal.
    Bool(bool),
}

impl LiteralValue {
    /// Returns the string value, if this is a string literal.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer literal.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for LiteralValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for LiteralValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for LiteralValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Binding attribute kinds understood by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Expand the parameter's constructor arguments into handler parameters.
    Expand,
    /// Bind from the request body.
    Body,
    /// Bind from form data.
    Form,
    /// Resolve from the dependency container.
    Service,
    /// Resolve a keyed service from the dependency container.
    KeyedService,
    /// Bind from a request header.
    Header,
    /// Bind from a route segment.
    Route,
    /// Bind from the query string.
    Query,
}

impl AttributeKind {
    /// Short human-readable label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::Body => "body",
            Self::Form => "form",
            Self::Service => "service",
            Self::KeyedService => "keyed service",
            Self::Header => "header",
            Self::Route => "route",
            Self::Query => "query",
        }
    }

    /// Returns the attribute's source family.
    ///
    /// `Service` and `KeyedService` name the same source, so carrying both is
    /// not a conflict.
    #[must_use]
    pub const fn family(&self) -> Self {
        match self {
            Self::KeyedService => Self::Service,
            other => *other,
        }
    }
}

/// An attribute applied to a handler parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeInstance {
    /// The attribute kind.
    pub kind: AttributeKind,
    /// Literal arguments keyed by name (e.g. `name`, `key`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub literal_args: BTreeMap<String, LiteralValue>,
}

impl AttributeInstance {
    /// Creates an attribute without arguments.
    #[must_use]
    pub fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            literal_args: BTreeMap::new(),
        }
    }

    /// Adds a literal argument.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        self.literal_args.insert(key.into(), value.into());
        self
    }

    /// Returns the `name` argument, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.literal_args.get("name").and_then(LiteralValue::as_str)
    }

    /// Returns the `key` argument, if set.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.literal_args.get("key").and_then(LiteralValue::as_str)
    }
}

/// A handler parameter as declared in source.
///
/// `ty` is the underlying type; `nullable` records an optional wrapper
/// around it.
///
/// # Example
///
/// ```
/// use heron_core::{AttributeInstance, AttributeKind, ParameterSignature, TypeRef};
///
/// let sig = ParameterSignature::new(0, "tags", TypeRef::named("Vec<String>"))
///     .collection_of(TypeRef::named("String"))
///     .with_attribute(AttributeInstance::new(AttributeKind::Query).with_arg("name", "tag"));
///
/// assert!(sig.is_collection);
/// assert_eq!(sig.attribute(AttributeKind::Query).and_then(|a| a.name()), Some("tag"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterSignature {
    /// Zero-based position in the parameter list.
    pub index: usize,
    /// Declared parameter name.
    pub name: String,
    /// Declared (non-nullable) type.
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Whether the parameter accepts an absent value.
    #[serde(default)]
    pub nullable: bool,
    /// Whether the type is a value type.
    #[serde(default)]
    pub is_value_type: bool,
    /// Attributes applied to the parameter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeInstance>,
    /// Whether the type is a collection.
    #[serde(default)]
    pub is_collection: bool,
    /// Element type, for collections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<TypeRef>,
}

impl ParameterSignature {
    /// Creates a plain, non-nullable, attribute-free parameter.
    #[must_use]
    pub fn new(index: usize, name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            index,
            name: name.into(),
            ty,
            nullable: false,
            is_value_type: false,
            attributes: Vec::new(),
            is_collection: false,
            element_type: None,
        }
    }

    /// Marks the parameter as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the parameter type as a value type.
    #[must_use]
    pub fn value_type(mut self) -> Self {
        self.is_value_type = true;
        self
    }

    /// Marks the parameter as a collection of `element`.
    #[must_use]
    pub fn collection_of(mut self, element: TypeRef) -> Self {
        self.is_collection = true;
        self.element_type = Some(element);
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeInstance) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Returns the first attribute of the given kind.
    #[must_use]
    pub fn attribute(&self, kind: AttributeKind) -> Option<&AttributeInstance> {
        self.attributes.iter().find(|a| a.kind == kind)
    }

    /// Returns true if an attribute of the given kind is present.
    #[must_use]
    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attribute(kind).is_some()
    }

    /// Returns the distinct source families named by explicit attributes.
    #[must_use]
    pub fn explicit_families(&self) -> BTreeSet<AttributeKind> {
        self.attributes.iter().map(|a| a.kind.family()).collect()
    }

    /// Returns the declared type as written, including the optional wrapper.
    #[must_use]
    pub fn display_type(&self) -> String {
        if self.nullable {
            format!("Option<{}>", self.ty.name)
        } else {
            self.ty.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_name_and_key() {
        let attr = AttributeInstance::new(AttributeKind::KeyedService)
            .with_arg("key", "primary")
            .with_arg("name", 7i64);

        assert_eq!(attr.key(), Some("primary"));
        assert_eq!(attr.name(), None);
    }

    #[test]
    fn test_explicit_families_merge_service_kinds() {
        let sig = ParameterSignature::new(0, "repo", TypeRef::named("Repo"))
            .with_attribute(AttributeInstance::new(AttributeKind::Service))
            .with_attribute(AttributeInstance::new(AttributeKind::KeyedService));

        assert_eq!(sig.explicit_families().len(), 1);
    }

    #[test]
    fn test_display_type_wraps_nullable() {
        let sig = ParameterSignature::new(0, "id", TypeRef::named("i32")).nullable();
        assert_eq!(sig.display_type(), "Option<i32>");
    }

    #[test]
    fn test_signature_serializes_type_field() {
        let sig = ParameterSignature::new(1, "name", TypeRef::named("String"));
        let json = serde_json::to_value(&sig).unwrap();
        assert_eq!(json["type"]["name"], "String");
        assert_eq!(json["index"], 1);
    }
}
