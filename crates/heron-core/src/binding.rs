//! Binding decisions produced by the parameter classifier.

use serde::{Deserialize, Serialize};

use crate::signature::ParameterSignature;

/// Where a parameter's value comes from at invocation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum BindingSource {
    /// A route segment with the given name.
    Route(String),
    /// A query-string key.
    Query(String),
    /// A request header.
    Header(String),
    /// The deserialized request body.
    Body,
    /// A form field.
    Form(String),
    /// A service from the dependency container.
    Service,
    /// A keyed service from the dependency container.
    KeyedService(String),
    /// A parameter object whose constructor arguments are bound individually.
    ParameterObject(Vec<ParameterDescriptor>),
    /// The request context itself.
    SpecialContext,
    /// The request's cancellation signal.
    SpecialCancellation,
    /// A single uploaded file.
    FormFile(String),
    /// All uploaded files.
    FormFiles(String),
    /// The raw form field collection.
    FormCollection(String),
    /// The raw request body stream.
    Stream,
    /// The incremental request body reader.
    PipeReader,
}

/// Request-body consumers; at most one group may appear per handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyGroup {
    /// Deserialized body.
    Body,
    /// Any form-sourced value.
    Form,
    /// Raw body stream.
    Stream,
    /// Incremental body reader.
    PipeReader,
}

impl BodyGroup {
    /// Short label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Form => "form",
            Self::Stream => "stream",
            Self::PipeReader => "body reader",
        }
    }
}

impl BindingSource {
    /// Returns the body group this source consumes, if any.
    #[must_use]
    pub const fn body_group(&self) -> Option<BodyGroup> {
        match self {
            Self::Body => Some(BodyGroup::Body),
            Self::Form(_) | Self::FormFile(_) | Self::FormFiles(_) | Self::FormCollection(_) => {
                Some(BodyGroup::Form)
            }
            Self::Stream => Some(BodyGroup::Stream),
            Self::PipeReader => Some(BodyGroup::PipeReader),
            _ => None,
        }
    }

    /// Returns the route parameter name, for route sources.
    #[must_use]
    pub fn route_name(&self) -> Option<&str> {
        match self {
            Self::Route(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the children of a parameter object.
    #[must_use]
    pub fn children(&self) -> &[ParameterDescriptor] {
        match self {
            Self::ParameterObject(children) => children,
            _ => &[],
        }
    }

    /// Short label used in logs and diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Route(_) => "route",
            Self::Query(_) => "query",
            Self::Header(_) => "header",
            Self::Body => "body",
            Self::Form(_) => "form",
            Self::Service => "service",
            Self::KeyedService(_) => "keyed_service",
            Self::ParameterObject(_) => "parameter_object",
            Self::SpecialContext => "context",
            Self::SpecialCancellation => "cancellation",
            Self::FormFile(_) => "form_file",
            Self::FormFiles(_) => "form_files",
            Self::FormCollection(_) => "form_collection",
            Self::Stream => "stream",
            Self::PipeReader => "pipe_reader",
        }
    }
}

/// Custom binding convention used to materialize a value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BindingProtocol {
    /// Built-in conversion (primitives, body deserialization, services).
    #[default]
    None,
    /// Two-argument string parsing.
    Parse,
    /// Three-argument string parsing with a format provider.
    ParseWithFormat,
    /// Async factory taking the request context.
    AsyncFactory,
    /// Async factory taking the request context and parameter metadata.
    AsyncFactoryWithMetadata,
    /// Type implements the bindable-from-request marker.
    Bindable,
}

/// The classifier's decision for one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// The parameter as declared.
    pub signature: ParameterSignature,
    /// Where its value comes from.
    pub source: BindingSource,
    /// Custom binding convention, if any.
    #[serde(default)]
    pub protocol: BindingProtocol,
}

impl ParameterDescriptor {
    /// Creates a descriptor with no custom protocol.
    #[must_use]
    pub fn new(signature: ParameterSignature, source: BindingSource) -> Self {
        Self {
            signature,
            source,
            protocol: BindingProtocol::None,
        }
    }

    /// Sets the custom protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: BindingProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Returns this descriptor followed by all nested children, depth first.
    #[must_use]
    pub fn flatten(&self) -> Vec<&ParameterDescriptor> {
        let mut out = vec![self];
        for child in self.source.children() {
            out.extend(child.flatten());
        }
        out
    }

    /// Returns the leaf descriptors: children of parameter objects, or self.
    #[must_use]
    pub fn leaves(&self) -> Vec<&ParameterDescriptor> {
        match &self.source {
            BindingSource::ParameterObject(children) => {
                children.iter().flat_map(ParameterDescriptor::leaves).collect()
            }
            _ => vec![self],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRef;

    fn sig(name: &str) -> ParameterSignature {
        ParameterSignature::new(0, name, TypeRef::named("i32"))
    }

    #[test]
    fn test_body_groups() {
        assert_eq!(BindingSource::Body.body_group(), Some(BodyGroup::Body));
        assert_eq!(
            BindingSource::FormFile("avatar".into()).body_group(),
            Some(BodyGroup::Form)
        );
        assert_eq!(BindingSource::PipeReader.body_group(), Some(BodyGroup::PipeReader));
        assert_eq!(BindingSource::Service.body_group(), None);
        assert_eq!(BindingSource::Query("q".into()).body_group(), None);
    }

    #[test]
    fn test_leaves_of_parameter_object() {
        let children = vec![
            ParameterDescriptor::new(sig("page"), BindingSource::Query("page".into())),
            ParameterDescriptor::new(sig("id"), BindingSource::Route("id".into())),
        ];
        let parent = ParameterDescriptor::new(sig("args"), BindingSource::ParameterObject(children));

        let leaves = parent.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[1].source.route_name(), Some("id"));
        assert_eq!(parent.flatten().len(), 3);
    }

    #[test]
    fn test_source_serialization_is_tagged() {
        let json = serde_json::to_value(BindingSource::Header("X-Trace".into())).unwrap();
        assert_eq!(json["source"], "header");
        assert_eq!(json["value"], "X-Trace");
    }
}
