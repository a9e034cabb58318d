//! The binding priority chain.
//!
//! Rules are evaluated top to bottom and the first applicable rule decides.
//! The table is data so the order can be read, and tested, in one place.

use heron_core::{
    AnalysisTables, AttributeKind, BindingProtocol, BindingSource, ClassificationError,
    ClassificationResult, FactoryShape, ParameterDescriptor, ParameterSignature, ParseShape,
    TypeRef, WellKnownType,
};
use heron_route::{RouteParameter, RouteParameters};

use crate::classifier::classify_at;
use crate::forms;

/// Maximum expansion depth: handler parameter objects may not nest.
pub(crate) const MAX_EXPANSION_DEPTH: usize = 1;

/// Inputs shared by every rule.
pub(crate) struct Context<'a> {
    pub sig: &'a ParameterSignature,
    pub route: &'a RouteParameters,
    pub tables: &'a AnalysisTables,
    /// Zero for handler parameters, one inside a parameter object.
    pub depth: usize,
    /// Enclosing parameter, inside a parameter object.
    pub parent: Option<&'a str>,
    /// Whether the handler's verb carries a request body.
    pub body_verb: bool,
}

impl<'a> Context<'a> {
    pub(crate) fn child(&self, sig: &'a ParameterSignature, parent: &'a str) -> Self {
        Self {
            sig,
            route: self.route,
            tables: self.tables,
            depth: self.depth + 1,
            parent: Some(parent),
            body_verb: self.body_verb,
        }
    }

    /// Binding name: the attribute's `name` override, else the declared name.
    pub(crate) fn name_for(&self, kind: AttributeKind) -> String {
        self.sig
            .attribute(kind)
            .and_then(|a| a.name())
            .unwrap_or(&self.sig.name)
            .to_string()
    }

    pub(crate) fn well_known(&self) -> Option<WellKnownType> {
        self.tables.types.well_known(&self.sig.ty)
    }

    pub(crate) fn is_primitive(&self) -> bool {
        !self.sig.is_collection && self.tables.types.is_primitive(&self.sig.ty)
    }

    pub(crate) fn is_primitive_collection(&self) -> bool {
        self.sig.is_collection
            && self
                .sig
                .element_type
                .as_ref()
                .is_some_and(|el| self.tables.types.is_primitive(el))
    }

    pub(crate) fn element_is(&self, kind: WellKnownType) -> bool {
        self.sig.is_collection
            && self
                .sig
                .element_type
                .as_ref()
                .is_some_and(|el| self.tables.types.well_known(el) == Some(kind))
    }

    pub(crate) fn route_match(&self) -> Option<&'a RouteParameter> {
        self.route.get(&self.sig.name)
    }

    pub(crate) fn descriptor(&self, source: BindingSource) -> ParameterDescriptor {
        ParameterDescriptor::new(self.sig.clone(), source)
    }
}

/// One entry of the priority chain.
pub(crate) struct Rule {
    pub name: &'static str,
    pub applies: fn(&Context<'_>) -> bool,
    pub bind: fn(&Context<'_>) -> ClassificationResult<ParameterDescriptor>,
}

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "expand",
        applies: |cx| cx.sig.has_attribute(AttributeKind::Expand),
        bind: expand,
    },
    Rule {
        name: "body",
        applies: |cx| cx.sig.has_attribute(AttributeKind::Body),
        bind: |cx| Ok(cx.descriptor(BindingSource::Body)),
    },
    Rule {
        name: "form",
        applies: |cx| cx.sig.has_attribute(AttributeKind::Form),
        bind: forms::bind,
    },
    Rule {
        name: "service",
        applies: |cx| {
            cx.sig.has_attribute(AttributeKind::Service)
                || cx.sig.has_attribute(AttributeKind::KeyedService)
        },
        bind: service,
    },
    Rule {
        name: "header",
        applies: |cx| cx.sig.has_attribute(AttributeKind::Header),
        bind: |cx| {
            Ok(cx
                .descriptor(BindingSource::Header(cx.name_for(AttributeKind::Header)))
                .with_protocol(parse_protocol(&cx.sig.ty)))
        },
    },
    Rule {
        name: "route",
        applies: |cx| cx.sig.has_attribute(AttributeKind::Route),
        bind: |cx| route(cx, cx.name_for(AttributeKind::Route)),
    },
    Rule {
        name: "query",
        applies: |cx| cx.sig.has_attribute(AttributeKind::Query),
        bind: explicit_query,
    },
    Rule {
        name: "special",
        applies: |cx| {
            matches!(
                cx.well_known(),
                Some(WellKnownType::RequestContext | WellKnownType::Cancellation)
            )
        },
        bind: special,
    },
    Rule {
        name: "file_like",
        applies: |cx| file_like(cx).is_some(),
        bind: |cx| match file_like(cx) {
            Some(source) => Ok(cx.descriptor(source)),
            None => Ok(cx.descriptor(BindingSource::Service)),
        },
    },
    Rule {
        name: "route_name",
        applies: |cx| cx.route_match().is_some(),
        bind: |cx| {
            let name = cx
                .route_match()
                .map_or_else(|| cx.sig.name.clone(), |p| p.name.clone());
            route(cx, name)
        },
    },
    Rule {
        name: "primitive",
        applies: |cx| cx.is_primitive() || cx.is_primitive_collection(),
        bind: |cx| Ok(cx.descriptor(BindingSource::Query(cx.sig.name.clone()))),
    },
    Rule {
        name: "custom_protocol",
        applies: |cx| custom_protocol(&cx.sig.ty).is_some(),
        bind: custom,
    },
    Rule {
        name: "implicit_body",
        applies: implicit_body,
        bind: |cx| Ok(cx.descriptor(BindingSource::Body)),
    },
    Rule {
        name: "fallback",
        applies: |_| true,
        bind: |cx| Ok(cx.descriptor(BindingSource::Service)),
    },
];

/// A data object on a body-carrying verb is the request body.
///
/// Only handler parameters qualify. The type must be a plain DTO: not a
/// collection, with a public constructor and no custom protocol. Trait objects
/// and other types without a constructor stay with the dependency container.
fn implicit_body(cx: &Context<'_>) -> bool {
    cx.body_verb
        && cx.depth == 0
        && !cx.sig.is_collection
        && cx.sig.ty.widest_public_constructor().is_some()
        && custom_protocol(&cx.sig.ty).is_none()
}

/// Returns the parse protocol of a parse-capable type, else `None`.
pub(crate) fn parse_protocol(ty: &TypeRef) -> BindingProtocol {
    match ty.capabilities.parse {
        Some(ParseShape::Plain) => BindingProtocol::Parse,
        Some(ParseShape::WithFormat) => BindingProtocol::ParseWithFormat,
        None => BindingProtocol::None,
    }
}

/// Custom protocol lookup order: parse, bindable, async factory.
fn custom_protocol(ty: &TypeRef) -> Option<BindingProtocol> {
    let caps = &ty.capabilities;
    match (caps.parse, caps.bindable, caps.async_factory) {
        (Some(_), _, _) => Some(parse_protocol(ty)),
        (None, true, _) => Some(BindingProtocol::Bindable),
        (None, false, Some(FactoryShape::Context)) => Some(BindingProtocol::AsyncFactory),
        (None, false, Some(FactoryShape::ContextWithMetadata)) => {
            Some(BindingProtocol::AsyncFactoryWithMetadata)
        }
        (None, false, None) => None,
    }
}

fn expand(cx: &Context<'_>) -> ClassificationResult<ParameterDescriptor> {
    if cx.depth >= MAX_EXPANSION_DEPTH {
        return Err(ClassificationError::NestedParameterObject {
            parameter: cx.sig.name.clone(),
            parent: cx.parent.unwrap_or_default().to_string(),
        });
    }

    let ctor = cx.sig.ty.widest_public_constructor().ok_or_else(|| {
        ClassificationError::NoPublicConstructor {
            parameter: cx.sig.name.clone(),
            type_name: cx.sig.ty.name.clone(),
        }
    })?;
    if ctor.parameters.is_empty() {
        return Err(ClassificationError::EmptyConstructor {
            parameter: cx.sig.name.clone(),
            type_name: cx.sig.ty.name.clone(),
        });
    }

    let children = ctor
        .parameters
        .iter()
        .map(|child| classify_at(&cx.child(child, &cx.sig.name)))
        .collect::<ClassificationResult<Vec<_>>>()?;

    Ok(cx.descriptor(BindingSource::ParameterObject(children)))
}

fn service(cx: &Context<'_>) -> ClassificationResult<ParameterDescriptor> {
    let source = match cx.sig.attribute(AttributeKind::KeyedService) {
        Some(attr) => {
            BindingSource::KeyedService(attr.key().unwrap_or(&cx.sig.name).to_string())
        }
        None => BindingSource::Service,
    };
    Ok(cx.descriptor(source))
}

fn route(cx: &Context<'_>, name: String) -> ClassificationResult<ParameterDescriptor> {
    if cx.is_primitive() {
        Ok(cx.descriptor(BindingSource::Route(name)))
    } else if !cx.sig.is_collection && cx.sig.ty.is_parse_capable() {
        Ok(cx
            .descriptor(BindingSource::Route(name))
            .with_protocol(parse_protocol(&cx.sig.ty)))
    } else {
        Err(ClassificationError::UnsupportedRouteType {
            parameter: cx.sig.name.clone(),
            type_name: cx.sig.display_type(),
        })
    }
}

fn explicit_query(cx: &Context<'_>) -> ClassificationResult<ParameterDescriptor> {
    if cx.is_primitive() || cx.is_primitive_collection() {
        Ok(cx.descriptor(BindingSource::Query(cx.name_for(AttributeKind::Query))))
    } else {
        Err(ClassificationError::UnsupportedQueryType {
            parameter: cx.sig.name.clone(),
            type_name: cx.sig.display_type(),
        })
    }
}

fn special(cx: &Context<'_>) -> ClassificationResult<ParameterDescriptor> {
    let source = match cx.well_known() {
        Some(WellKnownType::Cancellation) => BindingSource::SpecialCancellation,
        _ => BindingSource::SpecialContext,
    };
    Ok(cx.descriptor(source))
}

/// Implicit sources for file-like runtime types.
pub(crate) fn file_like(cx: &Context<'_>) -> Option<BindingSource> {
    let name = || cx.sig.name.clone();
    if cx.element_is(WellKnownType::FormFile) {
        return Some(BindingSource::FormFiles(name()));
    }
    if cx.sig.is_collection {
        return None;
    }
    match cx.well_known()? {
        WellKnownType::FormFile => Some(BindingSource::FormFile(name())),
        WellKnownType::FormFileCollection => Some(BindingSource::FormFiles(name())),
        WellKnownType::FormCollection => Some(BindingSource::FormCollection(name())),
        WellKnownType::BodyStream => Some(BindingSource::Stream),
        WellKnownType::BodyReader => Some(BindingSource::PipeReader),
        WellKnownType::RequestContext | WellKnownType::Cancellation => None,
    }
}

fn custom(cx: &Context<'_>) -> ClassificationResult<ParameterDescriptor> {
    let protocol = custom_protocol(&cx.sig.ty).unwrap_or_default();
    let parse_kind = matches!(
        protocol,
        BindingProtocol::Parse | BindingProtocol::ParseWithFormat
    );
    let source = match cx.route_match() {
        Some(param) if parse_kind => BindingSource::Route(param.name.clone()),
        _ => BindingSource::Query(cx.sig.name.clone()),
    };
    Ok(cx.descriptor(source).with_protocol(protocol))
}
