//! Parameter classification.

use heron_core::{
    AnalysisTables, BindingSource, ClassificationResult, Diagnostic, ParameterDescriptor,
    ParameterSignature,
};
use heron_route::RouteParameters;
use http::Method;
use tracing::{debug, trace};

use crate::rules::{Context, RULES};
use crate::validate;

/// Decides where one parameter's value comes from.
///
/// The first applicable rule of the priority chain wins:
///
/// 1. `expand` builds a parameter object from the widest public constructor
/// 2. `body`, `form`, `service`, `header`, `route`, `query` honour explicit attributes
/// 3. request context and cancellation types bind by identity
/// 4. uploaded files, form maps, body streams and body readers bind implicitly
/// 5. a name matching a route parameter binds from the route
/// 6. primitives and collections of primitives bind from the query string
/// 7. types with a custom binding protocol bind through it
/// 8. data objects with a public constructor bind from the body
/// 9. everything else is resolved from the dependency container
///
/// Step 8 assumes a body-carrying request; use [`classify_for`] when the
/// handler's verb is known.
///
/// # Example
///
/// ```
/// use heron_bind::classify;
/// use heron_core::{AnalysisTables, BindingSource, ParameterSignature, TypeRef};
///
/// let route = heron_route::parse("/users/{id}");
/// let sig = ParameterSignature::new(0, "id", TypeRef::named("u64"));
///
/// let desc = classify(&sig, &route.parameters, &AnalysisTables::builtin()).unwrap();
/// assert_eq!(desc.source, BindingSource::Route("id".into()));
/// ```
pub fn classify(
    signature: &ParameterSignature,
    route: &RouteParameters,
    tables: &AnalysisTables,
) -> ClassificationResult<ParameterDescriptor> {
    classify_at(&Context {
        sig: signature,
        route,
        tables,
        depth: 0,
        parent: None,
        body_verb: true,
    })
}

/// Like [`classify`], for a handler serving `method`.
///
/// Only `POST`, `PUT` and `PATCH` infer a request body from a data object;
/// on any other verb such a parameter is resolved from the dependency
/// container.
pub fn classify_for(
    method: &Method,
    signature: &ParameterSignature,
    route: &RouteParameters,
    tables: &AnalysisTables,
) -> ClassificationResult<ParameterDescriptor> {
    classify_at(&Context {
        sig: signature,
        route,
        tables,
        depth: 0,
        parent: None,
        body_verb: carries_body(method),
    })
}

fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

pub(crate) fn classify_at(cx: &Context<'_>) -> ClassificationResult<ParameterDescriptor> {
    let Some(rule) = RULES.iter().find(|rule| (rule.applies)(cx)) else {
        return Ok(cx.descriptor(BindingSource::Service));
    };
    let descriptor = (rule.bind)(cx)?;
    trace!(
        parameter = %cx.sig.name,
        rule = rule.name,
        source = descriptor.source.label(),
        protocol = ?descriptor.protocol,
        "classified parameter"
    );
    Ok(descriptor)
}

/// Classification of a whole parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBindings {
    /// One descriptor per handler parameter, in declaration order.
    pub descriptors: Vec<ParameterDescriptor>,
    /// Classification and validation diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParameterBindings {
    /// Returns true if no error was reported.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Classifies every parameter of `handler` and runs the validation passes.
///
/// A parameter that fails classification is bound to
/// [`BindingSource::Service`] and its error is reported.
pub fn classify_handler(
    handler: &str,
    method: &Method,
    parameters: &[ParameterSignature],
    route: &RouteParameters,
    tables: &AnalysisTables,
) -> ParameterBindings {
    let mut diagnostics = Vec::new();
    let descriptors: Vec<_> = parameters
        .iter()
        .map(|sig| match classify_for(method, sig, route, tables) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                debug!(
                    handler,
                    parameter = %sig.name,
                    error = %err,
                    "parameter falls back to the dependency container"
                );
                diagnostics.push(err.to_diagnostic(handler, &sig.name));
                ParameterDescriptor::new(sig.clone(), BindingSource::Service)
            }
        })
        .collect();

    diagnostics.extend(validate::ambiguity(handler, parameters));
    diagnostics.extend(validate::body_exclusivity(handler, &descriptors));
    diagnostics.extend(validate::constraints(handler, &descriptors, route, tables));
    diagnostics.extend(validate::completeness(handler, &descriptors, route));

    ParameterBindings {
        descriptors,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use heron_core::{
        AttributeInstance, AttributeKind, BindingProtocol, ClassificationError, Constructor,
        DiagnosticCode, FactoryShape, ParseShape, TypeRef,
    };

    use super::*;

    fn tables() -> AnalysisTables {
        AnalysisTables::builtin()
    }

    fn sig(name: &str, ty: &str) -> ParameterSignature {
        ParameterSignature::new(0, name, TypeRef::named(ty))
    }

    fn attr(kind: AttributeKind) -> AttributeInstance {
        AttributeInstance::new(kind)
    }

    fn source(sig: &ParameterSignature, template: &str) -> BindingSource {
        let route = heron_route::parse(template);
        classify(sig, &route.parameters, &tables()).unwrap().source
    }

    #[test]
    fn test_body_and_service_without_attributes() {
        let dto = TypeRef::named("CreateRequest").with_constructor(Constructor::public(vec![
            sig("name", "String"),
            sig("email", "String"),
        ]));
        let body = ParameterSignature::new(0, "body", dto);
        assert_eq!(source(&body, "/users"), BindingSource::Body);

        let svc = sig("svc", "Arc<dyn UserService>");
        assert_eq!(source(&svc, "/users"), BindingSource::Service);
    }

    #[test]
    fn test_body_inference_follows_the_verb() {
        let route = heron_route::parse("/users/{id}");
        let dto = TypeRef::named("UpdateRequest")
            .with_constructor(Constructor::public(vec![sig("name", "String")]));
        let body = ParameterSignature::new(1, "body", dto);

        for method in [Method::POST, Method::PUT, Method::PATCH] {
            let desc = classify_for(&method, &body, &route.parameters, &tables()).unwrap();
            assert_eq!(desc.source, BindingSource::Body, "{method}");
        }
        for method in [Method::GET, Method::DELETE, Method::HEAD] {
            let desc = classify_for(&method, &body, &route.parameters, &tables()).unwrap();
            assert_eq!(desc.source, BindingSource::Service, "{method}");
        }
    }

    #[test]
    fn test_body_inference_skips_non_dto_shapes() {
        let route = RouteParameters::new();
        let post = |sig: &ParameterSignature| {
            classify_for(&Method::POST, sig, &route, &tables()).unwrap().source
        };

        let hidden = TypeRef::named("Hidden").with_constructor(Constructor::private(vec![]));
        assert_eq!(post(&ParameterSignature::new(0, "h", hidden)), BindingSource::Service);

        let item = TypeRef::named("Item").with_constructor(Constructor::public(vec![]));
        let many = sig("items", "Vec<Item>").collection_of(item);
        assert_eq!(post(&many), BindingSource::Service);

        let session = TypeRef::named("Session")
            .with_constructor(Constructor::public(vec![]))
            .with_async_factory(FactoryShape::Context);
        let session = ParameterSignature::new(0, "s", session);
        let desc = classify_for(&Method::POST, &session, &route, &tables()).unwrap();
        assert_eq!(desc.protocol, BindingProtocol::AsyncFactory);
    }

    #[test]
    fn test_single_body_per_handler() {
        let dto = |name: &str| {
            TypeRef::named(name).with_constructor(Constructor::public(vec![sig("x", "i32")]))
        };
        let params = vec![
            ParameterSignature::new(0, "a", dto("A")),
            ParameterSignature::new(1, "b", dto("B")),
        ];
        let route = RouteParameters::new();
        let bindings = classify_handler("create", &Method::POST, &params, &route, &tables());
        assert_eq!(bindings.descriptors[0].source, BindingSource::Body);
        assert_eq!(bindings.descriptors[1].source, BindingSource::Body);
        assert_eq!(bindings.diagnostics[0].code, DiagnosticCode::MultipleBodySources);

        let bindings = classify_handler("list", &Method::GET, &params, &route, &tables());
        assert!(bindings.is_valid());
    }

    #[test]
    fn test_explicit_attributes_beat_implicit_rules() {
        // Name matches the route, but the header attribute wins.
        let header = sig("id", "String")
            .with_attribute(attr(AttributeKind::Header).with_arg("name", "X-Id"));
        assert_eq!(source(&header, "/items/{id}"), BindingSource::Header("X-Id".into()));

        let query = sig("id", "i32").with_attribute(attr(AttributeKind::Query));
        assert_eq!(source(&query, "/items/{id}"), BindingSource::Query("id".into()));
    }

    #[test]
    fn test_keyed_service_uses_key() {
        let keyed = sig("cache", "Cache")
            .with_attribute(attr(AttributeKind::KeyedService).with_arg("key", "redis"));
        assert_eq!(source(&keyed, "/"), BindingSource::KeyedService("redis".into()));

        let plain = sig("cache", "Cache").with_attribute(attr(AttributeKind::Service));
        assert_eq!(source(&plain, "/"), BindingSource::Service);
    }

    #[test]
    fn test_explicit_route_requires_parseable_type() {
        let route = heron_route::parse("/items/{item}");
        let bad = sig("filter", "Filter")
            .with_attribute(attr(AttributeKind::Route).with_arg("name", "item"));
        let err = classify(&bad, &route.parameters, &tables()).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::UnsupportedRouteType {
                parameter: "filter".into(),
                type_name: "Filter".into()
            }
        );

        let good = ParameterSignature::new(
            0,
            "item",
            TypeRef::named("ItemId").with_parse(ParseShape::Plain),
        )
        .with_attribute(attr(AttributeKind::Route));
        let desc = classify(&good, &route.parameters, &tables()).unwrap();
        assert_eq!(desc.source, BindingSource::Route("item".into()));
        assert_eq!(desc.protocol, BindingProtocol::Parse);
    }

    #[test]
    fn test_explicit_query_rejects_complex_type() {
        let bad = sig("filter", "Filter").with_attribute(attr(AttributeKind::Query));
        let err = classify(&bad, &RouteParameters::new(), &tables()).unwrap_err();
        assert_eq!(err.code(), DiagnosticCode::UnsupportedBindingType);

        let tags = sig("tags", "Vec<String>")
            .collection_of(TypeRef::named("String"))
            .with_attribute(attr(AttributeKind::Query).with_arg("name", "tag"));
        assert_eq!(source(&tags, "/"), BindingSource::Query("tag".into()));
    }

    #[test]
    fn test_special_types() {
        assert_eq!(source(&sig("ctx", "RequestContext"), "/"), BindingSource::SpecialContext);
        assert_eq!(
            source(&sig("cancel", "CancellationToken"), "/"),
            BindingSource::SpecialCancellation
        );
    }

    #[test]
    fn test_implicit_file_like_types() {
        assert_eq!(
            source(&sig("file", "UploadedFile"), "/"),
            BindingSource::FormFile("file".into())
        );
        let files = sig("files", "Vec<UploadedFile>").collection_of(TypeRef::named("UploadedFile"));
        assert_eq!(source(&files, "/"), BindingSource::FormFiles("files".into()));
        assert_eq!(
            source(&sig("all", "UploadedFiles"), "/"),
            BindingSource::FormFiles("all".into())
        );
        assert_eq!(
            source(&sig("fields", "FormFields"), "/"),
            BindingSource::FormCollection("fields".into())
        );
        assert_eq!(source(&sig("raw", "BodyStream"), "/"), BindingSource::Stream);
        assert_eq!(source(&sig("reader", "BodyReader"), "/"), BindingSource::PipeReader);
    }

    #[test]
    fn test_route_name_match_is_case_insensitive() {
        assert_eq!(
            source(&sig("userid", "i64"), "/users/{userId}"),
            BindingSource::Route("userId".into())
        );
    }

    #[test]
    fn test_route_name_match_rejects_complex_type() {
        let route = heron_route::parse("/users/{user}");
        let err = classify(&sig("user", "User"), &route.parameters, &tables()).unwrap_err();
        assert!(matches!(err, ClassificationError::UnsupportedRouteType { .. }));
    }

    #[test]
    fn test_primitives_bind_from_query() {
        assert_eq!(source(&sig("page", "u32"), "/"), BindingSource::Query("page".into()));
        let nullable = sig("q", "String").nullable();
        assert_eq!(source(&nullable, "/"), BindingSource::Query("q".into()));
        let color = ParameterSignature::new(0, "color", TypeRef::enumeration("Color"));
        assert_eq!(source(&color, "/"), BindingSource::Query("color".into()));
    }

    #[test]
    fn test_custom_protocols() {
        let route = heron_route::parse("/orders/{order}");

        let parse = ParameterSignature::new(
            0,
            "cursor",
            TypeRef::named("Cursor").with_parse(ParseShape::Plain),
        );
        let desc = classify(&parse, &route.parameters, &tables()).unwrap();
        assert_eq!(desc.source, BindingSource::Query("cursor".into()));
        assert_eq!(desc.protocol, BindingProtocol::Parse);

        let factory = ParameterSignature::new(
            0,
            "session",
            TypeRef::named("Session").with_async_factory(FactoryShape::Context),
        );
        let desc = classify(&factory, &route.parameters, &tables()).unwrap();
        assert_eq!(desc.source, BindingSource::Query("session".into()));
        assert_eq!(desc.protocol, BindingProtocol::AsyncFactory);

        let order = ParameterSignature::new(
            0,
            "order",
            TypeRef::named("OrderId").with_parse(ParseShape::WithFormat),
        );
        let desc = classify(&order, &route.parameters, &tables()).unwrap();
        assert_eq!(desc.source, BindingSource::Route("order".into()));
        assert_eq!(desc.protocol, BindingProtocol::ParseWithFormat);
    }

    #[test]
    fn test_expand_builds_parameter_object() {
        let route = heron_route::parse("/orgs/{org}/members");
        let paging = TypeRef::named("MemberQuery").with_constructor(Constructor::public(vec![
            ParameterSignature::new(0, "org", TypeRef::named("String")),
            ParameterSignature::new(1, "page", TypeRef::named("u32")),
            ParameterSignature::new(2, "auth", TypeRef::named("String"))
                .with_attribute(attr(AttributeKind::Header).with_arg("name", "Authorization")),
        ]));
        let args = ParameterSignature::new(0, "args", paging)
            .with_attribute(attr(AttributeKind::Expand));

        let desc = classify(&args, &route.parameters, &tables()).unwrap();
        let children = desc.source.children();
        assert_eq!(children[0].source, BindingSource::Route("org".into()));
        assert_eq!(children[1].source, BindingSource::Query("page".into()));
        assert_eq!(children[2].source, BindingSource::Header("Authorization".into()));
    }

    #[test]
    fn test_expand_rejects_nesting_and_missing_constructors() {
        let inner = TypeRef::named("Inner").with_constructor(Constructor::public(vec![sig(
            "x", "i32",
        )]));
        let outer = TypeRef::named("Outer").with_constructor(Constructor::public(vec![
            ParameterSignature::new(0, "inner", inner).with_attribute(attr(AttributeKind::Expand)),
        ]));
        let nested = ParameterSignature::new(0, "outer", outer)
            .with_attribute(attr(AttributeKind::Expand));
        assert_eq!(
            classify(&nested, &RouteParameters::new(), &tables()).unwrap_err(),
            ClassificationError::NestedParameterObject {
                parameter: "inner".into(),
                parent: "outer".into()
            }
        );

        let hidden = ParameterSignature::new(
            0,
            "args",
            TypeRef::named("Hidden").with_constructor(Constructor::private(vec![sig("a", "i32")])),
        )
        .with_attribute(attr(AttributeKind::Expand));
        assert!(matches!(
            classify(&hidden, &RouteParameters::new(), &tables()),
            Err(ClassificationError::NoPublicConstructor { .. })
        ));

        let empty = ParameterSignature::new(
            0,
            "args",
            TypeRef::named("Unit").with_constructor(Constructor::public(vec![])),
        )
        .with_attribute(attr(AttributeKind::Expand));
        assert!(matches!(
            classify(&empty, &RouteParameters::new(), &tables()),
            Err(ClassificationError::EmptyConstructor { .. })
        ));
    }

    #[test]
    fn test_classify_handler_falls_back_to_service() {
        let route = heron_route::parse("/search");
        let params = vec![
            sig("filter", "Filter").with_attribute(attr(AttributeKind::Query)),
            sig("page", "u32"),
        ];
        let bindings =
            classify_handler("search", &Method::GET, &params, &route.parameters, &tables());

        assert_eq!(bindings.descriptors[0].source, BindingSource::Service);
        assert_eq!(bindings.descriptors[1].source, BindingSource::Query("page".into()));
        assert_eq!(bindings.diagnostics.len(), 1);
        assert_eq!(
            bindings.diagnostics[0].location.parameter.as_deref(),
            Some("filter")
        );
        assert!(!bindings.is_valid());
    }

    #[test]
    fn test_alternate_tables() {
        let custom = AnalysisTables::builtin().with_types(
            heron_core::TypeTable::builtin().with_primitive("Money"),
        );
        let route = RouteParameters::new();
        let desc = classify(&sig("price", "Money"), &route, &custom).unwrap();
        assert_eq!(desc.source, BindingSource::Query("price".into()));

        let desc = classify(&sig("price", "Money"), &route, &tables()).unwrap();
        assert_eq!(desc.source, BindingSource::Service);
    }
}
