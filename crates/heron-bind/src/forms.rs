//! Sub-rules for form-bound parameters.
//!
//! Form DTOs become parameter objects whose children are all form-sourced.
//! Anything the rules cannot resolve (a complex child field, a DTO without a
//! usable constructor, a DTO inside a parameter object) binds as a plain
//! form value and is left to the runtime binder.

use heron_core::{AttributeKind, BindingSource, ClassificationResult, ParameterDescriptor};
use tracing::trace;

use crate::rules::{file_like, parse_protocol, Context};

/// Binds a parameter carrying the form attribute.
pub(crate) fn bind(cx: &Context<'_>) -> ClassificationResult<ParameterDescriptor> {
    let name = cx.name_for(AttributeKind::Form);
    if let Some(source) = form_file(cx, &name) {
        return Ok(cx.descriptor(source));
    }
    if let Some(descriptor) = form_value(cx, name.clone()) {
        return Ok(descriptor);
    }

    let ctor = cx
        .sig
        .ty
        .widest_public_constructor()
        .filter(|c| !c.parameters.is_empty());
    let Some(ctor) = ctor.filter(|_| cx.depth == 0) else {
        trace!(parameter = %cx.sig.name, "form object bound by the runtime binder");
        return Ok(cx.descriptor(BindingSource::Form(name)));
    };

    let children = ctor
        .parameters
        .iter()
        .map(|field| form_child(&cx.child(field, &cx.sig.name)))
        .collect();
    Ok(cx.descriptor(BindingSource::ParameterObject(children)))
}

/// Binds one field of a form DTO.
fn form_child(cx: &Context<'_>) -> ParameterDescriptor {
    let name = cx.name_for(AttributeKind::Form);
    if let Some(source) = form_file(cx, &name) {
        return cx.descriptor(source);
    }
    form_value(cx, name.clone()).unwrap_or_else(|| {
        trace!(
            parameter = %cx.sig.name,
            parent = cx.parent.unwrap_or_default(),
            "complex form field bound by the runtime binder"
        );
        cx.descriptor(BindingSource::Form(name))
    })
}

fn form_file(cx: &Context<'_>, name: &str) -> Option<BindingSource> {
    let source = file_like(cx)?;
    Some(match source {
        BindingSource::FormFile(_) => BindingSource::FormFile(name.to_string()),
        BindingSource::FormFiles(_) => BindingSource::FormFiles(name.to_string()),
        BindingSource::FormCollection(_) => BindingSource::FormCollection(name.to_string()),
        // Streams and readers are not form values.
        _ => return None,
    })
}

fn form_value(cx: &Context<'_>, name: String) -> Option<ParameterDescriptor> {
    let simple = cx.is_primitive() || cx.is_primitive_collection();
    let parsed = !cx.sig.is_collection && cx.sig.ty.is_parse_capable();
    if !simple && !parsed {
        return None;
    }
    let descriptor = cx.descriptor(BindingSource::Form(name));
    Some(if simple {
        descriptor
    } else {
        descriptor.with_protocol(parse_protocol(&cx.sig.ty))
    })
}

#[cfg(test)]
mod tests {
    use heron_core::{
        AnalysisTables, AttributeInstance, BindingProtocol, Constructor, ParameterSignature,
        ParseShape, TypeRef,
    };
    use heron_route::RouteParameters;

    use super::*;

    fn form_sig(name: &str, ty: TypeRef) -> ParameterSignature {
        ParameterSignature::new(0, name, ty)
            .with_attribute(AttributeInstance::new(AttributeKind::Form))
    }

    fn run(sig: &ParameterSignature) -> ParameterDescriptor {
        let tables = AnalysisTables::builtin();
        let route = RouteParameters::new();
        let cx = Context {
            sig,
            route: &route,
            tables: &tables,
            depth: 0,
            parent: None,
            body_verb: true,
        };
        bind(&cx).unwrap()
    }

    #[test]
    fn test_form_file_kinds() {
        let file = run(&form_sig("avatar", TypeRef::named("UploadedFile")));
        assert_eq!(file.source, BindingSource::FormFile("avatar".into()));

        let files = run(
            &form_sig("docs", TypeRef::named("Vec<UploadedFile>"))
                .collection_of(TypeRef::named("UploadedFile")),
        );
        assert_eq!(files.source, BindingSource::FormFiles("docs".into()));

        let fields = run(&form_sig("all", TypeRef::named("FormFields")));
        assert_eq!(fields.source, BindingSource::FormCollection("all".into()));

        // Streams are not form values; the DTO rules take over.
        let stream = run(&form_sig("raw", TypeRef::named("BodyStream")));
        assert_eq!(stream.source, BindingSource::Form("raw".into()));
    }

    #[test]
    fn test_form_name_override() {
        let sig = ParameterSignature::new(0, "title", TypeRef::named("String")).with_attribute(
            AttributeInstance::new(AttributeKind::Form).with_arg("name", "post_title"),
        );
        assert_eq!(run(&sig).source, BindingSource::Form("post_title".into()));
    }

    #[test]
    fn test_form_parse_capable_value() {
        let sig = form_sig("when", TypeRef::named("Date").with_parse(ParseShape::WithFormat));
        let desc = run(&sig);
        assert_eq!(desc.source, BindingSource::Form("when".into()));
        assert_eq!(desc.protocol, BindingProtocol::ParseWithFormat);
    }

    #[test]
    fn test_form_dto_children_are_form_sourced() {
        let address = TypeRef::named("Address").with_constructor(Constructor::public(vec![
            ParameterSignature::new(0, "street", TypeRef::named("String")),
        ]));
        let dto = TypeRef::named("Signup").with_constructor(Constructor::public(vec![
            ParameterSignature::new(0, "email", TypeRef::named("String")),
            ParameterSignature::new(1, "photo", TypeRef::named("UploadedFile")),
            ParameterSignature::new(2, "address", address),
        ]));

        let desc = run(&form_sig("signup", dto));
        let children = desc.source.children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].source, BindingSource::Form("email".into()));
        assert_eq!(children[1].source, BindingSource::FormFile("photo".into()));
        // Complex child falls back to a plain form value.
        assert_eq!(children[2].source, BindingSource::Form("address".into()));
    }

    #[test]
    fn test_form_dto_without_constructor_is_permissive() {
        let dto = TypeRef::named("Opaque").with_constructor(Constructor::private(vec![]));
        assert_eq!(run(&form_sig("payload", dto)).source, BindingSource::Form("payload".into()));
    }
}
