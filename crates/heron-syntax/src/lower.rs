//! Source file to handler inputs.

use heron_core::SuccessKind;
use heron_infer::HandlerInput;
use syn::{FnArg, Item, ItemFn, Pat, ReturnType, Type};
use tracing::{debug, trace};

use crate::attrs::{is_handler, parameter_attributes, EndpointMarkers, HandlerAttrs};
use crate::body::BodyIndex;
use crate::catalog::{last_segment, single_arg, spell, type_args, TypeCatalog};
use crate::error::LowerError;

/// The outcome of lowering one handler.
pub type Lowered = Result<HandlerInput, LowerError>;

/// Lowers every `#[handler]` function of `file`, in source order.
///
/// Handlers nested in inline modules are included. Types, helpers and
/// constants anywhere in the file are visible to every handler.
///
/// # Errors
///
/// Returns an error for malformed handler, parameter or `produces`
/// attributes, for handlers taking `self`, and for parameter patterns that
/// carry no name.
pub fn lower_file(file: &syn::File) -> Result<Vec<HandlerInput>, LowerError> {
    lower_file_each(file)?.into_iter().collect()
}

/// Lowers every `#[handler]` function of `file`, one result per handler.
///
/// A malformed handler yields its error in place and the remaining handlers
/// are still lowered.
///
/// # Errors
///
/// Returns an error only for file-level problems: a malformed attribute on a
/// type declaration.
pub fn lower_file_each(file: &syn::File) -> Result<Vec<Lowered>, LowerError> {
    let catalog = TypeCatalog::from_file(file)?;
    let mut bodies = BodyIndex::build(file);

    let mut handlers = Vec::new();
    collect_handlers(&file.items, &mut handlers);

    let lowered: Vec<_> = handlers
        .into_iter()
        .map(|item| lower_handler(item, &catalog, &mut bodies))
        .collect();

    let rejected = lowered.iter().filter(|r| r.is_err()).count();
    debug!(handlers = lowered.len(), rejected, "lowered source file");
    Ok(lowered)
}

/// Parses `source` and lowers its handlers.
///
/// # Errors
///
/// Returns [`LowerError::Parse`] if `source` is not valid Rust, otherwise
/// the errors of [`lower_file`].
///
/// # Example
///
/// ```
/// let handlers = heron_syntax::lower_source(r#"
///     #[handler(method = "GET", path = "/users/{id}")]
///     async fn get_user(id: u64) -> Result<User, Error> {
///         Err(Error::not_found("user"))
///     }
/// "#).unwrap();
///
/// assert_eq!(handlers[0].name, "get_user");
/// assert_eq!(handlers[0].route_template, "/users/{id}");
/// ```
pub fn lower_source(source: &str) -> Result<Vec<HandlerInput>, LowerError> {
    let file = syn::parse_file(source)?;
    lower_file(&file)
}

/// Parses `source` and lowers its handlers one by one.
///
/// # Errors
///
/// Returns [`LowerError::Parse`] if `source` is not valid Rust, otherwise
/// the errors of [`lower_file_each`].
pub fn lower_source_each(source: &str) -> Result<Vec<Lowered>, LowerError> {
    let file = syn::parse_file(source)?;
    lower_file_each(&file)
}

fn collect_handlers<'a>(items: &'a [Item], out: &mut Vec<&'a ItemFn>) {
    for item in items {
        match item {
            Item::Fn(f) if f.attrs.iter().any(is_handler) => out.push(f),
            Item::Mod(m) => {
                if let Some((_, items)) = &m.content {
                    collect_handlers(items, out);
                }
            }
            _ => {}
        }
    }
}

fn lower_handler(
    item: &ItemFn,
    catalog: &TypeCatalog,
    bodies: &mut BodyIndex,
) -> Result<HandlerInput, LowerError> {
    let name = item.sig.ident.to_string();

    let mut route = None;
    for attr in item.attrs.iter().filter(|a| is_handler(a)) {
        let parsed: HandlerAttrs = attr
            .parse_args()
            .map_err(|e| LowerError::attribute(&name, e))?;
        route = Some(parsed);
    }
    let Some(HandlerAttrs { method, path }) = route else {
        return Err(LowerError::signature(&name, "missing #[handler] attribute"));
    };

    let markers =
        EndpointMarkers::from_attrs(&item.attrs).map_err(|e| LowerError::attribute(&name, e))?;

    let mut input = HandlerInput::new(&name, method, path, success_kind(&item.sig.output))
        .with_middleware(markers.middleware);
    input.declared_outcomes = markers.declared;

    for (index, arg) in item.sig.inputs.iter().enumerate() {
        let FnArg::Typed(pt) = arg else {
            return Err(LowerError::signature(&name, "handlers cannot take `self`"));
        };
        let param = param_name(&pt.pat).ok_or_else(|| {
            LowerError::signature(&name, format!("parameter {index} has no name"))
        })?;
        let attributes =
            parameter_attributes(&pt.attrs).map_err(|e| LowerError::attribute(&name, e))?;
        input = input.with_parameter(catalog.signature(index, &param, &pt.ty, attributes));
    }

    input.body = bodies.handler_body(item);
    trace!(
        handler = %name,
        parameters = input.parameters.len(),
        declared = input.declared_outcomes.len(),
        symbols = input.body.symbols.len(),
        "lowered handler"
    );
    Ok(input)
}

/// The bound name of a parameter: `id` or the `body` in `Json(body)`.
fn param_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(p) => Some(p.ident.to_string()),
        Pat::TupleStruct(ts) => match ts.elems.first() {
            Some(Pat::Ident(p)) => Some(p.ident.to_string()),
            _ => None,
        },
        Pat::Reference(r) => param_name(&r.pat),
        _ => None,
    }
}

/// Reads the success kind off the return type.
///
/// `Result<T, E>` is unwrapped to `T`. Then `()` and `NoContent` mean no
/// content, `Created<T>` and `Accepted<T>` keep their payload, and `Json<T>`
/// is a plain `T`.
pub(crate) fn success_kind(output: &ReturnType) -> SuccessKind {
    let ReturnType::Type(_, ty) = output else {
        return SuccessKind::NoContent;
    };
    let ty: &Type = ty;
    let ok = single_arg(ty, &["Result"])
        .or_else(|| {
            last_segment(ty)
                .filter(|seg| seg.ident == "Result")
                .and_then(|seg| type_args(seg).first().copied())
        })
        .unwrap_or(ty);
    success_of(ok)
}

fn success_of(ty: &Type) -> SuccessKind {
    if let Type::Tuple(t) = ty {
        if t.elems.is_empty() {
            return SuccessKind::NoContent;
        }
    }
    let Some(seg) = last_segment(ty) else {
        return SuccessKind::Value(spell(ty));
    };
    let payload = type_args(seg).first().map(|t| spell(t));
    match (seg.ident.to_string().as_str(), payload) {
        ("NoContent", _) => SuccessKind::NoContent,
        ("Created", Some(payload)) => SuccessKind::Created(payload),
        ("Accepted", payload) => SuccessKind::Accepted(payload),
        ("Json", Some(payload)) => SuccessKind::Value(payload),
        _ => SuccessKind::Value(spell(ty)),
    }
}
