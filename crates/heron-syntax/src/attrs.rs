//! Parsing of handler and parameter attributes.

use heron_core::{
    AttributeInstance, AttributeKind, CustomOutcome, DeclaredOutcome, MiddlewarePolicy,
    OutcomeKind,
};
use http::Method;
use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Expr, ExprLit, Lit, LitInt, Meta, MetaNameValue, Token,
};

/// Parsed `#[handler(...)]` arguments.
#[derive(Debug)]
pub struct HandlerAttrs {
    /// HTTP method; `GET` when omitted.
    pub method: Method,
    /// Route template.
    pub path: String,
}

impl Parse for HandlerAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut method = None;
        let mut path = None;

        let meta_list: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in meta_list {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => return Err(syn::Error::new(other.span(), "expected name = value")),
            };
            let ident = name_of(&nv)?;
            let value = string_value(&nv)?;

            match ident.as_str() {
                "method" => {
                    let parsed = Method::from_bytes(value.to_ascii_uppercase().as_bytes())
                        .map_err(|_| {
                            syn::Error::new(nv.value.span(), format!("invalid HTTP method: {value}"))
                        })?;
                    method = Some(parsed);
                }
                "path" => path = Some(value),
                _ => {
                    return Err(syn::Error::new(
                        nv.path.span(),
                        format!("unknown attribute: {ident}"),
                    ))
                }
            }
        }

        let path = path
            .ok_or_else(|| syn::Error::new(Span::call_site(), "missing required attribute: path"))?;

        Ok(Self {
            method: method.unwrap_or(Method::GET),
            path,
        })
    }
}

/// Returns true for the `#[handler]` attribute, however it is imported.
pub(crate) fn is_handler(attr: &Attribute) -> bool {
    last_ident(attr).as_deref() == Some("handler")
}

/// Endpoint-level facts declared by marker attributes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EndpointMarkers {
    /// Authorization and rate-limit markers.
    pub middleware: MiddlewarePolicy,
    /// `#[produces(..)]` declarations, in order.
    pub declared: Vec<DeclaredOutcome>,
}

impl EndpointMarkers {
    /// Collects markers from a handler's attributes.
    ///
    /// Understood: `#[authorize]`, `#[allow_anonymous]`, `#[rate_limit]`,
    /// `#[disable_rate_limit]` (arguments are ignored) and
    /// `#[produces(..)]`. Other attributes are skipped.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut markers = Self::default();
        for attr in attrs {
            match last_ident(attr).as_deref() {
                Some("authorize") => markers.middleware.requires_authorization = true,
                Some("allow_anonymous") => markers.middleware.allow_anonymous = true,
                Some("rate_limit") => markers.middleware.rate_limited = true,
                Some("disable_rate_limit") => markers.middleware.rate_limiting_disabled = true,
                Some("produces") => {
                    let produces: Produces = attr.parse_args()?;
                    markers.declared.push(produces.0);
                }
                _ => {}
            }
        }
        Ok(markers)
    }
}

/// `#[produces(404)]`, `#[produces(kind = "not_found")]`,
/// `#[produces(status = 422, code = "Order.Invalid")]`.
struct Produces(DeclaredOutcome);

impl Parse for Produces {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitInt) {
            let lit: LitInt = input.parse()?;
            return Ok(Self(DeclaredOutcome::status(lit.base10_parse()?)));
        }

        let mut status: Option<u16> = None;
        let mut kind: Option<(OutcomeKind, Span)> = None;
        let mut code: Option<String> = None;

        let pairs: Punctuated<MetaNameValue, Token![,]> = Punctuated::parse_terminated(input)?;
        for nv in &pairs {
            match name_of(nv)?.as_str() {
                "status" => match &nv.value {
                    Expr::Lit(ExprLit {
                        lit: Lit::Int(i), ..
                    }) => status = Some(i.base10_parse()?),
                    other => return Err(syn::Error::new(other.span(), "expected integer literal")),
                },
                "kind" => {
                    let label = string_value(nv)?;
                    let parsed = OutcomeKind::from_label(&label).ok_or_else(|| {
                        syn::Error::new(nv.value.span(), format!("unknown outcome kind: {label}"))
                    })?;
                    kind = Some((parsed, nv.value.span()));
                }
                "code" => code = Some(string_value(nv)?),
                other => {
                    return Err(syn::Error::new(
                        nv.path.span(),
                        format!("unknown argument: {other}"),
                    ))
                }
            }
        }

        let declared = match (status, kind, code) {
            (_, Some((_, span)), Some(_)) => {
                return Err(syn::Error::new(span, "`kind` and `code` are exclusive"))
            }
            (status, None, Some(code)) => DeclaredOutcome::kind(OutcomeKind::Custom(CustomOutcome {
                status,
                code,
            })),
            (Some(status), Some((kind, span)), None) => {
                if kind.status() != Some(status) {
                    return Err(syn::Error::new(
                        span,
                        format!("status {status} does not match kind `{}`", kind.label()),
                    ));
                }
                DeclaredOutcome::kind(kind)
            }
            (None, Some((kind, _)), None) => DeclaredOutcome::kind(kind),
            (Some(status), None, None) => DeclaredOutcome::status(status),
            (None, None, None) => {
                return Err(syn::Error::new(input.span(), "expected a status code"))
            }
        };
        Ok(Self(declared))
    }
}

/// Parses the binding attributes of a parameter or struct field.
///
/// `#[path]` (or `#[route]`), `#[query]`, `#[header]`, `#[body]`, `#[form]`,
/// `#[inject]`, `#[expand]`, each optionally with `name = "..."`.
/// `#[inject(key = "...")]` requests a keyed service.
pub fn parameter_attributes(attrs: &[Attribute]) -> syn::Result<Vec<AttributeInstance>> {
    let mut out = Vec::new();
    for attr in attrs {
        let kind = match last_ident(attr).as_deref() {
            Some("path" | "route") => AttributeKind::Route,
            Some("query") => AttributeKind::Query,
            Some("header") => AttributeKind::Header,
            Some("body") => AttributeKind::Body,
            Some("form") => AttributeKind::Form,
            Some("inject") => AttributeKind::Service,
            Some("expand") => AttributeKind::Expand,
            _ => continue,
        };

        let mut instance = AttributeInstance::new(kind);
        if let Meta::List(list) = &attr.meta {
            let args = list.parse_args_with(Punctuated::<MetaNameValue, Token![,]>::parse_terminated)?;
            for nv in &args {
                let key = name_of(nv)?;
                match key.as_str() {
                    "name" => instance = instance.with_arg("name", string_value(nv)?),
                    "key" if kind == AttributeKind::Service => {
                        instance = instance.with_arg("key", string_value(nv)?);
                        instance.kind = AttributeKind::KeyedService;
                    }
                    _ => {
                        return Err(syn::Error::new(
                            nv.path.span(),
                            format!("unknown argument: {key}"),
                        ))
                    }
                }
            }
        }
        out.push(instance);
    }
    Ok(out)
}

fn last_ident(attr: &Attribute) -> Option<String> {
    attr.path().segments.last().map(|s| s.ident.to_string())
}

fn name_of(nv: &MetaNameValue) -> syn::Result<String> {
    nv.path
        .get_ident()
        .map(ToString::to_string)
        .ok_or_else(|| syn::Error::new(nv.path.span(), "expected identifier"))
}

fn string_value(nv: &MetaNameValue) -> syn::Result<String> {
    match &nv.value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        other => Err(syn::Error::new(other.span(), "expected string literal")),
    }
}
