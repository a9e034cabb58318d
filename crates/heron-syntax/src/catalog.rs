//! Type catalog: what the source file says about the types handlers use.
//!
//! The catalog records every struct (with its fields), every enum and the
//! binding traits each type implements, then turns `syn` types into the
//! [`ParameterSignature`]s the classifier consumes.

use std::collections::{BTreeMap, BTreeSet};

use heron_core::{
    AttributeInstance, AttributeKind, Constructor, FactoryShape, ParameterSignature, ParseShape,
    TypeCapabilities, TypeRef,
};
use quote::ToTokens;
use syn::{
    Fields, File, GenericArgument, ImplItem, Item, ItemImpl, ItemStruct, PathArguments,
    PathSegment, Type, Visibility,
};
use tracing::trace;

use crate::attrs::parameter_attributes;
use crate::error::LowerError;

/// How deep constructors are described for nested parameter objects.
const MAX_DEPTH: usize = 2;

const COLLECTIONS: &[&str] = &["Vec", "VecDeque", "HashSet", "BTreeSet", "IndexSet", "SmallVec"];

const SCALARS: &[&str] = &[
    "bool", "char", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64",
    "u128", "usize", "f32", "f64",
];

#[derive(Debug, Clone)]
enum Shape {
    Named(Vec<Field>),
    Unit,
    Tuple,
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    ty: Type,
    attributes: Vec<AttributeInstance>,
}

#[derive(Debug, Clone)]
struct StructInfo {
    public: bool,
    shape: Shape,
}

/// Types declared in one source file.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    structs: BTreeMap<String, StructInfo>,
    enums: BTreeSet<String>,
    capabilities: BTreeMap<String, TypeCapabilities>,
}

impl TypeCatalog {
    /// Collects structs, enums and binding-trait impls from `file`,
    /// including inline modules.
    ///
    /// # Errors
    ///
    /// Returns [`LowerError::Parse`] if a struct field carries a malformed
    /// binding attribute.
    pub fn from_file(file: &File) -> Result<Self, LowerError> {
        let mut catalog = Self::default();
        catalog.collect(&file.items)?;
        trace!(
            structs = catalog.structs.len(),
            enums = catalog.enums.len(),
            capable = catalog.capabilities.len(),
            "catalogued types"
        );
        Ok(catalog)
    }

    fn collect(&mut self, items: &[Item]) -> Result<(), LowerError> {
        for item in items {
            match item {
                Item::Struct(s) => {
                    let info = struct_info(s)?;
                    self.structs.insert(s.ident.to_string(), info);
                }
                Item::Enum(e) => {
                    self.enums.insert(e.ident.to_string());
                }
                Item::Impl(imp) => self.record_impl(imp),
                Item::Mod(m) => {
                    if let Some((_, items)) = &m.content {
                        self.collect(items)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn record_impl(&mut self, imp: &ItemImpl) {
        let Some((_, trait_path, _)) = &imp.trait_ else {
            return;
        };
        let (Some(trait_seg), Some(self_seg)) =
            (trait_path.segments.last(), last_segment(&imp.self_ty))
        else {
            return;
        };

        let caps = self
            .capabilities
            .entry(self_seg.ident.to_string())
            .or_default();
        match trait_seg.ident.to_string().as_str() {
            "FromStr" => caps.parse = Some(caps.parse.unwrap_or(ParseShape::Plain)),
            "ParseFormatted" => caps.parse = Some(ParseShape::WithFormat),
            "Bindable" => caps.bindable = true,
            "BindAsync" => {
                let arity = imp.items.iter().find_map(|item| match item {
                    ImplItem::Fn(f) if f.sig.ident == "bind" => Some(f.sig.inputs.len()),
                    _ => None,
                });
                caps.async_factory = Some(match arity {
                    Some(n) if n >= 2 => FactoryShape::ContextWithMetadata,
                    _ => FactoryShape::Context,
                });
            }
            _ => {}
        }
    }

    /// Describes one parameter (or struct field) for the classifier.
    ///
    /// Extractor wrappers (`Json<T>`, `Path<T>`, `Query<T>`, `Header<T>`,
    /// `Form<T>`, `Inject<T>`) add the attribute they imply and are peeled, as
    /// are references and `Option<T>`.
    #[must_use]
    pub fn signature(
        &self,
        index: usize,
        name: &str,
        ty: &Type,
        attributes: Vec<AttributeInstance>,
    ) -> ParameterSignature {
        self.signature_at(index, name, ty, attributes, 0)
    }

    fn signature_at(
        &self,
        index: usize,
        name: &str,
        ty: &Type,
        mut attributes: Vec<AttributeInstance>,
        depth: usize,
    ) -> ParameterSignature {
        let mut ty = peel(ty);
        let mut nullable = false;
        loop {
            if let Some(inner) = single_arg(ty, &["Option"]) {
                nullable = true;
                ty = peel(inner);
            } else if let Some((kind, inner)) = extractor(ty) {
                if !attributes.iter().any(|a| a.kind == kind) {
                    attributes.push(AttributeInstance::new(kind));
                }
                ty = peel(inner);
            } else {
                break;
            }
        }

        let mut sig = ParameterSignature::new(index, name, self.type_ref(ty, depth));
        sig.attributes = attributes;
        if nullable {
            sig = sig.nullable();
        }
        if let Some(element) = collection_element(ty) {
            sig = sig.collection_of(self.type_ref(peel(element), depth));
        } else if self.is_value_type(ty) {
            sig = sig.value_type();
        }
        sig
    }

    fn type_ref(&self, ty: &Type, depth: usize) -> TypeRef {
        let name = spell(ty);
        let Some(key) = last_segment(ty).map(|seg| seg.ident.to_string()) else {
            return TypeRef::named(name);
        };

        let mut type_ref = if self.enums.contains(&key) {
            TypeRef::enumeration(name)
        } else {
            TypeRef::named(name)
        };
        if let Some(caps) = self.capabilities.get(&key) {
            type_ref.capabilities = *caps;
        }
        if depth < MAX_DEPTH {
            if let Some(info) = self.structs.get(&key) {
                if let Some(constructor) = self.constructor(info, depth + 1) {
                    type_ref = type_ref.with_constructor(constructor);
                }
            }
        }
        type_ref
    }

    fn constructor(&self, info: &StructInfo, depth: usize) -> Option<Constructor> {
        let parameters = match &info.shape {
            Shape::Named(fields) => fields
                .iter()
                .enumerate()
                .map(|(i, f)| self.signature_at(i, &f.name, &f.ty, f.attributes.clone(), depth))
                .collect(),
            Shape::Unit => Vec::new(),
            Shape::Tuple => return None,
        };
        Some(if info.public {
            Constructor::public(parameters)
        } else {
            Constructor::private(parameters)
        })
    }

    fn is_value_type(&self, ty: &Type) -> bool {
        last_segment(ty).is_some_and(|seg| {
            let ident = seg.ident.to_string();
            SCALARS.contains(&ident.as_str()) || self.enums.contains(&ident)
        })
    }
}

fn struct_info(item: &ItemStruct) -> Result<StructInfo, LowerError> {
    let pub_struct = matches!(item.vis, Visibility::Public(_));
    let info = match &item.fields {
        Fields::Named(named) => {
            let mut all_pub = true;
            let mut fields = Vec::with_capacity(named.named.len());
            for field in &named.named {
                all_pub &= matches!(field.vis, Visibility::Public(_));
                let name = field
                    .ident
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                fields.push(Field {
                    name,
                    ty: field.ty.clone(),
                    attributes: parameter_attributes(&field.attrs)?,
                });
            }
            StructInfo {
                public: pub_struct && all_pub,
                shape: Shape::Named(fields),
            }
        }
        Fields::Unit => StructInfo {
            public: pub_struct,
            shape: Shape::Unit,
        },
        Fields::Unnamed(_) => StructInfo {
            public: pub_struct,
            shape: Shape::Tuple,
        },
    };
    Ok(info)
}

/// Strips references, parentheses and invisible groups.
pub(crate) fn peel(mut ty: &Type) -> &Type {
    loop {
        ty = match ty {
            Type::Reference(r) => &*r.elem,
            Type::Paren(p) => &*p.elem,
            Type::Group(g) => &*g.elem,
            _ => return ty,
        };
    }
}

pub(crate) fn last_segment(ty: &Type) -> Option<&PathSegment> {
    match peel(ty) {
        Type::Path(p) if p.qself.is_none() => p.path.segments.last(),
        _ => None,
    }
}

/// Type arguments of the last path segment.
pub(crate) fn type_args(seg: &PathSegment) -> Vec<&Type> {
    match &seg.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(t) => Some(t),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Returns `T` for `Name<T>` when the last segment is one of `names`.
pub(crate) fn single_arg<'a>(ty: &'a Type, names: &[&str]) -> Option<&'a Type> {
    let seg = last_segment(ty)?;
    if !names.iter().any(|n| seg.ident == n) {
        return None;
    }
    match type_args(seg).as_slice() {
        [inner] => Some(*inner),
        _ => None,
    }
}

fn extractor(ty: &Type) -> Option<(AttributeKind, &Type)> {
    let seg = last_segment(ty)?;
    let kind = match seg.ident.to_string().as_str() {
        "Json" => AttributeKind::Body,
        "Path" => AttributeKind::Route,
        "Query" => AttributeKind::Query,
        "Header" => AttributeKind::Header,
        "Form" => AttributeKind::Form,
        "Inject" => AttributeKind::Service,
        _ => return None,
    };
    match type_args(seg).as_slice() {
        [inner] => Some((kind, *inner)),
        _ => None,
    }
}

fn collection_element(ty: &Type) -> Option<&Type> {
    match peel(ty) {
        Type::Slice(s) => Some(&*s.elem),
        Type::Array(a) => Some(&*a.elem),
        other => {
            let inner = single_arg(other, COLLECTIONS)?;
            match peel(inner) {
                // SmallVec<[T; N]>
                Type::Array(a) => Some(&*a.elem),
                _ => Some(inner),
            }
        }
    }
}

/// Renders a type as compact source text: `Vec<Option<String>>`, `&'a str`.
pub(crate) fn spell(ty: &Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let before = out.chars().last().is_some_and(is_ident_char);
            let after = chars.get(i + 1).copied().is_some_and(is_ident_char);
            if !(before && after) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn catalog(file: File) -> TypeCatalog {
        TypeCatalog::from_file(&file).unwrap()
    }

    #[test]
    fn test_spell_compacts_tokens() {
        let ty: Type = parse_quote!(Vec<Option<String>>);
        assert_eq!(spell(&ty), "Vec<Option<String>>");
        let ty: Type = parse_quote!(&'a str);
        assert_eq!(spell(&ty), "&'a str");
        let ty: Type = parse_quote!(std::sync::Arc<dyn Store>);
        assert_eq!(spell(&ty), "std::sync::Arc<dyn Store>");
    }

    #[test]
    fn test_option_and_collections() {
        let catalog = TypeCatalog::default();

        let sig = catalog.signature(0, "q", &parse_quote!(Option<String>), vec![]);
        assert!(sig.nullable);
        assert_eq!(sig.ty.name, "String");

        let sig = catalog.signature(1, "tags", &parse_quote!(Vec<String>), vec![]);
        assert!(sig.is_collection);
        assert_eq!(sig.element_type.map(|t| t.name), Some("String".to_string()));

        let sig = catalog.signature(2, "ids", &parse_quote!(&[u32]), vec![]);
        assert!(sig.is_collection);

        let sig = catalog.signature(3, "small", &parse_quote!(SmallVec<[i64; 4]>), vec![]);
        assert_eq!(sig.element_type.map(|t| t.name), Some("i64".to_string()));

        let sig = catalog.signature(4, "n", &parse_quote!(u8), vec![]);
        assert!(sig.is_value_type);
        assert!(!sig.is_collection);
    }

    #[test]
    fn test_extractors_imply_attributes() {
        let catalog = TypeCatalog::default();

        let sig = catalog.signature(0, "body", &parse_quote!(Json<CreateOrder>), vec![]);
        assert!(sig.has_attribute(AttributeKind::Body));
        assert_eq!(sig.ty.name, "CreateOrder");

        let sig = catalog.signature(0, "db", &parse_quote!(Inject<Database>), vec![]);
        assert!(sig.has_attribute(AttributeKind::Service));

        let sig = catalog.signature(0, "page", &parse_quote!(Query<Option<u32>>), vec![]);
        assert!(sig.has_attribute(AttributeKind::Query));
        assert!(sig.nullable);
        assert_eq!(sig.ty.name, "u32");

        let explicit = vec![AttributeInstance::new(AttributeKind::Route).with_arg("name", "id")];
        let sig = catalog.signature(0, "order", &parse_quote!(Path<u64>), explicit);
        assert_eq!(sig.attributes.len(), 1);
        assert_eq!(sig.attribute(AttributeKind::Route).and_then(|a| a.name()), Some("id"));
    }

    #[test]
    fn test_trait_impls_become_capabilities() {
        let catalog = catalog(parse_quote! {
            pub struct OrderId(u64);
            impl std::str::FromStr for OrderId {
                type Err = ();
                fn from_str(s: &str) -> Result<Self, ()> { todo!() }
            }

            pub struct Window(u32);
            impl ParseFormatted for Window {}

            pub struct Tenant;
            impl Bindable for Tenant {}

            pub struct Paging;
            impl BindAsync for Paging {
                async fn bind(ctx: &RequestContext, meta: &ParameterInfo) -> Self { todo!() }
            }

            mod nested {
                pub enum Color { Red, Green }
            }
        });

        let ty = |name: &str| catalog.signature(0, "x", &syn::parse_str::<Type>(name).unwrap(), vec![]).ty;

        assert_eq!(ty("OrderId").capabilities.parse, Some(ParseShape::Plain));
        assert_eq!(ty("Window").capabilities.parse, Some(ParseShape::WithFormat));
        assert!(ty("Tenant").capabilities.bindable);
        assert_eq!(
            ty("Paging").capabilities.async_factory,
            Some(FactoryShape::ContextWithMetadata)
        );
        assert!(ty("Color").is_enum);
        assert!(catalog.signature(0, "c", &parse_quote!(Color), vec![]).is_value_type);
    }

    #[test]
    fn test_struct_constructors() {
        let catalog = catalog(parse_quote! {
            pub struct OrderQuery {
                #[path]
                pub id: u64,
                #[query(name = "p")]
                pub page: Option<u32>,
                pub paging: Paging,
            }

            pub struct Paging {
                pub size: u32,
            }

            pub struct Hidden {
                pub a: u32,
                b: u32,
            }

            pub struct Opaque(u32);
        });

        let sig = catalog.signature(0, "q", &parse_quote!(OrderQuery), vec![]);
        let ctor = sig.ty.widest_public_constructor().unwrap();
        assert_eq!(ctor.parameters.len(), 3);
        assert!(ctor.parameters[0].has_attribute(AttributeKind::Route));
        assert_eq!(
            ctor.parameters[1].attribute(AttributeKind::Query).and_then(|a| a.name()),
            Some("p")
        );
        assert!(ctor.parameters[1].nullable);
        assert_eq!(ctor.parameters[2].ty.constructors.len(), 1);

        let hidden = catalog.signature(0, "h", &parse_quote!(Hidden), vec![]);
        assert_eq!(hidden.ty.constructors.len(), 1);
        assert!(hidden.ty.widest_public_constructor().is_none());

        let opaque = catalog.signature(0, "o", &parse_quote!(Opaque), vec![]);
        assert!(opaque.ty.constructors.is_empty());
    }

    #[test]
    fn test_recursive_struct_is_bounded() {
        let catalog = catalog(parse_quote! {
            pub struct Node {
                pub next: Option<Box<Node>>,
            }
        });
        let sig = catalog.signature(0, "n", &parse_quote!(Node), vec![]);
        assert_eq!(sig.ty.constructors.len(), 1);
    }
}
