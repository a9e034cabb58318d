//! Lookup tables consulted by the analysis passes.
//!
//! Tables are plain values, built once and handed to the engine. Tests and
//! hosts substitute their own through the `with_*` builders.

use std::collections::{BTreeMap, BTreeSet};

use crate::outcome::OutcomeKind;
use crate::types::TypeRef;

/// Runtime types recognized by exact identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WellKnownType {
    /// The request context.
    RequestContext,
    /// The request's cancellation signal.
    Cancellation,
    /// A single uploaded file.
    FormFile,
    /// A collection of uploaded files.
    FormFileCollection,
    /// The raw form field map.
    FormCollection,
    /// The raw request body stream.
    BodyStream,
    /// The incremental request body reader.
    BodyReader,
}

/// How a route constraint relates to bound types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintClass<'a> {
    /// The constraint admits only the listed canonical type names.
    Typed(&'a BTreeSet<String>),
    /// The constraint checks the text's format and admits any type.
    FormatOnly,
    /// The constraint is not known and cannot be validated.
    Unknown,
}

/// Route constraint name to accepted type names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintTable {
    typed: BTreeMap<String, BTreeSet<String>>,
    format_only: BTreeSet<String>,
}

impl ConstraintTable {
    /// Returns an empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            typed: BTreeMap::new(),
            format_only: BTreeSet::new(),
        }
    }

    /// Returns the built-in table.
    #[must_use]
    pub fn builtin() -> Self {
        let typed: [(&str, &[&str]); 9] = [
            ("int", &["i32"]),
            ("long", &["i64"]),
            ("bool", &["bool"]),
            ("double", &["f64"]),
            ("float", &["f32"]),
            ("decimal", &["Decimal"]),
            ("guid", &["Uuid"]),
            ("uuid", &["Uuid"]),
            ("datetime", &["DateTime", "NaiveDateTime"]),
        ];
        let format_only = [
            "length", "minlength", "maxlength", "min", "max", "range", "regex", "alpha",
            "required", "nonfile",
        ];

        let mut table = Self::empty();
        for (name, types) in typed {
            table = table.with_typed(name, types.iter().copied());
        }
        for name in format_only {
            table = table.with_format_only(name);
        }
        table
    }

    /// Adds (or extends) a typed constraint.
    #[must_use]
    pub fn with_typed<I, S>(mut self, name: &str, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.typed
            .entry(name.to_ascii_lowercase())
            .or_default()
            .extend(types.into_iter().map(Into::into));
        self
    }

    /// Adds a format-only constraint.
    #[must_use]
    pub fn with_format_only(mut self, name: &str) -> Self {
        self.format_only.insert(name.to_ascii_lowercase());
        self
    }

    /// Classifies a constraint name, case-insensitively.
    #[must_use]
    pub fn classify(&self, name: &str) -> ConstraintClass<'_> {
        let key = name.to_ascii_lowercase();
        if let Some(types) = self.typed.get(&key) {
            ConstraintClass::Typed(types)
        } else if self.format_only.contains(&key) {
            ConstraintClass::FormatOnly
        } else {
            ConstraintClass::Unknown
        }
    }

    /// Returns false only if `name` is a typed constraint that rejects
    /// `canonical_type`.
    #[must_use]
    pub fn accepts(&self, name: &str, canonical_type: &str) -> bool {
        match self.classify(name) {
            ConstraintClass::Typed(types) => types.contains(canonical_type),
            ConstraintClass::FormatOnly | ConstraintClass::Unknown => true,
        }
    }
}

impl Default for ConstraintTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Primitive, textual, alias and well-known type knowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTable {
    primitives: BTreeSet<String>,
    textual: BTreeSet<String>,
    aliases: BTreeMap<String, String>,
    well_known: BTreeMap<String, WellKnownType>,
}

impl TypeTable {
    /// Returns an empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            primitives: BTreeSet::new(),
            textual: BTreeSet::new(),
            aliases: BTreeMap::new(),
            well_known: BTreeMap::new(),
        }
    }

    /// Returns the built-in table.
    #[must_use]
    pub fn builtin() -> Self {
        const PRIMITIVES: &[&str] = &[
            "bool", "char", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32",
            "u64", "u128", "usize", "f32", "f64", "String", "Uuid", "Decimal", "DateTime",
            "NaiveDate", "NaiveDateTime", "NaiveTime", "IpAddr", "Ipv4Addr", "Ipv6Addr",
            "SocketAddr", "Url", "Duration",
        ];
        const ALIASES: &[(&str, &str)] = &[
            ("str", "String"),
            ("Box<str>", "String"),
            ("Arc<str>", "String"),
            ("Rc<str>", "String"),
            ("Cow<str>", "String"),
        ];
        const WELL_KNOWN: &[(&str, WellKnownType)] = &[
            ("RequestContext", WellKnownType::RequestContext),
            ("CancellationToken", WellKnownType::Cancellation),
            ("UploadedFile", WellKnownType::FormFile),
            ("UploadedFiles", WellKnownType::FormFileCollection),
            ("FormFields", WellKnownType::FormCollection),
            ("BodyStream", WellKnownType::BodyStream),
            ("BodyReader", WellKnownType::BodyReader),
        ];

        let mut table = Self::empty();
        for name in PRIMITIVES {
            table = table.with_primitive(name);
        }
        table.textual.insert("String".to_string());
        for (from, to) in ALIASES {
            table = table.with_alias(from, to);
        }
        for (name, kind) in WELL_KNOWN {
            table = table.with_well_known(name, *kind);
        }
        table
    }

    /// Adds a primitive type name.
    #[must_use]
    pub fn with_primitive(mut self, name: &str) -> Self {
        self.primitives.insert(name.to_string());
        self
    }

    /// Adds a textual type name (textual types may bind catch-all segments).
    #[must_use]
    pub fn with_textual(mut self, name: &str) -> Self {
        self.textual.insert(name.to_string());
        self
    }

    /// Maps an alias spelling onto a canonical name.
    #[must_use]
    pub fn with_alias(mut self, from: &str, to: &str) -> Self {
        self.aliases.insert(canonical_spelling(from), to.to_string());
        self
    }

    /// Registers a well-known runtime type.
    #[must_use]
    pub fn with_well_known(mut self, name: &str, kind: WellKnownType) -> Self {
        self.well_known.insert(name.to_string(), kind);
        self
    }

    /// Returns the canonical spelling of a type name.
    ///
    /// References, lifetimes and path prefixes are dropped, whitespace is
    /// normalized and aliases are resolved:
    ///
    /// ```
    /// use heron_core::TypeTable;
    ///
    /// let types = TypeTable::builtin();
    /// assert_eq!(types.canonical_name("&'a str"), "String");
    /// assert_eq!(types.canonical_name("std::vec::Vec< uuid::Uuid >"), "Vec<Uuid>");
    /// ```
    #[must_use]
    pub fn canonical_name(&self, name: &str) -> String {
        let spelled = canonical_spelling(name);
        self.aliases.get(&spelled).cloned().unwrap_or(spelled)
    }

    /// Returns true if values of the type parse from a single string.
    #[must_use]
    pub fn is_primitive(&self, ty: &TypeRef) -> bool {
        ty.is_enum || self.is_primitive_name(&ty.name)
    }

    /// Returns true if the type name is primitive.
    #[must_use]
    pub fn is_primitive_name(&self, name: &str) -> bool {
        self.primitives.contains(&self.canonical_name(name))
    }

    /// Returns true if the type name is textual.
    #[must_use]
    pub fn is_textual(&self, name: &str) -> bool {
        self.textual.contains(&self.canonical_name(name))
    }

    /// Returns the well-known runtime type, matched by exact identity.
    #[must_use]
    pub fn well_known(&self, ty: &TypeRef) -> Option<WellKnownType> {
        self.well_known.get(&self.canonical_name(&ty.name)).copied()
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Lifetime,
    PathSep,
    Punct(char),
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c == b'\'' {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token::Lifetime);
        } else if c == b':' && bytes.get(i + 1) == Some(&b':') {
            tokens.push(Token::PathSep);
            i += 2;
        } else if c.is_ascii_alphanumeric() || c == b'_' || !c.is_ascii() {
            let start = i;
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || !bytes[i].is_ascii())
            {
                i += 1;
            }
            tokens.push(Token::Ident(&input[start..i]));
        } else {
            tokens.push(Token::Punct(char::from(c)));
            i += 1;
        }
    }
    tokens
}

/// Normalizes a type spelling without resolving aliases.
fn canonical_spelling(name: &str) -> String {
    let mut tokens = tokenize(name);

    // Leading reference and mutability markers.
    let mut skip = 0;
    while let Some(token) = tokens.get(skip) {
        match token {
            Token::Punct('&') | Token::Lifetime | Token::Ident("mut") => skip += 1,
            _ => break,
        }
    }
    tokens.drain(..skip);

    let mut kept: Vec<&Token<'_>> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        match (&tokens[i], tokens.get(i + 1)) {
            (Token::Lifetime, Some(Token::Punct(','))) => i += 2,
            (Token::Lifetime, _) => i += 1,
            (Token::Ident(_), Some(Token::PathSep)) => i += 2,
            (Token::PathSep, _) => i += 1,
            (token, _) => {
                kept.push(token);
                i += 1;
            }
        }
    }

    let mut out = String::with_capacity(name.len());
    let mut prev_ident = false;
    for token in kept {
        match token {
            Token::Ident(ident) => {
                if prev_ident {
                    out.push(' ');
                }
                out.push_str(ident);
                prev_ident = true;
            }
            Token::Punct(c) => {
                out.push(*c);
                prev_ident = false;
            }
            Token::Lifetime | Token::PathSep => {}
        }
    }
    out
}

/// How a factory call maps to an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryRule {
    /// A fixed outcome kind.
    Kind(OutcomeKind),
    /// A custom outcome: argument 0 is the status, argument 1 the code.
    Custom,
}

/// Outcome factory receivers and method names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryTable {
    receivers: BTreeSet<String>,
    factories: BTreeMap<String, FactoryRule>,
}

impl FactoryTable {
    /// Returns an empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            receivers: BTreeSet::new(),
            factories: BTreeMap::new(),
        }
    }

    /// Returns the built-in table.
    #[must_use]
    pub fn builtin() -> Self {
        Self::empty()
            .with_receiver("Error")
            .with_factory("validation", FactoryRule::Kind(OutcomeKind::Validation))
            .with_factory("unauthorized", FactoryRule::Kind(OutcomeKind::Unauthorized))
            .with_factory("forbidden", FactoryRule::Kind(OutcomeKind::Forbidden))
            .with_factory("not_found", FactoryRule::Kind(OutcomeKind::NotFound))
            .with_factory("conflict", FactoryRule::Kind(OutcomeKind::Conflict))
            .with_factory("failure", FactoryRule::Kind(OutcomeKind::Failure))
            .with_factory("unexpected", FactoryRule::Kind(OutcomeKind::Unexpected))
            .with_factory("custom", FactoryRule::Custom)
    }

    /// Adds a receiver type name.
    #[must_use]
    pub fn with_receiver(mut self, name: &str) -> Self {
        self.receivers.insert(name.to_string());
        self
    }

    /// Adds a factory method.
    #[must_use]
    pub fn with_factory(mut self, name: &str, rule: FactoryRule) -> Self {
        self.factories.insert(name.to_string(), rule);
        self
    }

    /// Returns true if `name` is an outcome receiver.
    #[must_use]
    pub fn is_receiver(&self, name: &str) -> bool {
        self.receivers.contains(name)
    }

    /// Looks up a factory method.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&FactoryRule> {
        self.factories.get(name)
    }
}

impl Default for FactoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// All tables the engine consults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisTables {
    /// Route constraints.
    pub constraints: ConstraintTable,
    /// Type knowledge.
    pub types: TypeTable,
    /// Outcome factories.
    pub factories: FactoryTable,
}

impl AnalysisTables {
    /// Returns the built-in tables.
    #[must_use]
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Replaces the constraint table.
    #[must_use]
    pub fn with_constraints(mut self, constraints: ConstraintTable) -> Self {
        self.constraints = constraints;
        self
    }

    /// Replaces the type table.
    #[must_use]
    pub fn with_types(mut self, types: TypeTable) -> Self {
        self.types = types;
        self
    }

    /// Replaces the factory table.
    #[must_use]
    pub fn with_factories(mut self, factories: FactoryTable) -> Self {
        self.factories = factories;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_classification() {
        let table = ConstraintTable::builtin();
        assert!(matches!(table.classify("INT"), ConstraintClass::Typed(t) if t.contains("i32")));
        assert_eq!(table.classify("minlength"), ConstraintClass::FormatOnly);
        assert_eq!(table.classify("slug"), ConstraintClass::Unknown);
    }

    #[test]
    fn test_constraint_accepts() {
        let table = ConstraintTable::builtin();
        assert!(table.accepts("int", "i32"));
        assert!(!table.accepts("int", "String"));
        assert!(table.accepts("datetime", "NaiveDateTime"));
        assert!(table.accepts("regex", "String"));
        assert!(table.accepts("slug", "u8"));
    }

    #[test]
    fn test_custom_constraint() {
        let table = ConstraintTable::empty().with_typed("port", ["u16"]);
        assert!(table.accepts("port", "u16"));
        assert!(!table.accepts("port", "i32"));
        assert_eq!(table.classify("int"), ConstraintClass::Unknown);
    }

    #[test]
    fn test_canonical_name_strips_references_and_paths() {
        let types = TypeTable::builtin();
        assert_eq!(types.canonical_name("i32"), "i32");
        assert_eq!(types.canonical_name("&str"), "String");
        assert_eq!(types.canonical_name("&'static str"), "String");
        assert_eq!(types.canonical_name("&mut u8"), "u8");
        assert_eq!(types.canonical_name("uuid::Uuid"), "Uuid");
        assert_eq!(types.canonical_name("::std::string::String"), "String");
        assert_eq!(types.canonical_name("Cow<'a, str>"), "String");
        assert_eq!(
            types.canonical_name("std::collections::HashMap<String, i32>"),
            "HashMap<String,i32>"
        );
        assert_eq!(types.canonical_name("Box<dyn io::Read>"), "Box<dyn Read>");
    }

    #[test]
    fn test_primitives() {
        let types = TypeTable::builtin();
        assert!(types.is_primitive(&TypeRef::named("i64")));
        assert!(types.is_primitive(&TypeRef::named("&str")));
        assert!(types.is_primitive(&TypeRef::enumeration("Color")));
        assert!(!types.is_primitive(&TypeRef::named("CreateRequest")));
        assert!(types.is_textual("String"));
        assert!(!types.is_textual("i32"));
    }

    #[test]
    fn test_well_known_types() {
        let types = TypeTable::builtin();
        assert_eq!(
            types.well_known(&TypeRef::named("heron::RequestContext")),
            Some(WellKnownType::RequestContext)
        );
        assert_eq!(
            types.well_known(&TypeRef::named("UploadedFile")),
            Some(WellKnownType::FormFile)
        );
        assert_eq!(types.well_known(&TypeRef::named("Request")), None);
    }

    #[test]
    fn test_factory_table() {
        let table = FactoryTable::builtin();
        assert!(table.is_receiver("Error"));
        assert!(!table.is_receiver("Problem"));
        assert_eq!(
            table.lookup("not_found"),
            Some(&FactoryRule::Kind(OutcomeKind::NotFound))
        );
        assert_eq!(table.lookup("custom"), Some(&FactoryRule::Custom));
        assert_eq!(table.lookup("teapot"), None);
    }
}
