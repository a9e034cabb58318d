//! Traversable model of handler bodies.
//!
//! The front end lowers each body into a small tree that keeps only what
//! outcome inference looks at: calls, references to named symbols, literals,
//! string concatenation and grouping.

use std::collections::BTreeMap;
use std::fmt;

use heron_core::LiteralValue;
use serde::{Deserialize, Serialize};

/// Identifies a symbol (function, method, constant, local) in a [`SymbolTable`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A reference to a named symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolRef {
    /// Name as written.
    pub name: String,
    /// Resolved symbol, when the front end found one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolId>,
}

impl SymbolRef {
    /// A reference resolved to `symbol`.
    #[must_use]
    pub fn resolved(name: impl Into<String>, symbol: SymbolId) -> Self {
        Self {
            name: name.into(),
            symbol: Some(symbol),
        }
    }

    /// A reference the front end could not resolve.
    #[must_use]
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: None,
        }
    }
}

/// Where a call lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target", content = "symbol", rename_all = "snake_case")]
pub enum CallTarget {
    /// A symbol with a body in the same compilation unit.
    Local(SymbolId),
    /// A trait or abstract method without a local body.
    Opaque,
    /// Code compiled elsewhere; never crossed.
    External,
}

/// The callee of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Callee {
    /// Path segments as written (`["Error", "not_found"]`).
    pub path: Vec<String>,
    /// Resolved target.
    pub target: CallTarget,
}

impl Callee {
    /// Creates a callee from a `::`-separated path.
    #[must_use]
    pub fn new(path: &str, target: CallTarget) -> Self {
        Self {
            path: path.split("::").map(ToString::to_string).collect(),
            target,
        }
    }

    /// Returns the path joined with `::`.
    #[must_use]
    pub fn display_path(&self) -> String {
        self.path.join("::")
    }
}

/// A node of a lowered body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum SyntaxNode {
    /// A function or method call.
    Invocation {
        /// What is called.
        callee: Callee,
        /// Method receiver, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receiver: Option<Box<SyntaxNode>>,
        /// Arguments in order.
        #[serde(default)]
        args: Vec<SyntaxNode>,
    },
    /// A path naming a symbol.
    Reference {
        /// The reference.
        #[serde(flatten)]
        symbol: SymbolRef,
    },
    /// A literal value.
    Literal {
        /// The value.
        value: LiteralValue,
    },
    /// String concatenation or formatting, parts in order.
    Concat {
        /// The parts.
        parts: Vec<SyntaxNode>,
    },
    /// A block, statement list or parenthesized expression.
    Group {
        /// The children; the last one is the group's value.
        items: Vec<SyntaxNode>,
    },
}

impl SyntaxNode {
    /// Shorthand for a call.
    #[must_use]
    pub fn call(callee: Callee, args: Vec<SyntaxNode>) -> Self {
        Self::Invocation {
            callee,
            receiver: None,
            args,
        }
    }

    /// Shorthand for a method call on `receiver`.
    #[must_use]
    pub fn method_call(receiver: SyntaxNode, callee: Callee, args: Vec<SyntaxNode>) -> Self {
        Self::Invocation {
            callee,
            receiver: Some(Box::new(receiver)),
            args,
        }
    }

    /// Shorthand for a reference.
    #[must_use]
    pub fn reference(symbol: SymbolRef) -> Self {
        Self::Reference { symbol }
    }

    /// Shorthand for a literal.
    #[must_use]
    pub fn literal(value: impl Into<LiteralValue>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    /// Shorthand for a group.
    #[must_use]
    pub fn group(items: Vec<SyntaxNode>) -> Self {
        Self::Group { items }
    }

    /// An empty group, for bodies with nothing to scan.
    #[must_use]
    pub fn empty() -> Self {
        Self::Group { items: Vec::new() }
    }
}

impl Default for SyntaxNode {
    fn default() -> Self {
        Self::empty()
    }
}

/// Read access to symbol bodies.
pub trait SymbolSource {
    /// Returns the lowered body (or initializer) of a symbol.
    fn body(&self, id: SymbolId) -> Option<&SyntaxNode>;
}

/// Symbol bodies keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    bodies: BTreeMap<SymbolId, SyntaxNode>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a symbol body.
    pub fn insert(&mut self, id: SymbolId, body: SyntaxNode) {
        self.bodies.insert(id, body);
    }

    /// Adds a symbol body.
    #[must_use]
    pub fn with(mut self, id: SymbolId, body: SyntaxNode) -> Self {
        self.insert(id, body);
        self
    }

    /// Returns the number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl SymbolSource for SymbolTable {
    fn body(&self, id: SymbolId) -> Option<&SyntaxNode> {
        self.bodies.get(&id)
    }
}
