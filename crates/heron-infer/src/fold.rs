//! Constant folding of factory arguments.

use std::collections::BTreeSet;

use heron_core::LiteralValue;

use crate::syntax::{SymbolId, SymbolSource, SyntaxNode};

/// Folds `node` to a literal, following references to local constants.
///
/// Returns `None` when any part depends on a runtime value. Self-referential
/// constants fold to `None`.
pub fn fold<S: SymbolSource + ?Sized>(node: &SyntaxNode, symbols: &S) -> Option<LiteralValue> {
    let mut guard = BTreeSet::new();
    fold_guarded(node, symbols, &mut guard)
}

fn fold_guarded<S: SymbolSource + ?Sized>(
    node: &SyntaxNode,
    symbols: &S,
    guard: &mut BTreeSet<SymbolId>,
) -> Option<LiteralValue> {
    match node {
        SyntaxNode::Literal { value } => Some(value.clone()),
        SyntaxNode::Reference { symbol } => {
            let id = symbol.symbol?;
            if !guard.insert(id) {
                return None;
            }
            let folded = symbols
                .body(id)
                .and_then(|body| fold_guarded(body, symbols, guard));
            guard.remove(&id);
            folded
        }
        SyntaxNode::Concat { parts } => {
            let mut out = String::new();
            for part in parts {
                match fold_guarded(part, symbols, guard)? {
                    LiteralValue::Str(s) => out.push_str(&s),
                    LiteralValue::Int(i) => out.push_str(&i.to_string()),
                    LiteralValue::Bool(b) => out.push_str(if b { "true" } else { "false" }),
                }
            }
            Some(LiteralValue::Str(out))
        }
        SyntaxNode::Group { items } => fold_guarded(items.last()?, symbols, guard),
        SyntaxNode::Invocation { .. } => None,
    }
}

/// Folds a status-code argument.
pub fn fold_status<S: SymbolSource + ?Sized>(node: &SyntaxNode, symbols: &S) -> Option<u16> {
    fold(node, symbols)
        .and_then(|v| v.as_int())
        .and_then(|i| u16::try_from(i).ok())
}

/// Folds an error-code argument.
pub fn fold_code<S: SymbolSource + ?Sized>(node: &SyntaxNode, symbols: &S) -> Option<String> {
    match fold(node, symbols)? {
        LiteralValue::Str(s) => Some(s),
        LiteralValue::Int(_) | LiteralValue::Bool(_) => None,
    }
}
