//! Outcome inference.

use std::collections::BTreeSet;

use heron_core::{CustomOutcome, FactoryRule, FactoryTable, OutcomeKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::fold::{fold_code, fold_status};
use crate::syntax::{CallTarget, Callee, SymbolId, SymbolSource, SyntaxNode};

/// Outcomes found in a handler body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InferenceReport {
    /// Fixed outcome kinds.
    pub kinds: BTreeSet<OutcomeKind>,
    /// Custom outcomes with a known code.
    pub customs: BTreeSet<CustomOutcome>,
    /// Calls on an outcome receiver naming no known factory.
    pub unknown_factories: BTreeSet<String>,
    /// Calls to targets without a local body.
    pub opaque_calls: BTreeSet<String>,
}

impl InferenceReport {
    /// Returns every inferred outcome, fixed kinds first.
    #[must_use]
    pub fn outcomes(&self) -> Vec<OutcomeKind> {
        self.kinds
            .iter()
            .cloned()
            .chain(self.customs.iter().cloned().map(OutcomeKind::Custom))
            .collect()
    }

    /// Returns true if nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
            && self.customs.is_empty()
            && self.unknown_factories.is_empty()
            && self.opaque_calls.is_empty()
    }
}

/// Scans `root` and every local symbol it reaches for outcome factory calls.
///
/// The scan is depth first over an explicit work stack. Each local symbol is
/// entered at most once, so mutually recursive helpers terminate. External
/// targets are not crossed; opaque targets are reported and not inferred.
///
/// # Example
///
/// ```
/// use heron_core::{FactoryTable, OutcomeKind};
/// use heron_infer::{infer, Callee, CallTarget, SymbolTable, SyntaxNode};
///
/// let body = SyntaxNode::call(
///     Callee::new("Error::not_found", CallTarget::External),
///     vec![SyntaxNode::literal("user")],
/// );
///
/// let report = infer(&body, &SymbolTable::new(), &FactoryTable::builtin());
/// assert!(report.kinds.contains(&OutcomeKind::NotFound));
/// ```
pub fn infer<S: SymbolSource + ?Sized>(
    root: &SyntaxNode,
    symbols: &S,
    factories: &FactoryTable,
) -> InferenceReport {
    let mut report = InferenceReport::default();
    let mut visited: BTreeSet<SymbolId> = BTreeSet::new();
    let mut stack: Vec<&SyntaxNode> = vec![root];

    while let Some(node) = stack.pop() {
        match node {
            SyntaxNode::Invocation {
                callee,
                receiver,
                args,
            } => {
                if !factory_call(callee, args, symbols, factories, &mut report) {
                    match callee.target {
                        CallTarget::Local(id) => enter(id, symbols, &mut visited, &mut stack),
                        CallTarget::Opaque => {
                            report.opaque_calls.insert(callee.display_path());
                        }
                        CallTarget::External => {}
                    }
                }
                stack.extend(args.iter().rev());
                if let Some(receiver) = receiver {
                    stack.push(receiver);
                }
            }
            SyntaxNode::Reference { symbol } => {
                if let Some(id) = symbol.symbol {
                    enter(id, symbols, &mut visited, &mut stack);
                }
            }
            SyntaxNode::Literal { .. } => {}
            SyntaxNode::Concat { parts: items } | SyntaxNode::Group { items } => {
                stack.extend(items.iter().rev());
            }
        }
    }

    debug!(
        kinds = report.kinds.len(),
        customs = report.customs.len(),
        unknown_factories = report.unknown_factories.len(),
        opaque_calls = report.opaque_calls.len(),
        symbols_visited = visited.len(),
        "inferred outcomes"
    );
    report
}

/// Schedules a symbol body unless it was already entered.
fn enter<'a, S: SymbolSource + ?Sized>(
    id: SymbolId,
    symbols: &'a S,
    visited: &mut BTreeSet<SymbolId>,
    stack: &mut Vec<&'a SyntaxNode>,
) {
    if visited.insert(id) {
        if let Some(body) = symbols.body(id) {
            trace!(symbol = %id, "scanning symbol");
            stack.push(body);
        }
    }
}

/// Records a call on an outcome receiver; returns false for other calls.
fn factory_call<S: SymbolSource + ?Sized>(
    callee: &Callee,
    args: &[SyntaxNode],
    symbols: &S,
    factories: &FactoryTable,
    report: &mut InferenceReport,
) -> bool {
    let [.., receiver, method] = callee.path.as_slice() else {
        return false;
    };
    if !factories.is_receiver(receiver) {
        return false;
    }

    match factories.lookup(method) {
        Some(FactoryRule::Kind(kind)) => {
            trace!(factory = %method, outcome = %kind.label(), "outcome factory call");
            report.kinds.insert(kind.clone());
        }
        Some(FactoryRule::Custom) => {
            let code = args.get(1).and_then(|arg| fold_code(arg, symbols));
            let status = args.first().and_then(|arg| fold_status(arg, symbols));
            match code {
                Some(code) => {
                    trace!(code = %code, status = ?status, "custom outcome");
                    report.customs.insert(CustomOutcome { status, code });
                }
                None => trace!("custom outcome with undeterminable code ignored"),
            }
        }
        None => {
            report
                .unknown_factories
                .insert(format!("{receiver}::{method}"));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{SymbolRef, SymbolTable};

    fn factory(name: &str, args: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::call(Callee::new(&format!("Error::{name}"), CallTarget::External), args)
    }

    fn local_call(name: &str, id: u32) -> SyntaxNode {
        SyntaxNode::call(Callee::new(name, CallTarget::Local(SymbolId(id))), vec![])
    }

    fn run(root: &SyntaxNode, symbols: &SymbolTable) -> InferenceReport {
        infer(root, symbols, &FactoryTable::builtin())
    }

    #[test]
    fn test_direct_factory_calls() {
        let body = SyntaxNode::group(vec![
            factory("not_found", vec![]),
            factory("conflict", vec![]),
            factory("not_found", vec![]),
        ]);
        let report = run(&body, &SymbolTable::new());
        assert_eq!(
            report.kinds.into_iter().collect::<Vec<_>>(),
            vec![OutcomeKind::NotFound, OutcomeKind::Conflict]
        );
    }

    #[test]
    fn test_factory_inside_arguments_and_receivers() {
        let body = SyntaxNode::method_call(
            SyntaxNode::reference(SymbolRef::unresolved("user")),
            Callee::new("ok_or", CallTarget::External),
            vec![factory("unauthorized", vec![])],
        );
        assert!(run(&body, &SymbolTable::new())
            .kinds
            .contains(&OutcomeKind::Unauthorized));
    }

    #[test]
    fn test_follows_local_symbols() {
        let symbols = SymbolTable::new()
            .with(SymbolId(1), local_call("load", 2))
            .with(SymbolId(2), factory("forbidden", vec![]));
        let report = run(&local_call("check", 1), &symbols);
        assert!(report.kinds.contains(&OutcomeKind::Forbidden));
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let symbols = SymbolTable::new()
            .with(
                SymbolId(1),
                SyntaxNode::group(vec![local_call("b", 2), factory("validation", vec![])]),
            )
            .with(SymbolId(2), local_call("a", 1));
        let report = run(&local_call("a", 1), &symbols);
        assert_eq!(report.kinds.len(), 1);
        assert!(report.kinds.contains(&OutcomeKind::Validation));
    }

    #[test]
    fn test_self_reference_terminates() {
        let symbols = SymbolTable::new().with(SymbolId(7), local_call("again", 7));
        assert!(run(&local_call("again", 7), &symbols).is_empty());
    }

    #[test]
    fn test_custom_outcomes() {
        let symbols = SymbolTable::new().with(SymbolId(1), SyntaxNode::literal("Order.Locked"));
        let body = SyntaxNode::group(vec![
            factory(
                "custom",
                vec![
                    SyntaxNode::literal(423i64),
                    SyntaxNode::reference(SymbolRef::resolved("LOCKED", SymbolId(1))),
                ],
            ),
            // Code known, status computed at runtime.
            factory(
                "custom",
                vec![
                    SyntaxNode::reference(SymbolRef::unresolved("status")),
                    SyntaxNode::literal("Order.Dynamic"),
                ],
            ),
            // Code undeterminable: ignored.
            factory(
                "custom",
                vec![
                    SyntaxNode::literal(409i64),
                    SyntaxNode::reference(SymbolRef::unresolved("code")),
                ],
            ),
        ]);
        let report = run(&body, &symbols);
        assert_eq!(report.customs.len(), 2);
        assert!(report
            .customs
            .contains(&CustomOutcome::new(423, "Order.Locked")));
        assert!(report.customs.contains(&CustomOutcome {
            status: None,
            code: "Order.Dynamic".into()
        }));
        assert_eq!(report.outcomes().len(), 2);
    }

    #[test]
    fn test_unknown_factory() {
        let report = run(&factory("teapot", vec![]), &SymbolTable::new());
        assert!(report.kinds.is_empty());
        assert!(report.unknown_factories.contains("Error::teapot"));
    }

    #[test]
    fn test_unknown_receiver_is_not_a_factory() {
        let body = SyntaxNode::call(Callee::new("Problem::not_found", CallTarget::External), vec![]);
        assert!(run(&body, &SymbolTable::new()).is_empty());
    }

    #[test]
    fn test_opaque_calls_are_collected_not_crossed() {
        let body = SyntaxNode::method_call(
            SyntaxNode::reference(SymbolRef::unresolved("repo")),
            Callee::new("UserRepository::find", CallTarget::Opaque),
            vec![],
        );
        let report = run(&body, &SymbolTable::new());
        assert!(report.opaque_calls.contains("UserRepository::find"));
        assert!(report.kinds.is_empty());
    }

    #[test]
    fn test_alternate_factory_table() {
        let factories = FactoryTable::empty()
            .with_receiver("Problem")
            .with_factory("gone", FactoryRule::Kind(OutcomeKind::NotFound));
        let body = SyntaxNode::call(Callee::new("Problem::gone", CallTarget::External), vec![]);
        let report = infer(&body, &SymbolTable::new(), &factories);
        assert!(report.kinds.contains(&OutcomeKind::NotFound));
        // The built-in receiver is unknown to the alternate table.
        let report = infer(&factory("not_found", vec![]), &SymbolTable::new(), &factories);
        assert!(report.is_empty());
    }
}
