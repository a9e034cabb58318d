//! Checks that run over the classified parameter list.

use std::collections::BTreeMap;

use heron_core::{
    AnalysisTables, AttributeKind, BindingSource, BodyGroup, Diagnostic, DiagnosticCode, Location,
    ParameterDescriptor, ParameterSignature,
};
use heron_route::RouteParameters;
use tracing::debug;

/// Reports parameters that carry more than one explicit binding family.
///
/// The priority chain has already picked a source; the conflict is still an
/// error because the declaration does not say what the author meant.
pub fn ambiguity(handler: &str, parameters: &[ParameterSignature]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for top in parameters {
        let nested = top
            .ty
            .widest_public_constructor()
            .filter(|_| top.has_attribute(AttributeKind::Expand))
            .map(|c| c.parameters.as_slice())
            .unwrap_or_default();

        for sig in std::iter::once(top).chain(nested) {
            let families = sig.explicit_families();
            if families.len() > 1 {
                let labels: Vec<_> = families.iter().map(AttributeKind::label).collect();
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::AmbiguousParameterBinding,
                        Location::handler(handler).with_parameter(&top.name),
                    )
                    .with_arg(&sig.name)
                    .with_arg(labels.join(", ")),
                );
            }
        }
    }
    diagnostics
}

/// Reports a handler that reads the request body more than once.
///
/// Deserialized body, form values, raw stream and body reader are mutually
/// exclusive groups, and the body, stream and reader groups admit a single
/// parameter each. Parameter-object children count.
pub fn body_exclusivity(handler: &str, descriptors: &[ParameterDescriptor]) -> Option<Diagnostic> {
    let mut groups: BTreeMap<BodyGroup, Vec<&str>> = BTreeMap::new();
    for leaf in descriptors.iter().flat_map(ParameterDescriptor::leaves) {
        if let Some(group) = leaf.source.body_group() {
            groups.entry(group).or_default().push(&leaf.signature.name);
        }
    }

    let repeated = groups
        .iter()
        .any(|(group, names)| *group != BodyGroup::Form && names.len() > 1);
    if groups.len() <= 1 && !repeated {
        return None;
    }

    let summary: Vec<_> = groups
        .iter()
        .flat_map(|(group, names)| names.iter().map(move |n| format!("{n} ({})", group.label())))
        .collect();
    debug!(handler, sources = ?summary, "request body consumed more than once");
    Some(
        Diagnostic::new(DiagnosticCode::MultipleBodySources, Location::handler(handler))
            .with_arg(handler)
            .with_arg(summary.join(", ")),
    )
}

/// Warns when a route constraint rejects the bound parameter's type.
///
/// Nullability is unwrapped only for optional route parameters; a required
/// segment bound to an optional parameter is compared as `Option<T>`.
/// Catch-all segments must bind a textual type.
pub fn constraints(
    handler: &str,
    descriptors: &[ParameterDescriptor],
    route: &RouteParameters,
    tables: &AnalysisTables,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for top in descriptors {
        for leaf in top.leaves() {
            let Some(param) = leaf.source.route_name().and_then(|n| route.get(n)) else {
                continue;
            };
            let sig = &leaf.signature;
            let compared = if param.optional {
                tables.types.canonical_name(&sig.ty.name)
            } else {
                tables.types.canonical_name(&sig.display_type())
            };

            let mismatch = |constraint: &str| {
                Diagnostic::new(
                    DiagnosticCode::RouteConstraintTypeMismatch,
                    Location::handler(handler)
                        .with_parameter(&top.signature.name)
                        .with_span(param.span),
                )
                .with_arg(&param.name)
                .with_arg(constraint)
                .with_arg(sig.display_type())
            };

            for name in param.constraint_names() {
                if !tables.constraints.accepts(name, &compared) {
                    diagnostics.push(mismatch(name));
                }
            }
            if param.catch_all && !tables.types.is_textual(&compared) {
                diagnostics.push(mismatch("*"));
            }
        }
    }
    diagnostics
}

/// Reports route parameters that no handler parameter binds.
pub fn completeness(
    handler: &str,
    descriptors: &[ParameterDescriptor],
    route: &RouteParameters,
) -> Vec<Diagnostic> {
    let bound: Vec<&str> = descriptors
        .iter()
        .flat_map(ParameterDescriptor::leaves)
        .filter_map(|leaf| match &leaf.source {
            BindingSource::Route(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();

    route
        .iter()
        .filter(|param| !bound.iter().any(|name| param.matches(name)))
        .map(|param| {
            Diagnostic::new(
                DiagnosticCode::RouteParameterNotBound,
                Location::handler(handler).with_span(param.span),
            )
            .with_arg(&param.name)
        })
        .collect()
}
