//! Endpoint contract construction.

use std::collections::BTreeSet;

use heron_core::{
    is_representable_status, ContractMode, DeclaredOutcome, EndpointContract, FallbackReason,
    MiddlewarePolicy, OutcomeDescriptor, OutcomeKind, OutcomeOrigin, PayloadShape, SuccessKind,
};
use http::{Method, StatusCode};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Default maximum number of union members.
pub const DEFAULT_ARITY_LIMIT: usize = 6;

/// Everything the builder needs to know about one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInput {
    /// What the handler returns on success.
    pub success: SuccessKind,
    /// HTTP method the handler serves.
    pub method: Method,
    /// Outcomes inferred from the handler body.
    pub inferred: Vec<OutcomeKind>,
    /// Outcomes declared on the handler.
    pub declared: Vec<DeclaredOutcome>,
    /// Middleware that can short-circuit the request.
    pub middleware: MiddlewarePolicy,
    /// Maximum union size.
    pub arity_limit: usize,
}

impl ContractInput {
    /// Creates an input with no error outcomes and the default arity limit.
    #[must_use]
    pub fn new(success: SuccessKind, method: Method) -> Self {
        Self {
            success,
            method,
            inferred: Vec::new(),
            declared: Vec::new(),
            middleware: MiddlewarePolicy::default(),
            arity_limit: DEFAULT_ARITY_LIMIT,
        }
    }

    /// Sets the inferred outcomes.
    #[must_use]
    pub fn inferred(mut self, inferred: impl IntoIterator<Item = OutcomeKind>) -> Self {
        self.inferred = inferred.into_iter().collect();
        self
    }

    /// Sets the declared outcomes.
    #[must_use]
    pub fn declared(mut self, declared: impl IntoIterator<Item = DeclaredOutcome>) -> Self {
        self.declared = declared.into_iter().collect();
        self
    }

    /// Sets the middleware policy.
    #[must_use]
    pub fn middleware(mut self, middleware: MiddlewarePolicy) -> Self {
        self.middleware = middleware;
        self
    }

    /// Sets the arity limit.
    #[must_use]
    pub fn arity_limit(mut self, limit: usize) -> Self {
        self.arity_limit = limit;
        self
    }
}

/// Returns the success status and payload shape.
///
/// Creating verbs that return a plain value answer `201 Created`.
#[must_use]
pub fn success_outcome(success: &SuccessKind, method: &Method) -> OutcomeDescriptor {
    let (status, shape) = match success {
        SuccessKind::NoContent => (StatusCode::NO_CONTENT, PayloadShape::Empty),
        SuccessKind::Accepted(None) => (StatusCode::ACCEPTED, PayloadShape::Empty),
        SuccessKind::Accepted(Some(ty)) => (StatusCode::ACCEPTED, PayloadShape::Value(ty.clone())),
        SuccessKind::Created(ty) => (StatusCode::CREATED, PayloadShape::Value(ty.clone())),
        SuccessKind::Value(ty) if *method == Method::POST => {
            (StatusCode::CREATED, PayloadShape::Value(ty.clone()))
        }
        SuccessKind::Value(ty) => (StatusCode::OK, PayloadShape::Value(ty.clone())),
    };
    OutcomeDescriptor::new(status.as_u16(), shape, OutcomeOrigin::Success)
}

/// Error members keyed by `(status, shape)`; the first insertion wins.
#[derive(Default)]
struct ErrorSet {
    members: IndexMap<(u16, PayloadShape), OutcomeOrigin>,
    unknown_status: bool,
}

impl ErrorSet {
    fn add(&mut self, status: u16, shape: PayloadShape, origin: OutcomeOrigin) {
        self.members.entry((status, shape)).or_insert(origin);
    }

    fn add_kind(&mut self, kind: &OutcomeKind, origin: OutcomeOrigin) {
        match kind.status() {
            Some(status) => self.add(status, kind.shape(), origin),
            None => self.unknown_status = true,
        }
    }
}

/// Builds the response contract of one handler.
///
/// # Example
///
/// ```
/// use heron_contract::{build, ContractInput};
/// use heron_core::{ContractMode, OutcomeKind, SuccessKind};
/// use http::Method;
///
/// let contract = build(
///     &ContractInput::new(SuccessKind::Value("User".into()), Method::GET)
///         .inferred([OutcomeKind::NotFound]),
/// );
///
/// assert_eq!(contract.mode, ContractMode::Union);
/// let statuses: Vec<_> = contract.members().map(|m| m.status).collect();
/// assert_eq!(statuses, vec![200, 400, 404, 500]);
/// ```
pub fn build(input: &ContractInput) -> EndpointContract {
    let success = success_outcome(&input.success, &input.method);

    let mut errors = ErrorSet::default();
    errors.add(
        StatusCode::BAD_REQUEST.as_u16(),
        PayloadShape::Problem,
        OutcomeOrigin::BindingFailure,
    );
    errors.add(
        StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        PayloadShape::Problem,
        OutcomeOrigin::SafetyNet,
    );

    for kind in &input.inferred {
        errors.add_kind(kind, OutcomeOrigin::Inferred);
    }
    for declared in &input.declared {
        match &declared.kind {
            Some(kind) => errors.add_kind(kind, OutcomeOrigin::Declared),
            None if declared.status == 0 => errors.unknown_status = true,
            None => errors.add(declared.status, declared.shape(), OutcomeOrigin::Declared),
        }
    }

    if input.middleware.authorization_enforced() {
        errors.add(
            StatusCode::UNAUTHORIZED.as_u16(),
            PayloadShape::Empty,
            OutcomeOrigin::Middleware,
        );
        errors.add(
            StatusCode::FORBIDDEN.as_u16(),
            PayloadShape::Empty,
            OutcomeOrigin::Middleware,
        );
    }
    if input.middleware.rate_limit_enforced() {
        errors.add(
            StatusCode::TOO_MANY_REQUESTS.as_u16(),
            PayloadShape::Empty,
            OutcomeOrigin::Middleware,
        );
    }

    let mut members: Vec<OutcomeDescriptor> = errors
        .members
        .into_iter()
        .map(|((status, shape), origin)| OutcomeDescriptor::new(status, shape, origin))
        .collect();
    let count = members.len() + 1;

    let reason = fallback_reason(
        &success,
        &members,
        errors.unknown_status,
        count,
        input.arity_limit,
    );

    match reason {
        None => {
            members.sort_by(|a, b| a.key().cmp(&b.key()));
            trace!(members = count, arity_limit = input.arity_limit, "typed response union");
            EndpointContract {
                success,
                errors: members,
                arity_limit: input.arity_limit,
                mode: ContractMode::Union,
                fallback_status_codes: BTreeSet::new(),
                fallback_reason: None,
            }
        }
        Some(reason) => {
            let codes: BTreeSet<u16> = std::iter::once(success.status)
                .chain(members.iter().map(|m| m.status))
                .collect();
            debug!(
                members = count,
                arity_limit = input.arity_limit,
                reason = %reason.describe(),
                "response contract degraded to dynamic result"
            );
            EndpointContract {
                success,
                errors: Vec::new(),
                arity_limit: input.arity_limit,
                mode: ContractMode::Fallback,
                fallback_status_codes: codes,
                fallback_reason: Some(reason),
            }
        }
    }
}

fn fallback_reason(
    success: &OutcomeDescriptor,
    errors: &[OutcomeDescriptor],
    unknown_status: bool,
    count: usize,
    limit: usize,
) -> Option<FallbackReason> {
    if unknown_status {
        return Some(FallbackReason::UnrepresentableStatus { status: None });
    }
    if let Some(status) = std::iter::once(success)
        .chain(errors)
        .map(|m| m.status)
        .find(|s| !is_representable_status(*s))
    {
        return Some(FallbackReason::UnrepresentableStatus {
            status: Some(status),
        });
    }
    if count > limit {
        return Some(FallbackReason::ArityExceeded {
            members: count,
            limit,
        });
    }
    if count < 2 {
        return Some(FallbackReason::TooFewMembers { members: count });
    }
    None
}

#[cfg(test)]
mod tests {
    use heron_core::CustomOutcome;

    use super::*;

    fn get(ty: &str) -> ContractInput {
        ContractInput::new(SuccessKind::Value(ty.into()), Method::GET)
    }

    fn statuses(contract: &EndpointContract) -> Vec<u16> {
        contract.members().map(|m| m.status).collect()
    }

    #[test]
    fn test_success_status_codes() {
        let value = SuccessKind::Value("User".into());
        assert_eq!(success_outcome(&value, &Method::GET).status, 200);
        assert_eq!(success_outcome(&value, &Method::POST).status, 201);
        assert_eq!(success_outcome(&value, &Method::PUT).status, 200);
        assert_eq!(
            success_outcome(&SuccessKind::NoContent, &Method::DELETE).shape,
            PayloadShape::Empty
        );
        assert_eq!(success_outcome(&SuccessKind::NoContent, &Method::POST).status, 204);
        assert_eq!(
            success_outcome(&SuccessKind::Created("User".into()), &Method::PUT).status,
            201
        );
        assert_eq!(success_outcome(&SuccessKind::Accepted(None), &Method::POST).status, 202);
    }

    #[test]
    fn test_defaults_only() {
        let contract = build(&get("Health"));
        assert!(contract.is_union());
        assert_eq!(statuses(&contract), vec![200, 400, 500]);
        assert_eq!(contract.errors[0].origin, OutcomeOrigin::BindingFailure);
        assert_eq!(contract.errors[1].origin, OutcomeOrigin::SafetyNet);
    }

    #[test]
    fn test_two_inferred_kinds_make_four_members() {
        let contract = build(&get("User").inferred([OutcomeKind::NotFound, OutcomeKind::Failure]));
        assert_eq!(contract.mode, ContractMode::Union);
        assert_eq!(statuses(&contract), vec![200, 400, 404, 500]);
        // The safety net was inserted first and keeps its origin.
        assert_eq!(contract.errors[2].origin, OutcomeOrigin::SafetyNet);
        assert_eq!(contract.errors[1].origin, OutcomeOrigin::Inferred);
    }

    #[test]
    fn test_validation_and_binding_failure_stay_separate() {
        let contract = build(&get("User").inferred([OutcomeKind::Validation]));
        assert_eq!(statuses(&contract), vec![200, 400, 400, 500]);
        assert_eq!(contract.errors[0].shape, PayloadShape::Problem);
        assert_eq!(contract.errors[1].shape, PayloadShape::ValidationProblem);
    }

    #[test]
    fn test_five_kinds_exceed_default_limit() {
        let contract = build(&get("User").inferred([
            OutcomeKind::Validation,
            OutcomeKind::Unauthorized,
            OutcomeKind::Forbidden,
            OutcomeKind::NotFound,
            OutcomeKind::Conflict,
        ]));
        assert_eq!(contract.mode, ContractMode::Fallback);
        assert!(contract.errors.is_empty());
        assert_eq!(
            contract.fallback_status_codes.iter().copied().collect::<Vec<_>>(),
            vec![200, 400, 401, 403, 404, 409, 500]
        );
        assert_eq!(
            contract.fallback_reason,
            Some(FallbackReason::ArityExceeded {
                members: 8,
                limit: 6
            })
        );
    }

    #[test]
    fn test_arity_boundary() {
        let input = get("User").inferred([OutcomeKind::NotFound, OutcomeKind::Conflict]);
        let at_limit = build(&input.clone().arity_limit(5));
        let over_limit = build(&input.arity_limit(4));

        assert!(at_limit.is_union());
        assert_eq!(over_limit.mode, ContractMode::Fallback);
        assert_eq!(at_limit.status_codes(), over_limit.status_codes());
    }

    #[test]
    fn test_unrepresentable_custom_status() {
        let contract = build(
            &get("Order").inferred([OutcomeKind::Custom(CustomOutcome::new(422, "Order.Invalid"))]),
        );
        assert_eq!(contract.mode, ContractMode::Fallback);
        assert!(contract.fallback_status_codes.contains(&422));
        assert_eq!(
            contract.fallback_reason,
            Some(FallbackReason::UnrepresentableStatus { status: Some(422) })
        );
    }

    #[test]
    fn test_representable_custom_status_joins_union() {
        let contract =
            build(&get("Order").inferred([OutcomeKind::Custom(CustomOutcome::new(409, "Dup"))]));
        assert!(contract.is_union());
        assert_eq!(statuses(&contract), vec![200, 400, 409, 500]);
    }

    #[test]
    fn test_unknown_custom_status_forces_fallback() {
        let contract = build(&get("Order").inferred([OutcomeKind::Custom(CustomOutcome {
            status: None,
            code: "Order.Dynamic".into(),
        })]));
        assert_eq!(contract.mode, ContractMode::Fallback);
        assert_eq!(
            contract.fallback_status_codes.iter().copied().collect::<Vec<_>>(),
            vec![200, 400, 500]
        );
    }

    #[test]
    fn test_declared_outcomes_merge_with_inferred() {
        let contract = build(
            &get("User")
                .inferred([OutcomeKind::NotFound])
                .declared([DeclaredOutcome::status(404), DeclaredOutcome::kind(OutcomeKind::Conflict)]),
        );
        assert_eq!(statuses(&contract), vec![200, 400, 404, 409, 500]);
        assert_eq!(contract.errors[1].origin, OutcomeOrigin::Inferred);
        assert_eq!(contract.errors[2].origin, OutcomeOrigin::Declared);
    }

    #[test]
    fn test_declared_unrepresentable_status() {
        let contract = build(&get("User").declared([DeclaredOutcome::status(418)]));
        assert_eq!(contract.mode, ContractMode::Fallback);
        assert!(contract.fallback_status_codes.contains(&418));
    }

    #[test]
    fn test_middleware_outcomes() {
        let policy = MiddlewarePolicy {
            requires_authorization: true,
            rate_limited: true,
            ..MiddlewarePolicy::default()
        };
        let contract = build(&get("User").middleware(policy).arity_limit(8));
        assert_eq!(statuses(&contract), vec![200, 400, 401, 403, 429, 500]);
        assert!(contract.errors[1..4]
            .iter()
            .all(|m| m.shape == PayloadShape::Empty && m.origin == OutcomeOrigin::Middleware));

        let anonymous = MiddlewarePolicy {
            allow_anonymous: true,
            rate_limiting_disabled: true,
            ..policy
        };
        assert_eq!(statuses(&build(&get("User").middleware(anonymous))), vec![200, 400, 500]);
    }

    #[test]
    fn test_middleware_unauthorized_is_separate_from_inferred() {
        let policy = MiddlewarePolicy {
            requires_authorization: true,
            ..MiddlewarePolicy::default()
        };
        let contract = build(
            &get("User")
                .inferred([OutcomeKind::Unauthorized])
                .middleware(policy)
                .arity_limit(8),
        );
        assert_eq!(statuses(&contract), vec![200, 400, 401, 401, 403, 500]);
    }

    #[test]
    fn test_too_few_members() {
        let reason = fallback_reason(
            &OutcomeDescriptor::new(200, PayloadShape::Empty, OutcomeOrigin::Success),
            &[],
            false,
            1,
            6,
        );
        assert_eq!(reason, Some(FallbackReason::TooFewMembers { members: 1 }));
    }
}
