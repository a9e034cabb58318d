//! End-to-end analysis of representative handlers.

use heron::infer::{CallTarget, Callee, SyntaxNode};
use heron::prelude::*;
use heron::{ParameterSignature, TypeRef};
use heron_core::{FallbackReason, OutcomeKind};

fn factory_call(path: &str) -> SyntaxNode {
    SyntaxNode::call(
        Callee::new(path, CallTarget::External),
        vec![SyntaxNode::literal("resource")],
    )
}

fn body_calling(paths: &[&str]) -> HandlerBody {
    HandlerBody::new(SyntaxNode::group(paths.iter().map(|p| factory_call(p)).collect()))
}

fn get_user() -> HandlerInput {
    HandlerInput::new(
        "get_user",
        Method::GET,
        "/users/{id}",
        SuccessKind::Value("User".into()),
    )
    .with_parameter(ParameterSignature::new(0, "id", TypeRef::named("i32")))
}

#[test]
fn test_constraint_mismatch_only_warns() {
    let input = HandlerInput::new(
        "get_user",
        Method::GET,
        "/users/{id:int}",
        SuccessKind::Value("User".into()),
    )
    .with_parameter(ParameterSignature::new(0, "id", TypeRef::named("String")));

    let analysis = Analyzer::default().analyze(&input);

    let mismatch: Vec<_> = analysis
        .diagnostics_with(DiagnosticCode::RouteConstraintTypeMismatch)
        .collect();
    assert_eq!(mismatch.len(), 1);
    assert_eq!(mismatch[0].severity, Severity::Warning);
    assert!(analysis.usable);
    assert_eq!(analysis.parameters[0].source, BindingSource::Route("id".into()));

    let contract = analysis.contract.unwrap();
    assert!(contract.is_union());
    assert_eq!(
        contract.status_codes().into_iter().collect::<Vec<_>>(),
        vec![200, 400, 500]
    );
}

#[test]
fn test_unbound_route_parameter_is_an_error() {
    let input = HandlerInput::new(
        "get_user",
        Method::GET,
        "/users/{id}",
        SuccessKind::Value("User".into()),
    );

    let analysis = Analyzer::default().analyze(&input);

    let unbound: Vec<_> = analysis
        .diagnostics_with(DiagnosticCode::RouteParameterNotBound)
        .collect();
    assert_eq!(unbound.len(), 1);
    assert_eq!(unbound[0].severity, Severity::Error);
    assert_eq!(unbound[0].args, vec!["id".to_string()]);
    assert!(!analysis.usable);
}

#[test]
fn test_body_extractor_and_service_on_post() {
    let analyses = heron::analyze_source(
        r#"
        pub struct CreateRequest {
            pub name: String,
        }

        pub trait UserService {
            fn create(&self, request: &CreateRequest) -> Result<User, Error>;
        }

        #[handler(method = "POST", path = "/users")]
        #[produces(409)]
        async fn create_user(
            Json(body): Json<CreateRequest>,
            svc: Arc<dyn UserService>,
        ) -> Result<Created<User>, Error> {
            let user = svc.create(&body)?;
            Ok(Created(user))
        }
        "#,
    )
    .unwrap();

    let analysis = &analyses[0];
    assert_eq!(analysis.parameters[0].source, BindingSource::Body);
    assert_eq!(analysis.parameters[1].source, BindingSource::Service);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert!(analysis.usable);

    let contract = analysis.contract.as_ref().unwrap();
    assert_eq!(contract.success.status, 201);
    assert!(contract.status_codes().contains(&409));
}

#[test]
fn test_plain_dto_is_the_body_on_post() {
    let analyses = heron::analyze_source(
        r#"
        pub struct CreateRequest {
            pub name: String,
        }

        pub trait UserService {
            fn create(&self, request: &CreateRequest) -> Result<User, Error>;
        }

        #[handler(method = "POST", path = "/users")]
        #[produces(409)]
        async fn create_user(
            body: CreateRequest,
            svc: Arc<dyn UserService>,
        ) -> Result<Created<User>, Error> {
            let user = svc.create(&body)?;
            Ok(Created(user))
        }

        #[handler(method = "GET", path = "/users")]
        async fn list_users(filter: CreateRequest) -> Json<Vec<User>> {
            Json(Vec::new())
        }
        "#,
    )
    .unwrap();

    let create = &analyses[0];
    assert_eq!(create.parameters[0].source, BindingSource::Body);
    assert_eq!(create.parameters[1].source, BindingSource::Service);
    assert!(create.usable, "{:?}", create.diagnostics);

    let list = &analyses[1];
    assert_eq!(list.parameters[0].source, BindingSource::Service);
}

#[test]
fn test_two_factories_make_a_four_member_union() {
    let input =
        get_user().with_body(body_calling(&["Error::not_found", "Error::failure"]));

    let analysis = Analyzer::default().analyze(&input);
    let contract = analysis.contract.unwrap();

    assert_eq!(contract.mode, ContractMode::Union);
    let members: Vec<u16> = contract.members().map(|m| m.status).collect();
    assert_eq!(members, vec![200, 400, 404, 500]);
    assert!(!analysis
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::TooManyOutcomeTypes));
}

#[test]
fn test_five_kinds_fall_back_to_status_codes() {
    let input = get_user().with_body(body_calling(&[
        "Error::validation",
        "Error::unauthorized",
        "Error::forbidden",
        "Error::not_found",
        "Error::conflict",
    ]));

    let analysis = Analyzer::default().analyze(&input);
    let contract = analysis.contract.as_ref().unwrap();

    assert_eq!(contract.mode, ContractMode::Fallback);
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

    let info: Vec<_> = analysis
        .diagnostics_with(DiagnosticCode::TooManyOutcomeTypes)
        .collect();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].severity, Severity::Info);
    assert!(analysis.usable);
}

#[test]
fn test_malformed_route_skips_only_that_handler() {
    let good = get_user();
    let bad = HandlerInput::new("broken", Method::GET, "/users/{id", SuccessKind::NoContent);

    let analyses = Analyzer::default()
        .with_parallel(true)
        .with_workers(2)
        .analyze_batch(&[bad, good.clone()]);

    assert_eq!(analyses.len(), 2);
    assert!(analyses[0].has_diagnostic(DiagnosticCode::RouteSyntaxError));
    assert!(analyses[0].contract.is_none());
    assert_eq!(analyses[1], Analyzer::default().analyze(&good));
}

#[test]
fn test_parallel_batch_matches_sequential() {
    let inputs: Vec<_> = (0..12)
        .map(|i| {
            let mut input = get_user();
            input.name = format!("get_user_{i}");
            if i % 3 == 0 {
                input = input.with_body(body_calling(&["Error::not_found"]));
            }
            input
        })
        .collect();

    let sequential = Analyzer::default().with_parallel(false).analyze_batch(&inputs);
    let parallel = Analyzer::default()
        .with_parallel(true)
        .with_workers(4)
        .analyze_batch(&inputs);

    assert_eq!(sequential, parallel);
    assert_eq!(parallel[3].handler, "get_user_3");
}

#[test]
fn test_declared_outcomes_cover_opaque_calls() {
    let opaque = SyntaxNode::call(Callee::new("Repo::load", CallTarget::Opaque), Vec::new());
    let undeclared = get_user().with_body(HandlerBody::new(opaque.clone()));
    let declared = get_user()
        .with_body(HandlerBody::new(opaque))
        .with_declared(DeclaredOutcome::kind(OutcomeKind::NotFound));

    let analyzer = Analyzer::default();

    let analysis = analyzer.analyze(&undeclared);
    assert!(analysis.has_diagnostic(DiagnosticCode::UnresolvedOutcomeCall));
    assert!(!analysis.usable);

    let analysis = analyzer.analyze(&declared);
    assert!(!analysis.has_diagnostic(DiagnosticCode::UnresolvedOutcomeCall));
    assert!(analysis.contract.unwrap().status_codes().contains(&404));
}

#[test]
fn test_cache_returns_equal_analyses() {
    let cache = AnalysisCache::new(Analyzer::default());
    let input = get_user().with_body(body_calling(&["Error::not_found"]));

    let first = cache.get_or_analyze(&input);
    let second = cache.get_or_analyze(&input.clone());

    assert_eq!(first, second);
    assert_eq!(first, Analyzer::default().analyze(&input));
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn test_analysis_serializes_to_json() {
    let analysis =
        Analyzer::default().analyze(&get_user().with_body(body_calling(&["Error::conflict"])));
    let value = serde_json::to_value(&analysis).unwrap();
    assert_eq!(value["handler"], "get_user");
    assert_eq!(value["usable"], true);
    assert!(value["contract"].is_object());
}
