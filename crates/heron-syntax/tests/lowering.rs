//! End-to-end lowering of realistic handler files.

use heron_core::{
    AttributeKind, DeclaredOutcome, FactoryShape, FactoryTable, OutcomeKind, ParseShape,
    SuccessKind,
};
use heron_infer::{infer, HandlerInput};
use heron_syntax::{lower_source, LowerError};
use http::Method;

const ORDERS: &str = r#"
    use std::sync::Arc;

    const ORDER_LOCKED: &str = "Order.Locked";

    pub struct OrderId(u64);

    impl std::str::FromStr for OrderId {
        type Err = ParseError;
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            s.parse().map(OrderId).map_err(ParseError::from)
        }
    }

    pub struct Tenant;

    impl BindAsync for Tenant {
        async fn bind(ctx: &RequestContext) -> Result<Self, Error> {
            Ok(Tenant)
        }
    }

    pub struct OrderFilter {
        #[query(name = "status")]
        pub state: Option<String>,
        pub page: u32,
    }

    pub trait OrderStore {
        fn load(&self, id: &OrderId) -> Result<Order, Error>;
    }

    fn ensure_unlocked(order: &Order) -> Result<(), Error> {
        if order.locked {
            return Err(Error::custom(423, ORDER_LOCKED));
        }
        Ok(())
    }

    fn find(id: &OrderId) -> Result<Order, Error> {
        lookup(id).ok_or_else(|| Error::not_found("order"))
    }

    #[handler(method = "GET", path = "/orders/{id}")]
    pub async fn get_order(id: OrderId, tenant: Tenant) -> Result<Json<Order>, Error> {
        let order = find(&id)?;
        Ok(Json(order))
    }

    #[handler(method = "DELETE", path = "/orders/{id}")]
    #[authorize]
    pub async fn delete_order(id: OrderId, store: Inject<Arc<dyn OrderStore>>) -> Result<NoContent, Error> {
        let order = store.load(&id)?;
        ensure_unlocked(&order)?;
        Ok(NoContent)
    }

    #[handler(path = "/orders")]
    #[produces(409)]
    pub async fn list_orders(#[expand] filter: OrderFilter, tags: Vec<String>) -> Result<Json<Vec<Order>>, Error> {
        Err(Error::validation("filter"))
    }

    #[handler(method = "post", path = "/orders")]
    pub async fn create_order(Json(body): Json<CreateOrder>) -> Result<Created<Order>, Error> {
        Err(Error::conflict(format!("{}", body.sku)))
    }
"#;

fn lowered() -> Vec<HandlerInput> {
    lower_source(ORDERS).unwrap()
}

fn by_name<'a>(handlers: &'a [HandlerInput], name: &str) -> &'a HandlerInput {
    handlers.iter().find(|h| h.name == name).unwrap()
}

#[test]
fn test_every_handler_is_lowered_in_order() {
    let handlers = lowered();
    let names: Vec<_> = handlers.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["get_order", "delete_order", "list_orders", "create_order"]
    );
    assert_eq!(handlers[0].method, Method::GET);
    assert_eq!(handlers[1].method, Method::DELETE);
    assert_eq!(handlers[3].method, Method::POST);
}

#[test]
fn test_signature_facts() {
    let handlers = lowered();

    let get = by_name(&handlers, "get_order");
    assert_eq!(get.route_template, "/orders/{id}");
    assert_eq!(get.success, SuccessKind::Value("Order".into()));
    assert_eq!(get.parameters[0].ty.capabilities.parse, Some(ParseShape::Plain));
    assert_eq!(
        get.parameters[1].ty.capabilities.async_factory,
        Some(FactoryShape::Context)
    );

    let delete = by_name(&handlers, "delete_order");
    assert_eq!(delete.success, SuccessKind::NoContent);
    assert!(delete.middleware.authorization_enforced());
    assert!(delete.parameters[1].has_attribute(AttributeKind::Service));

    let list = by_name(&handlers, "list_orders");
    assert_eq!(list.declared_outcomes, vec![DeclaredOutcome::status(409)]);
    let filter = &list.parameters[0];
    assert!(filter.has_attribute(AttributeKind::Expand));
    let ctor = filter.ty.widest_public_constructor().unwrap();
    assert_eq!(ctor.parameters[0].name, "state");
    assert!(ctor.parameters[0].nullable);
    assert!(list.parameters[1].is_collection);

    let create = by_name(&handlers, "create_order");
    assert_eq!(create.success, SuccessKind::Created("Order".into()));
    assert_eq!(create.parameters[0].name, "body");
    assert!(create.parameters[0].has_attribute(AttributeKind::Body));
}

#[test]
fn test_bodies_follow_helpers() {
    let handlers = lowered();
    let factories = FactoryTable::builtin();

    let get = by_name(&handlers, "get_order");
    let report = infer(&get.body.root, &get.body.symbols, &factories);
    assert_eq!(report.outcomes(), vec![OutcomeKind::NotFound]);

    let delete = by_name(&handlers, "delete_order");
    let report = infer(&delete.body.root, &delete.body.symbols, &factories);
    assert!(report.opaque_calls.contains("OrderStore::load"));
    let custom = report.customs.iter().next().unwrap();
    assert_eq!(custom.status, Some(423));
    assert_eq!(custom.code, "Order.Locked");

    let create = by_name(&handlers, "create_order");
    let report = infer(&create.body.root, &create.body.symbols, &factories);
    assert_eq!(report.outcomes(), vec![OutcomeKind::Conflict]);
}

#[test]
fn test_inputs_are_deterministic() {
    assert_eq!(lowered(), lowered());
}

#[test]
fn test_invalid_source_is_a_parse_error() {
    let err = lower_source("fn broken( {").unwrap_err();
    assert!(matches!(err, LowerError::Parse(_)));
}

#[test]
fn test_missing_path_names_the_handler() {
    let err = lower_source(
        r#"
        #[handler(method = "GET")]
        async fn nowhere() {}
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("nowhere"));
    assert!(err.to_string().contains("path"));
}

#[test]
fn test_produces_kind_mismatch_is_rejected() {
    let err = lower_source(
        r#"
        #[handler(path = "/x")]
        #[produces(status = 404, kind = "conflict")]
        async fn mismatch() {}
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, LowerError::Attribute { .. }));
}
