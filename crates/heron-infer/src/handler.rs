//! The per-handler input every analysis pass reads from.

use heron_core::{DeclaredOutcome, MiddlewarePolicy, ParameterSignature, SuccessKind};
use http::Method;
use serde::{Deserialize, Serialize};

use crate::syntax::{SymbolTable, SyntaxNode};

/// A lowered handler body and the local symbols it can reach.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerBody {
    /// The body itself.
    pub root: SyntaxNode,
    /// Local functions, methods, constants and locals.
    #[serde(default)]
    pub symbols: SymbolTable,
}

impl HandlerBody {
    /// Creates a body with no local symbols.
    #[must_use]
    pub fn new(root: SyntaxNode) -> Self {
        Self {
            root,
            symbols: SymbolTable::new(),
        }
    }

    /// Attaches a symbol table.
    #[must_use]
    pub fn with_symbols(mut self, symbols: SymbolTable) -> Self {
        self.symbols = symbols;
        self
    }
}

/// Everything known about one handler before analysis.
///
/// Equal inputs always analyze to equal results, so the whole value is the
/// memoization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerInput {
    /// Handler name, used in every diagnostic location.
    pub name: String,
    /// HTTP method.
    #[serde(with = "heron_core::method")]
    pub method: Method,
    /// Route template as written.
    pub route_template: String,
    /// Parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<ParameterSignature>,
    /// Success kind of the return type.
    pub success: SuccessKind,
    /// Outcomes declared on the handler.
    #[serde(default)]
    pub declared_outcomes: Vec<DeclaredOutcome>,
    /// Middleware applied to the handler.
    #[serde(default)]
    pub middleware: MiddlewarePolicy,
    /// The lowered body.
    #[serde(default)]
    pub body: HandlerBody,
}

impl HandlerInput {
    /// Creates a handler with no parameters, declarations or body.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        method: Method,
        route_template: impl Into<String>,
        success: SuccessKind,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            route_template: route_template.into(),
            parameters: Vec::new(),
            success,
            declared_outcomes: Vec::new(),
            middleware: MiddlewarePolicy::default(),
            body: HandlerBody::default(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterSignature) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Appends a declared outcome.
    #[must_use]
    pub fn with_declared(mut self, outcome: DeclaredOutcome) -> Self {
        self.declared_outcomes.push(outcome);
        self
    }

    /// Sets the middleware policy.
    #[must_use]
    pub fn with_middleware(mut self, middleware: MiddlewarePolicy) -> Self {
        self.middleware = middleware;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: HandlerBody) -> Self {
        self.body = body;
        self
    }
}

#[cfg(test)]
mod tests {
    use heron_core::TypeRef;

    use super::*;

    #[test]
    fn test_handler_input_json() {
        let input = HandlerInput::new(
            "get_user",
            Method::GET,
            "/users/{id}",
            SuccessKind::Value("User".into()),
        )
        .with_parameter(ParameterSignature::new(0, "id", TypeRef::named("i32")));

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["method"], "GET");
        assert_eq!(json["route_template"], "/users/{id}");

        let back: HandlerInput = serde_json::from_value(json).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let input: HandlerInput = serde_json::from_str(
            r#"{
                "name": "health",
                "method": "get",
                "route_template": "/health",
                "success": { "kind": "no_content" }
            }"#,
        )
        .unwrap();
        assert_eq!(input.method, Method::GET);
        assert!(input.parameters.is_empty());
        assert_eq!(input.body, HandlerBody::default());
    }
}
