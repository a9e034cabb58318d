//! The per-handler analysis pipeline.

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use heron_bind::classify_handler;
use heron_config::HeronConfig;
use heron_contract::{build, ContractInput, DEFAULT_ARITY_LIMIT};
use heron_core::{
    AnalysisTables, Diagnostic, DiagnosticCode, EndpointContract, Location, ParameterDescriptor,
};
use heron_infer::{infer, HandlerInput};
use heron_route::RouteTemplate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::HeronResult;

/// Everything Heron concluded about one handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerAnalysis {
    /// Handler name.
    pub handler: String,
    /// The parsed route template; `/` when the handler declaration could not
    /// be read.
    pub route: RouteTemplate,
    /// One binding decision per parameter, in declaration order.
    pub parameters: Vec<ParameterDescriptor>,
    /// The response contract; `None` when the route template is malformed.
    pub contract: Option<EndpointContract>,
    /// Diagnostics from every pass, in pass order.
    pub diagnostics: Vec<Diagnostic>,
    /// True when no error diagnostic was reported.
    pub usable: bool,
}

impl HandlerAnalysis {
    /// Returns the diagnostics carrying `code`.
    pub fn diagnostics_with(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    /// Returns true if a diagnostic with `code` was reported.
    #[must_use]
    pub fn has_diagnostic(&self, code: DiagnosticCode) -> bool {
        self.diagnostics_with(code).next().is_some()
    }

    fn failed(handler: &str, route: RouteTemplate, reason: &str) -> Self {
        let diagnostic =
            Diagnostic::new(DiagnosticCode::HandlerAnalysisFailed, Location::handler(handler))
                .with_arg(handler)
                .with_arg(reason);
        Self {
            handler: handler.to_string(),
            route,
            parameters: Vec::new(),
            contract: None,
            diagnostics: vec![diagnostic],
            usable: false,
        }
    }

    fn panicked(input: &HandlerInput, payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown cause");
        Self::failed(
            &input.name,
            heron_route::parse(&input.route_template),
            &format!("analysis panicked: {message}"),
        )
    }
}

/// Runs the analysis passes over handler inputs.
///
/// The analyzer holds only read-only tables and settings; it is `Send +
/// Sync` and can be shared across threads.
///
/// # Example
///
/// ```
/// use heron::{Analyzer, HandlerInput, Method, SuccessKind};
///
/// let analyzer = Analyzer::default();
/// let input = HandlerInput::new("health", Method::GET, "/health", SuccessKind::NoContent);
///
/// let analysis = analyzer.analyze(&input);
/// assert!(analysis.usable);
/// assert_eq!(analysis.contract.unwrap().success.status, 204);
/// ```
#[derive(Debug, Clone)]
pub struct Analyzer {
    tables: AnalysisTables,
    arity_limit: usize,
    parallel: bool,
    workers: Option<usize>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalysisTables::builtin(), DEFAULT_ARITY_LIMIT)
    }
}

impl Analyzer {
    /// Creates an analyzer over the given tables.
    #[must_use]
    pub fn new(tables: AnalysisTables, arity_limit: usize) -> Self {
        Self {
            tables,
            arity_limit,
            parallel: true,
            workers: None,
        }
    }

    /// Creates an analyzer from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HeronError::Config`](crate::HeronError::Config) if the
    /// configuration does not validate.
    pub fn from_config(config: &HeronConfig) -> HeronResult<Self> {
        config.validate()?;
        Ok(Self {
            tables: config.tables(),
            arity_limit: config.analysis.arity_limit,
            parallel: config.analysis.parallel,
            workers: config.analysis.workers,
        })
    }

    /// Sets whether batches run on worker threads.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the worker thread count for batches.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Returns the lookup tables.
    #[must_use]
    pub fn tables(&self) -> &AnalysisTables {
        &self.tables
    }

    /// Returns the arity limit.
    #[must_use]
    pub fn arity_limit(&self) -> usize {
        self.arity_limit
    }

    /// Analyzes one handler.
    ///
    /// 1. The route template is parsed; a malformed template stops here with
    ///    no parameters and no contract.
    /// 2. Every parameter is classified and the binding validations run.
    /// 3. The body is scanned for outcome factory calls. Unknown factories
    ///    warn; opaque calls are errors unless the handler declares its
    ///    outcomes explicitly.
    /// 4. The contract is built; a fallback contract reports why.
    pub fn analyze(&self, input: &HandlerInput) -> HandlerAnalysis {
        let handler = input.name.as_str();
        let route = heron_route::parse(&input.route_template);

        if !route.is_valid() {
            let diagnostics = route.diagnostics(handler);
            debug!(
                handler,
                route_template = %input.route_template,
                issues = route.issues.len(),
                "route template rejected"
            );
            return HandlerAnalysis {
                handler: input.name.clone(),
                route,
                parameters: Vec::new(),
                contract: None,
                diagnostics,
                usable: false,
            };
        }

        let bindings = classify_handler(
            handler,
            &input.method,
            &input.parameters,
            &route.parameters,
            &self.tables,
        );
        let mut diagnostics = bindings.diagnostics;

        let report = infer(&input.body.root, &input.body.symbols, &self.tables.factories);
        for factory in &report.unknown_factories {
            diagnostics.push(
                Diagnostic::new(DiagnosticCode::UnknownOutcomeFactory, Location::handler(handler))
                    .with_arg(factory),
            );
        }
        if input.declared_outcomes.is_empty() {
            for call in &report.opaque_calls {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::UnresolvedOutcomeCall,
                        Location::handler(handler),
                    )
                    .with_arg(call),
                );
            }
        }

        let contract = build(
            &ContractInput::new(input.success.clone(), input.method.clone())
                .inferred(report.outcomes())
                .declared(input.declared_outcomes.iter().cloned())
                .middleware(input.middleware)
                .arity_limit(self.arity_limit),
        );
        if let Some(reason) = &contract.fallback_reason {
            diagnostics.push(
                Diagnostic::new(DiagnosticCode::TooManyOutcomeTypes, Location::handler(handler))
                    .with_arg(handler)
                    .with_arg(reason.describe()),
            );
        }

        let usable = !diagnostics.iter().any(Diagnostic::is_error);
        debug!(
            handler,
            usable,
            diagnostics = diagnostics.len(),
            mode = ?contract.mode,
            "analyzed handler"
        );

        HandlerAnalysis {
            handler: input.name.clone(),
            route,
            parameters: bindings.descriptors,
            contract: Some(contract),
            diagnostics,
            usable,
        }
    }

    /// Analyzes many handlers; results keep the input order.
    ///
    /// With parallelism enabled the handlers are split into contiguous
    /// chunks, one per worker thread. A handler whose analysis panics is
    /// reported unusable without affecting the others.
    pub fn analyze_batch(&self, inputs: &[HandlerInput]) -> Vec<HandlerAnalysis> {
        let workers = self.worker_count(inputs.len());
        if workers <= 1 {
            return inputs.iter().map(|input| self.isolated(input)).collect();
        }

        let chunk = inputs.len().div_ceil(workers);
        info!(handlers = inputs.len(), workers, "analyzing batch");
        thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || {
                        part.iter()
                            .map(|input| self.isolated(input))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect()
        })
    }

    /// Analyzes every `#[handler]` function in a Rust source file.
    ///
    /// Results keep source order. A handler whose declaration is malformed
    /// is reported unusable with a
    /// [`HandlerAnalysisFailed`](DiagnosticCode::HandlerAnalysisFailed)
    /// error; the other handlers are analyzed as usual.
    ///
    /// # Errors
    ///
    /// Returns [`HeronError::Source`](crate::HeronError::Source) if the source
    /// does not parse or a type declaration carries a malformed attribute.
    pub fn analyze_source(&self, source: &str) -> HeronResult<Vec<HandlerAnalysis>> {
        let mut inputs = Vec::new();
        let mut rejected = Vec::new();
        let lowered = heron_syntax::lower_source_each(source)?;
        for (position, lowered) in lowered.into_iter().enumerate() {
            match lowered {
                Ok(input) => inputs.push(input),
                Err(err) => rejected.push((position, err)),
            }
        }

        let mut analyses = self.analyze_batch(&inputs);
        for (position, err) in rejected {
            let handler = err.handler().unwrap_or_default();
            warn!(handler, error = %err, "handler declaration rejected");
            let failed = HandlerAnalysis::failed(handler, heron_route::parse("/"), &err.reason());
            analyses.insert(position, failed);
        }
        Ok(analyses)
    }

    fn worker_count(&self, handlers: usize) -> usize {
        if !self.parallel || handlers < 2 {
            return 1;
        }
        let available = self
            .workers
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, NonZeroUsize::get));
        available.clamp(1, handlers)
    }

    fn isolated(&self, input: &HandlerInput) -> HandlerAnalysis {
        panic::catch_unwind(AssertUnwindSafe(|| self.analyze(input))).unwrap_or_else(|payload| {
            warn!(handler = %input.name, "analysis panicked; handler marked unusable");
            HandlerAnalysis::panicked(input, payload.as_ref())
        })
    }
}
