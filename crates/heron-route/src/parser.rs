//! Route template scanner.

use heron_core::Span;
use tracing::{debug, trace};

use crate::params::{RouteParameter, RouteParameters};
use crate::template::{Piece, RouteTemplate, SyntaxIssue, SyntaxIssueKind};

/// Parses a route template.
///
/// Never fails: problems are collected in [`RouteTemplate::issues`] and the
/// well-formed placeholders are still returned.
///
/// # Example
///
/// ```
/// use heron_route::parse;
///
/// let route = parse("/users/{id:int}/files/{*path}");
/// assert!(route.is_valid());
/// assert_eq!(route.parameters.len(), 2);
/// assert_eq!(route.parameters.as_slice()[0].constraint.as_deref(), Some("int"));
/// assert!(route.parameters.as_slice()[1].catch_all);
/// ```
pub fn parse(template: &str) -> RouteTemplate {
    let mut scanner = Scanner::new(template);
    if template.trim().is_empty() {
        scanner.issue(SyntaxIssueKind::EmptyTemplate, Span::new(0, template.len()));
    } else {
        scanner.run();
    }

    let route = scanner.finish();
    trace!(
        route_template = template,
        parameters = route.parameters.len(),
        issues = route.issues.len(),
        "parsed route template"
    );
    if !route.is_valid() {
        debug!(route_template = template, issues = ?route.issues, "malformed route template");
    }
    route
}

struct Scanner<'a> {
    template: &'a str,
    bytes: &'a [u8],
    parameters: RouteParameters,
    issues: Vec<SyntaxIssue>,
    pieces: Vec<Piece>,
    literal_start: usize,
}

impl<'a> Scanner<'a> {
    fn new(template: &'a str) -> Self {
        Self {
            template,
            bytes: template.as_bytes(),
            parameters: RouteParameters::new(),
            issues: Vec::new(),
            pieces: Vec::new(),
            literal_start: 0,
        }
    }

    fn issue(&mut self, kind: SyntaxIssueKind, span: Span) {
        self.issues.push(SyntaxIssue::new(kind, span));
    }

    fn run(&mut self) {
        let mut i = 0;
        while i < self.bytes.len() {
            match (self.bytes[i], self.bytes.get(i + 1)) {
                (b'{', Some(b'{')) | (b'}', Some(b'}')) => i += 2,
                (b'{', _) => i = self.placeholder(i),
                (b'}', _) => {
                    self.issue(SyntaxIssueKind::MismatchedBraces, Span::new(i, i + 1));
                    i += 1;
                }
                _ => i += 1,
            }
        }
        self.flush_literal(self.bytes.len());
    }

    /// Scans the placeholder opening at `open`; returns the next offset.
    fn placeholder(&mut self, open: usize) -> usize {
        // Braces inside constraint arguments belong to the arguments.
        let mut depth = 0usize;
        let mut j = open + 1;
        let close = loop {
            match self.bytes.get(j) {
                None => {
                    self.issue(
                        SyntaxIssueKind::MismatchedBraces,
                        Span::new(open, self.bytes.len()),
                    );
                    return self.bytes.len();
                }
                Some(b'(') => depth += 1,
                Some(b')') => depth = depth.saturating_sub(1),
                Some(b'}') if depth == 0 => break j,
                Some(b'{') if depth == 0 => {
                    self.issue(SyntaxIssueKind::MismatchedBraces, Span::new(open, j));
                    return j;
                }
                Some(_) => {}
            }
            j += 1;
        };

        let span = Span::new(open, close + 1);
        let template = self.template;
        let body = &template[open + 1..close];
        match placeholder_body(body, span) {
            Ok(param) => {
                if self.parameters.contains(&param.name) {
                    self.issue(
                        SyntaxIssueKind::DuplicateParameter { name: param.name },
                        span,
                    );
                } else {
                    self.flush_literal(open);
                    self.pieces.push(Piece::Parameter(self.parameters.len()));
                    self.parameters.push(param);
                    self.literal_start = close + 1;
                }
            }
            Err(kind) => self.issue(kind, span),
        }
        close + 1
    }

    fn flush_literal(&mut self, end: usize) {
        if end > self.literal_start {
            self.pieces
                .push(Piece::Literal(self.template[self.literal_start..end].to_string()));
        }
        self.literal_start = end;
    }

    fn finish(self) -> RouteTemplate {
        RouteTemplate {
            raw: self.template.to_string(),
            parameters: self.parameters,
            issues: self.issues,
            pieces: self.pieces,
        }
    }
}

/// Parses `*`? name (`:` constraint)* `?`? from the text between braces.
fn placeholder_body(body: &str, span: Span) -> Result<RouteParameter, SyntaxIssueKind> {
    let catch_all = body.starts_with('*');
    let body = body.trim_start_matches('*');
    let optional = body.ends_with('?');
    let body = body.strip_suffix('?').unwrap_or(body);

    let (name, constraint) = match body.split_once(':') {
        Some((name, constraint)) => (name, Some(constraint)),
        None => (body, None),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(SyntaxIssueKind::EmptyParameterName);
    }

    Ok(RouteParameter {
        name: name.to_string(),
        constraint: constraint
            .filter(|c| !c.is_empty())
            .map(ToString::to_string),
        optional,
        catch_all,
        span,
    })
}
