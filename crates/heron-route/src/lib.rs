//! Route template parser for Heron.
//!
//! Parses the path pattern attached to a handler into an ordered list of
//! placeholders with their constraints, and reports malformed templates as
//! located issues instead of failing.
//!
//! # Grammar
//!
//! ```text
//! placeholder := '{' '*'? name (':' constraint ('(' args ')')?)* '?'? '}'
//! escape      := '{{' | '}}'
//! ```
//!
//! # Example
//!
//! ```rust
//! use heron_route::parse;
//!
//! let route = parse("/orgs/{org}/repos/{id:int}");
//!
//! assert!(route.is_valid());
//! assert_eq!(route.parameter("ORG").map(|p| p.name.as_str()), Some("org"));
//! assert_eq!(route.render(), "/orgs/{org}/repos/{id:int}");
//! ```

#![doc(html_root_url = "https://docs.rs/heron-route/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod params;
mod parser;
mod template;

pub use params::{RouteParameter, RouteParameters};
pub use parser::parse;
pub use template::{Piece, RouteTemplate, SyntaxIssue, SyntaxIssueKind};
