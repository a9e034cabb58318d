//! # Heron Syntax
//!
//! Rust source front end for the Heron analyzer.
//!
//! Parses a source file with `syn` and lowers every function marked
//! `#[handler(method = "..", path = "..")]` into a
//! [`HandlerInput`](heron_infer::HandlerInput):
//!
//! - parameters become [`ParameterSignature`](heron_core::ParameterSignature)s,
//!   with extractor wrappers (`Json<T>`, `Path<T>`, `Inject<T>`, ...) turned
//!   into the attributes they imply and structs described by their fields
//! - `#[authorize]`, `#[allow_anonymous]`, `#[rate_limit]`,
//!   `#[disable_rate_limit]` and `#[produces(..)]` become the middleware
//!   policy and declared outcomes
//! - the return type gives the success kind
//! - the body, together with every helper, method and constant it can reach,
//!   is lowered to the inference tree
//!
//! ```
//! let source = r#"
//!     pub struct Paging {
//!         pub page: u32,
//!         pub size: u32,
//!     }
//!
//!     #[handler(path = "/orders")]
//!     #[authorize]
//!     async fn list_orders(#[expand] paging: Paging) -> Result<Json<Vec<Order>>, Error> {
//!         Err(Error::forbidden("orders"))
//!     }
//! "#;
//!
//! let handlers = heron_syntax::lower_source(source).unwrap();
//! assert!(handlers[0].middleware.authorization_enforced());
//! assert_eq!(handlers[0].parameters[0].ty.constructors.len(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/heron-syntax/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod attrs;
mod body;
mod catalog;
mod error;
mod lower;

pub use attrs::{parameter_attributes, EndpointMarkers, HandlerAttrs};
pub use catalog::TypeCatalog;
pub use error::LowerError;
pub use lower::{lower_file, lower_file_each, lower_source, lower_source_each, Lowered};
