//! Serde adapter for [`http::Method`].
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Route {
//!     #[serde(with = "heron_core::method")]
//!     method: http::Method,
//! }
//! ```

use http::Method;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Serializes a method as its uppercase name.
pub fn serialize<S>(method: &Method, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(method.as_str())
}

/// Deserializes a method from its name; names are upper-cased first.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Method, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Method::from_bytes(name.to_ascii_uppercase().as_bytes()).map_err(de::Error::custom)
}
