//! Route parameter descriptors and their storage.
//!
//! Parameters are kept in a small vector so the common case (one to four
//! placeholders) never allocates.

use heron_core::Span;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// A placeholder in a route template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteParameter {
    /// Parameter name as written.
    pub name: String,
    /// Raw constraint text after the first `:` (e.g. `int:min(1)`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    /// Whether the placeholder ends with `?`.
    #[serde(default)]
    pub optional: bool,
    /// Whether the placeholder starts with `*`.
    #[serde(default)]
    pub catch_all: bool,
    /// Byte range of the whole placeholder, braces included.
    pub span: Span,
}

impl RouteParameter {
    /// Creates a plain parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            constraint: None,
            optional: false,
            catch_all: false,
            span,
        }
    }

    /// Returns each constraint identifier with its arguments stripped.
    ///
    /// ```
    /// use heron_core::Span;
    /// use heron_route::RouteParameter;
    ///
    /// let mut param = RouteParameter::new("id", Span::new(0, 4));
    /// param.constraint = Some("int:range(1,10)".to_string());
    /// assert_eq!(param.constraint_names(), vec!["int", "range"]);
    /// ```
    #[must_use]
    pub fn constraint_names(&self) -> Vec<&str> {
        let Some(raw) = self.constraint.as_deref() else {
            return Vec::new();
        };

        let mut names = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, c) in raw.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ':' if depth == 0 => {
                    names.push(&raw[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        names.push(&raw[start..]);

        names
            .into_iter()
            .map(|n| n.split('(').next().unwrap_or(n).trim())
            .filter(|n| !n.is_empty())
            .collect()
    }

    /// Returns true if `name` matches this parameter, ignoring ASCII case.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Renders the placeholder back to template syntax.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 4);
        out.push('{');
        if self.catch_all {
            out.push('*');
        }
        out.push_str(&self.name);
        if let Some(constraint) = &self.constraint {
            out.push(':');
            out.push_str(constraint);
        }
        if self.optional {
            out.push('?');
        }
        out.push('}');
        out
    }
}

/// The ordered parameters of a route template.
///
/// # Example
///
/// ```
/// use heron_core::Span;
/// use heron_route::{RouteParameter, RouteParameters};
///
/// let mut params = RouteParameters::new();
/// params.push(RouteParameter::new("userId", Span::new(7, 15)));
///
/// assert!(params.get("USERID").is_some());
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteParameters {
    inner: SmallVec<[RouteParameter; INLINE_PARAMS]>,
}

impl RouteParameters {
    /// Creates an empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn push(&mut self, param: RouteParameter) {
        self.inner.push(param);
    }

    /// Looks a parameter up by name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RouteParameter> {
        self.inner.iter().find(|p| p.matches(name))
    }

    /// Returns true if a parameter with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> std::slice::Iter<'_, RouteParameter> {
        self.inner.iter()
    }

    /// Returns the parameters as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[RouteParameter] {
        &self.inner
    }
}

impl<'a> IntoIterator for &'a RouteParameters {
    type Item = &'a RouteParameter;
    type IntoIter = std::slice::Iter<'a, RouteParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl FromIterator<RouteParameter> for RouteParameters {
    fn from_iter<I: IntoIterator<Item = RouteParameter>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
