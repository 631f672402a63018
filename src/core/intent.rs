//! Navigation intents.
//!
//! An intent describes where the caller wants to go, independent of where
//! the router currently is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat parameter map used for route params and query params.
pub type Params = BTreeMap<String, String>;

/// Requested destination: a named route plus its params and query params.
///
/// Intents are immutable once handed to a transition; transitions share
/// them behind an `Arc` so a retry can reuse the exact same value.
///
/// # Example
///
/// ```rust
/// use waypoint::core::Intent;
///
/// let intent = Intent::new("post.comments")
///     .with_param("post_id", "42")
///     .with_query_param("sort", "newest");
///
/// assert_eq!(intent.name, "post.comments");
/// assert_eq!(intent.params.get("post_id").map(String::as_str), Some("42"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// Name of the deepest route handler the caller wants to reach
    pub name: String,
    /// Dynamic segment values, keyed by param name
    pub params: Params,
    /// Query params requested alongside the route
    pub query_params: Params,
}

impl Intent {
    /// Create an intent targeting the named route with no params.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Params::new(),
            query_params: Params::new(),
        }
    }

    /// Add a route param.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a query param.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }
}
