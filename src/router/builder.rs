//! Builder for constructing routers.

use super::config::RouterConfig;
use super::error::BuildError;
use super::router::Router;
use crate::core::{Handler, RouteState};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing routers with a fluent API.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use waypoint::core::Handler;
/// use waypoint::router::Router;
///
/// struct Application;
///
/// #[async_trait::async_trait]
/// impl Handler for Application {
///     fn name(&self) -> &str {
///         "application"
///     }
/// }
///
/// let router = Router::builder()
///     .name("main")
///     .route("index", vec![Arc::new(Application) as Arc<dyn Handler>])
///     .build()
///     .unwrap();
///
/// assert!(router.has_route("index"));
/// ```
pub struct RouterBuilder {
    config: RouterConfig,
    routes: Vec<(String, Vec<Arc<dyn Handler>>)>,
    initial_state: Option<RouteState>,
}

impl RouterBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
            routes: Vec::new(),
            initial_state: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the router's log label.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn log_transitions(mut self, enabled: bool) -> Self {
        self.config.log_transitions = enabled;
        self
    }

    pub fn yield_between_steps(mut self, enabled: bool) -> Self {
        self.config.yield_between_steps = enabled;
        self
    }

    /// Register a route as its handler chain, root first.
    pub fn route(mut self, name: impl Into<String>, handlers: Vec<Arc<dyn Handler>>) -> Self {
        self.routes.push((name.into(), handlers));
        self
    }

    /// State the router starts in (optional, defaults to an empty chain).
    pub fn initial_state(mut self, state: RouteState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Build the router.
    /// Returns an error if the route table is empty or malformed.
    pub fn build(self) -> Result<Router, BuildError> {
        if self.routes.is_empty() {
            return Err(BuildError::NoRoutes);
        }

        let mut routes = HashMap::with_capacity(self.routes.len());
        for (name, handlers) in self.routes {
            if handlers.is_empty() {
                return Err(BuildError::EmptyRoute { name });
            }
            if routes.contains_key(&name) {
                return Err(BuildError::DuplicateRoute { name });
            }
            routes.insert(name, handlers);
        }

        Ok(Router::from_parts(
            self.config,
            routes,
            self.initial_state.unwrap_or_default(),
        ))
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
