//! Build errors for routers.

use thiserror::Error;

/// Errors that can occur when building a router.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No routes defined. Add at least one route with .route(name, handlers)")]
    NoRoutes,

    #[error("Route '{name}' has no handlers")]
    EmptyRoute { name: String },

    #[error("Route '{name}' is defined more than once")]
    DuplicateRoute { name: String },
}
