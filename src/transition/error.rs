//! Transition error types.

use crate::core::HandlerError;
use std::sync::Arc;
use thiserror::Error;

/// Name carried by every cooperative-cancellation rejection.
pub const TRANSITION_ABORTED: &str = "TransitionAborted";

/// Errors a transition's completion contract can reject with.
///
/// Callers see either `Aborted` (someone else navigated away) or the
/// handler's own error, never a generic wrapper around it.
#[derive(Clone, Debug, Error)]
pub enum TransitionError {
    /// Cooperative cancellation; produced only by this crate
    #[error("TransitionAborted: {message}")]
    Aborted { message: String },

    /// A route handler hook failed
    #[error(transparent)]
    Handler(HandlerError),

    /// An event reached no handler in the resolved prefix
    #[error("Nothing handled the event '{event}'")]
    UnhandledEvent { event: String },

    /// The intent named a route the router does not know
    #[error("No route named '{name}'")]
    UnrecognizedRoute { name: String },
}

impl TransitionError {
    pub fn aborted() -> Self {
        Self::Aborted {
            message: "transition was aborted".to_string(),
        }
    }

    /// Stable name of the error kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aborted { .. } => TRANSITION_ABORTED,
            Self::Handler(_) => "HandlerError",
            Self::UnhandledEvent { .. } => "UnhandledEvent",
            Self::UnrecognizedRoute { .. } => "UnrecognizedRoute",
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// The handler error, if this is one.
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            Self::Handler(error) => Some(error),
            _ => None,
        }
    }

    /// True when both values carry the very same handler error allocation.
    pub fn is_same_handler_error(&self, error: &HandlerError) -> bool {
        self.handler_error()
            .is_some_and(|own| Arc::ptr_eq(own, error))
    }
}

impl From<HandlerError> for TransitionError {
    fn from(error: HandlerError) -> Self {
        Self::Handler(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn aborted_is_named_transition_aborted() {
        let err = TransitionError::aborted();

        assert_eq!(err.name(), "TransitionAborted");
        assert!(err.is_aborted());
        assert!(err.to_string().starts_with("TransitionAborted"));
    }

    #[test]
    fn handler_error_displays_transparently() {
        let source: HandlerError = Arc::new(Boom);
        let err = TransitionError::from(Arc::clone(&source));

        assert_eq!(err.to_string(), "boom");
        assert!(err.is_same_handler_error(&source));
        assert!(!err.is_same_handler_error(&(Arc::new(Boom) as HandlerError)));
    }
}
