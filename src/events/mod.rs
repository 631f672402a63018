//! Event dispatch over the resolved prefix of a handler chain.
//!
//! Events bubble from the deepest handler reached so far toward the root.
//! A handler answering [`Propagation::Handled`] stops the walk;
//! [`Propagation::Bubble`] counts as handled but lets the event continue.

use crate::core::{HandlerError, HandlerInfo, Propagation};
use crate::router::Router;
use crate::transition::{Transition, TransitionError};
use serde_json::Value;

/// Name under which handler failures are broadcast.
pub const ERROR_EVENT: &str = "error";

/// An event offered to route handlers.
#[derive(Clone, Debug)]
pub enum Event {
    /// Caller-defined event fired through `trigger` / `send`
    Named { name: String, args: Vec<Value> },

    /// A handler hook failed during resolution
    Error {
        error: HandlerError,
        handler_info: HandlerInfo,
    },
}

impl Event {
    pub fn named(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Named {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Named { name, .. } => name,
            Self::Error { .. } => ERROR_EVENT,
        }
    }

    /// Arguments of a named event; empty for error events.
    pub fn args(&self) -> &[Value] {
        match self {
            Self::Named { args, .. } => args,
            Self::Error { .. } => &[],
        }
    }
}

/// Offer `event` to `handler_infos`, deepest first.
///
/// Returns `UnhandledEvent` when nobody handled it, unless
/// `ignore_failure` is set, in which case this never fails.
pub fn trigger(
    router: &Router,
    handler_infos: &[HandlerInfo],
    ignore_failure: bool,
    event: &Event,
    transition: &Transition,
) -> Result<(), TransitionError> {
    let mut handled = false;

    for info in handler_infos.iter().rev() {
        match info.handler().on_event(event, transition) {
            Propagation::Unhandled => {}
            Propagation::Bubble => handled = true,
            Propagation::Handled => {
                handled = true;
                break;
            }
        }
    }

    tracing::trace!(
        router = %router.name(),
        event = event.name(),
        prefix = handler_infos.len(),
        handled,
        "event dispatched"
    );

    if handled || ignore_failure {
        Ok(())
    } else {
        Err(TransitionError::UnhandledEvent {
            event: event.name().to_string(),
        })
    }
}
