//! Route handlers and the handler-info chain.
//!
//! A route is a chain of handlers from the root to the most specific leaf.
//! Each link of the chain is tracked by a [`HandlerInfo`], which records how
//! far that handler has progressed through resolution.

use super::intent::Params;
use crate::events::Event;
use crate::transition::{AbortSignal, Transition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use super::state::ResolveError;

/// Error raised by a handler hook.
///
/// Shared behind an `Arc` so the exact same error value reaches both the
/// `error` event and the transition's completion contract.
pub type HandlerError = Arc<dyn Error + Send + Sync + 'static>;

/// What a handler did with an event it was offered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    /// Handler has no interest in this event; keep looking upward
    Unhandled,

    /// Handler consumed the event; stop dispatching
    Handled,

    /// Handler reacted but lets the event continue toward the root
    Bubble,
}

/// A route handler participating in transitions.
///
/// The resolution hooks run in order (`before_model`, `model`,
/// `after_model`) with an abort check between each. Every hook has a
/// default, so a handler only implements what it needs.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Unique route segment name, e.g. `"post"` or `"post.comments"`.
    fn name(&self) -> &str;

    /// Names of the intent params this handler consumes.
    fn param_names(&self) -> &[&str] {
        &[]
    }

    async fn before_model(
        &self,
        _params: &Params,
        _transition: &Transition,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Produce the context this handler contributes to the resolved state.
    async fn model(
        &self,
        _params: &Params,
        _transition: &Transition,
    ) -> Result<Value, HandlerError> {
        Ok(Value::Null)
    }

    async fn after_model(
        &self,
        _context: &Value,
        _transition: &Transition,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// React to an event fired at the resolved prefix of the chain.
    fn on_event(&self, _event: &Event, _transition: &Transition) -> Propagation {
        Propagation::Unhandled
    }
}

/// Resolution status of a single handler-info.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStatus {
    Unresolved,
    Resolving,
    Resolved,
}

/// One node of a route chain, polymorphic over resolution status.
#[derive(Clone)]
pub enum HandlerInfo {
    /// Not yet reached by resolution
    Unresolved {
        handler: Arc<dyn Handler>,
        params: Params,
    },

    /// Hooks are currently running
    Resolving {
        handler: Arc<dyn Handler>,
        params: Params,
    },

    /// Hooks completed; `context` is the model value
    Resolved {
        handler: Arc<dyn Handler>,
        params: Params,
        context: Value,
    },
}

impl HandlerInfo {
    pub fn unresolved(handler: Arc<dyn Handler>, params: Params) -> Self {
        Self::Unresolved { handler, params }
    }

    pub fn resolved(handler: Arc<dyn Handler>, params: Params, context: Value) -> Self {
        Self::Resolved {
            handler,
            params,
            context,
        }
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        match self {
            Self::Unresolved { handler, .. }
            | Self::Resolving { handler, .. }
            | Self::Resolved { handler, .. } => handler,
        }
    }

    pub fn name(&self) -> &str {
        self.handler().name()
    }

    pub fn params(&self) -> &Params {
        match self {
            Self::Unresolved { params, .. }
            | Self::Resolving { params, .. }
            | Self::Resolved { params, .. } => params,
        }
    }

    /// Model value, available once resolved.
    pub fn context(&self) -> Option<&Value> {
        match self {
            Self::Resolved { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn status(&self) -> ResolutionStatus {
        match self {
            Self::Unresolved { .. } => ResolutionStatus::Unresolved,
            Self::Resolving { .. } => ResolutionStatus::Resolving,
            Self::Resolved { .. } => ResolutionStatus::Resolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// True when both entries address the same handler with the same params.
    pub fn same_target(&self, other: &HandlerInfo) -> bool {
        self.name() == other.name() && self.params() == other.params()
    }

    pub(crate) fn to_resolving(&self) -> Self {
        Self::Resolving {
            handler: Arc::clone(self.handler()),
            params: self.params().clone(),
        }
    }

    /// Run this handler's hooks, checking `signal` between each.
    ///
    /// An abort observed after a hook returns discards that hook's result,
    /// including a failure.
    pub(crate) async fn resolve(
        &self,
        signal: &AbortSignal,
        transition: &Transition,
    ) -> Result<HandlerInfo, ResolveError> {
        let handler = Arc::clone(self.handler());
        let params = self.params().clone();
        let failed = |error: HandlerError| {
            if signal.is_aborted() {
                ResolveError::Aborted
            } else {
                ResolveError::Handler {
                    error,
                    handler_info: self.clone(),
                }
            }
        };

        handler
            .before_model(&params, transition)
            .await
            .map_err(failed)?;
        signal.check()?;

        let context = handler.model(&params, transition).await.map_err(failed)?;
        signal.check()?;

        handler
            .after_model(&context, transition)
            .await
            .map_err(failed)?;
        signal.check()?;

        Ok(HandlerInfo::Resolved {
            handler,
            params,
            context,
        })
    }
}

impl fmt::Debug for HandlerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("HandlerInfo");
        debug
            .field("name", &self.name())
            .field("status", &self.status())
            .field("params", self.params());
        if let Some(context) = self.context() {
            debug.field("context", context);
        }
        debug.finish()
    }
}
