//! Route state and its resolution routine.
//!
//! A [`RouteState`] is an ordered handler-info chain plus the params and
//! query params that produced it. Resolving a state walks the chain from
//! root to leaf, running each unresolved handler's hooks in turn.

use super::handler::{HandlerError, HandlerInfo};
use super::intent::Params;
use crate::transition::{AbortObserved, AbortSignal, Transition};
use std::collections::BTreeMap;

/// Why resolution stopped before reaching the leaf.
#[derive(Clone, Debug)]
pub enum ResolveError {
    /// The abort check fired at a step boundary
    Aborted,

    /// A handler hook failed
    Handler {
        error: HandlerError,
        handler_info: HandlerInfo,
    },
}

impl ResolveError {
    pub fn was_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<AbortObserved> for ResolveError {
    fn from(_: AbortObserved) -> Self {
        Self::Aborted
    }
}

/// Ordered handler-info chain with its params.
///
/// Only a maximal prefix of the chain is guaranteed resolved while a
/// transition is in flight.
#[derive(Clone, Debug, Default)]
pub struct RouteState {
    handler_infos: Vec<HandlerInfo>,
    params: BTreeMap<String, Params>,
    query_params: Params,
}

impl RouteState {
    pub fn new(
        handler_infos: Vec<HandlerInfo>,
        params: BTreeMap<String, Params>,
        query_params: Params,
    ) -> Self {
        Self {
            handler_infos,
            params,
            query_params,
        }
    }

    pub fn handler_infos(&self) -> &[HandlerInfo] {
        &self.handler_infos
    }

    /// Params keyed by handler name.
    pub fn params(&self) -> &BTreeMap<String, Params> {
        &self.params
    }

    pub fn query_params(&self) -> &Params {
        &self.query_params
    }

    /// Name of the deepest handler, if the chain is non-empty.
    pub fn leaf_name(&self) -> Option<&str> {
        self.handler_infos.last().map(HandlerInfo::name)
    }

    /// Name of the last entry in the leading run of resolved entries.
    ///
    /// These ancestors are shared unchanged with the state being left, so
    /// resolution can skip them.
    pub fn pivot_handler(&self) -> Option<&str> {
        self.handler_infos
            .iter()
            .take_while(|info| info.is_resolved())
            .last()
            .map(HandlerInfo::name)
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.handler_infos.iter().all(HandlerInfo::is_resolved)
    }

    /// True when both states address the same chain with the same params.
    pub fn same_target(&self, other: &RouteState) -> bool {
        self.handler_infos.len() == other.handler_infos.len()
            && self
                .handler_infos
                .iter()
                .zip(&other.handler_infos)
                .all(|(a, b)| a.same_target(b))
            && self.query_params == other.query_params
    }

    pub(crate) fn set_handler_info(&mut self, index: usize, info: HandlerInfo) {
        if let Some(slot) = self.handler_infos.get_mut(index) {
            *slot = info;
        }
    }

    /// Resolve every handler-info from root to leaf.
    ///
    /// `signal` is checked before each step and after each hook; once it
    /// has fired, resolution stops with [`ResolveError::Aborted`] regardless
    /// of what the in-flight step returned. Progress is reported to
    /// `transition` so events see the growing resolved prefix.
    pub async fn resolve(
        mut self,
        signal: &AbortSignal,
        transition: &Transition,
    ) -> Result<RouteState, ResolveError> {
        let yield_between_steps = transition.router().config().yield_between_steps;

        for index in 0..self.handler_infos.len() {
            if yield_between_steps {
                tokio::task::yield_now().await;
            }
            signal.check()?;

            let info = self.handler_infos[index].clone();
            if info.is_resolved() {
                transition.record_progress(index, info);
                continue;
            }

            let resolving = info.to_resolving();
            transition.record_progress(index, resolving.clone());

            let resolved = resolving.resolve(signal, transition).await?;
            signal.check()?;

            transition.record_progress(index, resolved.clone());
            self.handler_infos[index] = resolved;
        }

        signal.check()?;
        Ok(self)
    }
}
