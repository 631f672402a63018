//! Router owning the current state and the single active transition.

use super::builder::RouterBuilder;
use super::config::RouterConfig;
use crate::core::{Handler, HandlerInfo, Intent, Params, RouteState};
use crate::transition::{Transition, TransitionData, TransitionError};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Slots {
    state: Arc<RouteState>,
    active: Option<Transition>,
}

struct RouterInner {
    config: RouterConfig,
    routes: HashMap<String, Vec<Arc<dyn Handler>>>,
    slots: Mutex<Slots>,
}

/// Hierarchical router.
///
/// Holds the current resolved state and at most one active transition.
/// Starting a transition through the router aborts the previously active
/// one before the new one takes over the slot. `Router` is a cheap handle;
/// clones share the same state.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub(crate) fn from_parts(
        config: RouterConfig,
        routes: HashMap<String, Vec<Arc<dyn Handler>>>,
        state: RouteState,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                config,
                routes,
                slots: Mutex::new(Slots {
                    state: Arc::new(state),
                    active: None,
                }),
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.inner.routes.contains_key(name)
    }

    /// Current state of record.
    pub fn state(&self) -> Arc<RouteState> {
        Arc::clone(&self.slots().state)
    }

    pub fn active_transition(&self) -> Option<Transition> {
        self.slots().active.clone()
    }

    /// Overwrite the active-transition slot.
    ///
    /// The previous occupant is returned untouched; callers that replace a
    /// live transition are responsible for aborting it.
    pub fn set_active_transition(&self, transition: Option<Transition>) -> Option<Transition> {
        std::mem::replace(&mut self.slots().active, transition)
    }

    /// Diagnostic output for transition lifecycle events.
    pub fn log(&self, sequence: Option<u64>, message: &str) {
        if !self.inner.config.log_transitions {
            return;
        }
        match sequence {
            Some(sequence) => tracing::info!(router = %self.name(), sequence, "{message}"),
            None => tracing::info!(router = %self.name(), "{message}"),
        }
    }

    /// Build the target state for `intent`.
    ///
    /// Entries of `base` are reused while they are resolved and address the
    /// same handler with the same params; everything below the first
    /// difference starts unresolved.
    pub fn apply_intent(
        &self,
        intent: &Intent,
        base: &RouteState,
    ) -> Result<RouteState, TransitionError> {
        let chain = self.inner.routes.get(&intent.name).ok_or_else(|| {
            TransitionError::UnrecognizedRoute {
                name: intent.name.clone(),
            }
        })?;

        let mut reusing = true;
        let mut handler_infos = Vec::with_capacity(chain.len());
        let mut params = BTreeMap::new();

        for (index, handler) in chain.iter().enumerate() {
            let handler_params: Params = handler
                .param_names()
                .iter()
                .filter_map(|key| {
                    intent
                        .params
                        .get(*key)
                        .map(|value| (key.to_string(), value.clone()))
                })
                .collect();

            let candidate = HandlerInfo::unresolved(Arc::clone(handler), handler_params.clone());
            let info = match base.handler_infos().get(index) {
                Some(previous)
                    if reusing && previous.is_resolved() && previous.same_target(&candidate) =>
                {
                    previous.clone()
                }
                _ => {
                    reusing = false;
                    candidate
                }
            };

            params.insert(handler.name().to_string(), handler_params);
            handler_infos.push(info);
        }

        Ok(RouteState::new(
            handler_infos,
            params,
            intent.query_params.clone(),
        ))
    }

    /// Start (or reuse) a transition toward `intent`.
    ///
    /// - Unknown routes produce an already-rejected transition.
    /// - A live transition already heading to the same target is returned.
    /// - A target equal to the current state produces a no-op transition.
    /// - Otherwise the active transition is aborted and replaced.
    ///
    /// `is_intentional` is false for transitions spawned by `retry`.
    pub fn transition_by_intent(
        &self,
        intent: impl Into<Arc<Intent>>,
        is_intentional: bool,
    ) -> Transition {
        self.begin(intent.into(), is_intentional, TransitionData::new())
    }

    /// Start a transition on the caller's behalf.
    pub fn transition_to(&self, intent: Intent) -> Transition {
        self.transition_by_intent(intent, true)
    }

    pub(crate) fn begin(
        &self,
        intent: Arc<Intent>,
        is_intentional: bool,
        data: TransitionData,
    ) -> Transition {
        let active = self.active_transition().filter(|t| !t.is_aborted());
        let base = match &active {
            Some(transition) => transition.state(),
            None => RouteState::clone(&self.state()),
        };

        let target = match self.apply_intent(&intent, &base) {
            Ok(target) => target,
            Err(error) => return Transition::failed(self, intent, error),
        };

        match &active {
            Some(transition) if transition.state().same_target(&target) => {
                self.log(transition.sequence(), "reusing in-flight transition");
                return transition.clone();
            }
            None if target.is_fully_resolved() && target.same_target(&self.state()) => {
                return Transition::noop(self, intent);
            }
            _ => {}
        }

        let launch = Transition::prepare(self, intent, target, is_intentional, data);
        if let Some(previous) = active {
            previous.mark_superseded(launch.transition());
            previous.abort();
        }
        if let Some(stale) = self.set_active_transition(Some(launch.transition().clone())) {
            stale.abort();
        }
        self.log(
            launch.transition().sequence(),
            if is_intentional {
                "transition started"
            } else {
                "transition retried"
            },
        );
        launch.start()
    }

    /// Adopt a resolved state unless `transition` was aborted meanwhile.
    pub(crate) fn finalize(&self, transition: &Transition, resolved: Arc<RouteState>) -> bool {
        let mut slots = self.slots();
        if transition.is_aborted() {
            return false;
        }
        slots.state = resolved;
        if slots
            .active
            .as_ref()
            .is_some_and(|active| active.ptr_eq(transition))
        {
            slots.active = None;
        }
        true
    }

    /// Clear the active slot if it still holds `transition`.
    pub(crate) fn release(&self, transition: &Transition) {
        let mut slots = self.slots();
        if slots
            .active
            .as_ref()
            .is_some_and(|active| active.ptr_eq(transition))
        {
            slots.active = None;
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots();
        f.debug_struct("Router")
            .field("name", &self.inner.config.name)
            .field("routes", &self.inner.routes.len())
            .field("leaf", &slots.state.leaf_name())
            .field("active", &slots.active.as_ref().and_then(Transition::sequence))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HandlerError, ResolutionStatus};
    use async_trait::async_trait;
    use serde_json::Value;

    struct Segment {
        name: &'static str,
        params: &'static [&'static str],
    }

    #[async_trait]
    impl Handler for Segment {
        fn name(&self) -> &str {
            self.name
        }

        fn param_names(&self) -> &[&str] {
            self.params
        }

        async fn model(
            &self,
            params: &Params,
            _transition: &Transition,
        ) -> Result<Value, HandlerError> {
            Ok(serde_json::to_value(params).unwrap_or(Value::Null))
        }
    }

    fn router() -> Router {
        let application: Arc<dyn Handler> = Arc::new(Segment {
            name: "application",
            params: &[],
        });
        let post: Arc<dyn Handler> = Arc::new(Segment {
            name: "post",
            params: &["post_id"],
        });
        let comments: Arc<dyn Handler> = Arc::new(Segment {
            name: "comments",
            params: &[],
        });
        Router::builder()
            .log_transitions(false)
            .route("index", vec![Arc::clone(&application)])
            .route("post", vec![Arc::clone(&application), Arc::clone(&post)])
            .route("post.comments", vec![application, post, comments])
            .build()
            .unwrap()
    }

    #[test]
    fn apply_intent_rejects_unknown_route() {
        let router = router();

        let err = router
            .apply_intent(&Intent::new("nowhere"), &RouteState::default())
            .unwrap_err();

        assert!(matches!(err, TransitionError::UnrecognizedRoute { name } if name == "nowhere"));
    }

    #[test]
    fn apply_intent_filters_params_per_handler() {
        let router = router();
        let intent = Intent::new("post").with_param("post_id", "9").with_param("extra", "x");

        let state = router.apply_intent(&intent, &RouteState::default()).unwrap();

        assert_eq!(state.params()["application"].len(), 0);
        assert_eq!(state.params()["post"].get("post_id").map(String::as_str), Some("9"));
        assert!(state
            .handler_infos()
            .iter()
            .all(|info| info.status() == ResolutionStatus::Unresolved));
    }

    #[tokio::test]
    async fn apply_intent_reuses_resolved_prefix() {
        let router = router();
        router
            .transition_to(Intent::new("post").with_param("post_id", "1"))
            .await
            .unwrap();

        let same_post = router
            .apply_intent(
                &Intent::new("post.comments").with_param("post_id", "1"),
                &router.state(),
            )
            .unwrap();
        let other_post = router
            .apply_intent(
                &Intent::new("post.comments").with_param("post_id", "2"),
                &router.state(),
            )
            .unwrap();

        assert_eq!(same_post.pivot_handler(), Some("post"));
        assert_eq!(other_post.pivot_handler(), Some("application"));
    }

    #[tokio::test]
    async fn completed_transition_becomes_router_state() {
        let router = router();

        let transition = router.transition_to(Intent::new("post").with_param("post_id", "3"));
        assert!(router.active_transition().unwrap().ptr_eq(&transition));

        let state = transition.promise().await.unwrap();

        assert!(Arc::ptr_eq(&state, &router.state()));
        assert!(router.active_transition().is_none());
        assert_eq!(router.state().leaf_name(), Some("post"));
    }

    #[tokio::test]
    async fn same_destination_is_a_noop() {
        let router = router();
        router.transition_to(Intent::new("index")).await.unwrap();

        let again = router.transition_to(Intent::new("index"));

        assert_eq!(again.sequence(), None);
        assert!(router.active_transition().is_none());
        assert!(again.await.is_ok());
    }

    #[tokio::test]
    async fn in_flight_transition_to_same_target_is_reused() {
        let router = router();

        let first = router.transition_to(Intent::new("post").with_param("post_id", "5"));
        let second = router.transition_to(Intent::new("post").with_param("post_id", "5"));

        assert!(first.ptr_eq(&second));
        assert!(!first.is_aborted());
        first.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_route_yields_rejected_transition() {
        let router = router();

        let transition = router.transition_to(Intent::new("nowhere"));

        assert!(router.active_transition().is_none());
        assert!(matches!(
            transition.await,
            Err(TransitionError::UnrecognizedRoute { .. })
        ));
    }

    #[test]
    fn set_active_transition_returns_previous() {
        let router = router();
        let noop = Transition::new(&router, Intent::new("index"), None, None);

        assert!(router.set_active_transition(Some(noop.clone())).is_none());
        let previous = router.set_active_transition(None).unwrap();

        assert!(previous.ptr_eq(&noop));
    }
}
