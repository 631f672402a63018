//! The transition state machine.
//!
//! A [`Transition`] is one attempt to move the router from its current
//! state to a target state. It exposes a completion contract that callers
//! can await, and control operations (`abort`, `retry`, `trigger`) that
//! act on the attempt itself.

use super::abort::AbortSignal;
use super::error::TransitionError;
use super::sequence::next_sequence;
use super::snapshot::TransitionSnapshot;
use crate::core::{HandlerInfo, Intent, Params, ResolveError, RouteState};
use crate::events::{self, Event};
use crate::router::Router;
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, Shared};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::IntoFuture;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Outcome delivered by a transition's completion contract.
pub type TransitionResult = Result<Arc<RouteState>, TransitionError>;

/// Completion contract of a transition.
///
/// Cloneable and awaitable any number of times; every clone settles with
/// the same outcome. Holding one grants no control over the transition.
pub type Completion = Shared<BoxFuture<'static, TransitionResult>>;

/// Caller-attached auxiliary data, carried forward by `retry`.
pub type TransitionData = Map<String, Value>;

/// How a completed transition should update externally observed location.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlMethod {
    /// Push a new location record
    #[default]
    Update,

    /// Overwrite the current location record
    Replace,
}

/// Lifecycle position of a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionStatus {
    Pending,
    Resolving,
    Aborted,
    Fulfilled,
    Rejected,
}

impl TransitionStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected)
    }
}

struct Fields {
    state: RouteState,
    params: BTreeMap<String, Params>,
    query_params: Params,
    resolve_index: usize,
    pivot_handler: Option<String>,
    target_name: Option<String>,
    url_method: Option<UrlMethod>,
    data: TransitionData,
    status: TransitionStatus,
    is_active: bool,
    superseded_by: Option<Transition>,
}

struct Inner {
    router: Router,
    intent: Arc<Intent>,
    sequence: Option<u64>,
    is_intentional: bool,
    created_at: DateTime<Utc>,
    signal: AbortSignal,
    completion: Completion,
    fields: Mutex<Fields>,
}

/// One in-flight attempt to move the router to a new state.
///
/// `Transition` is a cheap handle; clones refer to the same attempt.
/// Awaiting a transition (or its [`promise`](Self::promise)) yields the
/// resolved target state, a `TransitionAborted` rejection, or the original
/// handler error.
///
/// Resolution runs on a Tokio task, so constructing a transition with a
/// state must happen inside a Tokio runtime.
#[derive(Clone)]
pub struct Transition {
    inner: Arc<Inner>,
}

/// A constructed transition whose resolution has not been spawned yet.
///
/// The router uses this gap to take over its active slot before any
/// resolution step can run.
pub(crate) struct Launch {
    transition: Transition,
    state: RouteState,
    sender: oneshot::Sender<TransitionResult>,
}

impl Launch {
    pub(crate) fn transition(&self) -> &Transition {
        &self.transition
    }

    pub(crate) fn start(self) -> Transition {
        let Launch {
            transition,
            state,
            sender,
        } = self;
        {
            let mut fields = transition.fields();
            if fields.status == TransitionStatus::Pending {
                fields.status = TransitionStatus::Resolving;
            }
        }
        let runner = transition.clone();
        tokio::spawn(async move {
            let outcome = runner.run(state).await;
            // Receiver gone means nobody holds the completion contract.
            let _ = sender.send(outcome);
        });
        transition
    }
}

impl Transition {
    /// Construct a transition.
    ///
    /// - With `error`, the completion contract is rejected immediately and
    ///   no resolution happens.
    /// - With `state`, resolution of that state starts right away.
    /// - With neither, the transition is a no-op that fulfills with the
    ///   router's current state.
    ///
    /// The transition is not installed as the router's active transition;
    /// use [`Router::transition_by_intent`] for that.
    pub fn new(
        router: &Router,
        intent: impl Into<Arc<Intent>>,
        state: Option<RouteState>,
        error: Option<TransitionError>,
    ) -> Self {
        let intent = intent.into();
        match (error, state) {
            (Some(error), _) => Self::failed(router, intent, error),
            (None, Some(state)) => {
                Self::prepare(router, intent, state, true, TransitionData::new()).start()
            }
            (None, None) => Self::noop(router, intent),
        }
    }

    fn settled(router: &Router, intent: Arc<Intent>, outcome: TransitionResult) -> Self {
        let status = if outcome.is_ok() {
            TransitionStatus::Fulfilled
        } else {
            TransitionStatus::Rejected
        };
        let fields = Fields {
            state: RouteState::default(),
            params: BTreeMap::new(),
            query_params: Params::new(),
            resolve_index: 0,
            pivot_handler: None,
            target_name: None,
            url_method: Some(UrlMethod::Update),
            data: TransitionData::new(),
            status,
            is_active: false,
            superseded_by: None,
        };
        Self {
            inner: Arc::new(Inner {
                router: router.clone(),
                intent,
                sequence: None,
                is_intentional: true,
                created_at: Utc::now(),
                signal: AbortSignal::new(),
                completion: future::ready(outcome).boxed().shared(),
                fields: Mutex::new(fields),
            }),
        }
    }

    pub(crate) fn failed(router: &Router, intent: Arc<Intent>, error: TransitionError) -> Self {
        router.log(None, &format!("transition into error: {error}"));
        Self::settled(router, intent, Err(error))
    }

    pub(crate) fn noop(router: &Router, intent: Arc<Intent>) -> Self {
        Self::settled(router, intent, Ok(router.state()))
    }

    /// Build a resolving transition without spawning its resolution.
    pub(crate) fn prepare(
        router: &Router,
        intent: Arc<Intent>,
        state: RouteState,
        is_intentional: bool,
        data: TransitionData,
    ) -> Launch {
        let (sender, receiver) = oneshot::channel();
        let completion = async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(TransitionError::aborted()))
        }
        .boxed()
        .shared();

        let fields = Fields {
            params: state.params().clone(),
            query_params: state.query_params().clone(),
            resolve_index: 0,
            pivot_handler: state.pivot_handler().map(str::to_string),
            target_name: state.leaf_name().map(str::to_string),
            url_method: Some(UrlMethod::Update),
            data,
            status: TransitionStatus::Pending,
            is_active: true,
            superseded_by: None,
            state: state.clone(),
        };
        let transition = Self {
            inner: Arc::new(Inner {
                router: router.clone(),
                intent,
                sequence: Some(next_sequence()),
                is_intentional,
                created_at: Utc::now(),
                signal: AbortSignal::new(),
                completion,
                fields: Mutex::new(fields),
            }),
        };
        tracing::debug!(
            sequence = ?transition.sequence(),
            target = ?transition.target_name(),
            pivot = ?transition.pivot_handler(),
            "transition created"
        );

        Launch {
            transition,
            state,
            sender,
        }
    }

    async fn run(&self, state: RouteState) -> TransitionResult {
        let outcome = state.resolve(&self.inner.signal, self).await;
        match outcome {
            Ok(resolved) => {
                let resolved = Arc::new(resolved);
                if self.inner.signal.is_aborted()
                    || !self.router().finalize(self, Arc::clone(&resolved))
                {
                    return Err(self.reject_as_aborted());
                }
                self.settle(TransitionStatus::Fulfilled, Some(&resolved));
                self.log("transition resolved");
                Ok(resolved)
            }
            Err(ResolveError::Aborted) => Err(self.reject_as_aborted()),
            Err(ResolveError::Handler { .. }) if self.inner.signal.is_aborted() => {
                Err(self.reject_as_aborted())
            }
            Err(ResolveError::Handler {
                error,
                handler_info,
            }) => {
                self.log(&format!(
                    "handler '{}' failed: {error}",
                    handler_info.name()
                ));
                let event = Event::Error {
                    error: Arc::clone(&error),
                    handler_info,
                };
                let prefix = self.resolved_prefix();
                if let Err(err) = events::trigger(self.router(), &prefix, true, &event, self) {
                    tracing::warn!(%err, "error event dispatch failed");
                }
                self.abort();
                self.settle(TransitionStatus::Rejected, None);
                Err(TransitionError::Handler(error))
            }
        }
    }

    fn reject_as_aborted(&self) -> TransitionError {
        self.log("detected abort");
        self.settle(TransitionStatus::Rejected, None);
        TransitionError::aborted()
    }

    fn settle(&self, status: TransitionStatus, resolved: Option<&Arc<RouteState>>) {
        let mut fields = self.fields();
        fields.status = status;
        fields.is_active = false;
        if let Some(resolved) = resolved {
            fields.state = RouteState::clone(resolved);
            fields.resolve_index = resolved.handler_infos().len().saturating_sub(1);
        }
    }

    /// Record that resolution reached `index`, replacing that entry.
    pub(crate) fn record_progress(&self, index: usize, info: HandlerInfo) {
        let mut fields = self.fields();
        if !fields.is_active {
            return;
        }
        fields.state.set_handler_info(index, info);
        fields.resolve_index = fields.resolve_index.max(index);
    }

    fn fields(&self) -> MutexGuard<'_, Fields> {
        self.inner
            .fields
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self, message: &str) {
        self.router().log(self.inner.sequence, message);
    }

    /// Handler-infos reached by resolution so far, `[0, resolve_index]`.
    pub fn resolved_prefix(&self) -> Vec<HandlerInfo> {
        let fields = self.fields();
        let infos = fields.state.handler_infos();
        let end = (fields.resolve_index + 1).min(infos.len());
        infos[..end].to_vec()
    }

    /// The completion contract, without access to the control operations.
    pub fn promise(&self) -> Completion {
        self.inner.completion.clone()
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    pub fn intent(&self) -> &Arc<Intent> {
        &self.inner.intent
    }

    /// Creation order; `None` for no-op and error transitions.
    pub fn sequence(&self) -> Option<u64> {
        self.inner.sequence
    }

    /// False for transitions spawned by `retry`.
    pub fn is_intentional(&self) -> bool {
        self.inner.is_intentional
    }

    /// Target state; fully resolved once the transition is fulfilled.
    pub fn state(&self) -> RouteState {
        self.fields().state.clone()
    }

    pub fn params(&self) -> BTreeMap<String, Params> {
        self.fields().params.clone()
    }

    pub fn query_params(&self) -> Params {
        self.fields().query_params.clone()
    }

    pub fn resolve_index(&self) -> usize {
        self.fields().resolve_index
    }

    pub fn pivot_handler(&self) -> Option<String> {
        self.fields().pivot_handler.clone()
    }

    pub fn target_name(&self) -> Option<String> {
        self.fields().target_name.clone()
    }

    /// `None` means the location should not be touched.
    pub fn url_method(&self) -> Option<UrlMethod> {
        self.fields().url_method
    }

    pub fn status(&self) -> TransitionStatus {
        self.fields().status
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.signal.is_aborted()
    }

    pub fn is_active(&self) -> bool {
        self.fields().is_active
    }

    pub fn data(&self) -> TransitionData {
        self.fields().data.clone()
    }

    pub fn insert_data(&self, key: impl Into<String>, value: Value) -> &Self {
        self.fields().data.insert(key.into(), value);
        self
    }

    /// The transition the router installed in place of this one.
    pub fn superseded_by(&self) -> Option<Transition> {
        self.fields().superseded_by.clone()
    }

    pub(crate) fn mark_superseded(&self, next: &Transition) {
        self.fields().superseded_by = Some(next.clone());
    }

    /// True when both handles refer to the same attempt.
    pub fn ptr_eq(&self, other: &Transition) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Abort this transition. Calling it again is a no-op.
    ///
    /// The completion contract is not rejected here; the in-flight
    /// resolution rejects with `TransitionAborted` at its next check.
    pub fn abort(&self) -> &Self {
        {
            let mut fields = self.fields();
            if self.inner.signal.is_aborted() {
                return self;
            }
            self.inner.signal.abort();
            fields.is_active = false;
            if !fields.status.is_settled() {
                fields.status = TransitionStatus::Aborted;
            }
        }

        let target = self.target_name();
        self.log(&format!(
            "transition to '{}' aborted",
            target.as_deref().unwrap_or("<none>")
        ));
        self.router().release(self);
        self
    }

    /// Abort this transition and start a new one for the same intent.
    ///
    /// The new transition is marked as not intentional and inherits this
    /// transition's data.
    pub fn retry(&self) -> Transition {
        self.abort();
        self.router()
            .begin(Arc::clone(&self.inner.intent), false, self.data())
    }

    /// Set how the completed transition should update location.
    pub fn method(&self, method: Option<UrlMethod>) -> &Self {
        self.fields().url_method = method;
        self
    }

    /// Fire a named event at the resolved prefix.
    ///
    /// Fails with `UnhandledEvent` when no handler in the prefix takes it.
    pub fn trigger(&self, name: &str, args: Vec<Value>) -> Result<(), TransitionError> {
        self.trigger_with(false, name, args)
    }

    /// Fire a named event, optionally tolerating that nobody handles it.
    pub fn trigger_with(
        &self,
        ignore_failure: bool,
        name: &str,
        args: Vec<Value>,
    ) -> Result<(), TransitionError> {
        let event = Event::named(name, args);
        let prefix = self.resolved_prefix();
        events::trigger(self.router(), &prefix, ignore_failure, &event, self)
    }

    /// Alias of [`trigger`](Self::trigger).
    pub fn send(&self, name: &str, args: Vec<Value>) -> Result<(), TransitionError> {
        self.trigger(name, args)
    }

    /// Alias of [`trigger_with`](Self::trigger_with).
    pub fn send_with(
        &self,
        ignore_failure: bool,
        name: &str,
        args: Vec<Value>,
    ) -> Result<(), TransitionError> {
        self.trigger_with(ignore_failure, name, args)
    }

    /// Completion that follows redirects.
    ///
    /// If this transition rejects while the router has since installed a
    /// different active transition, the outcome of that transition (and
    /// any it redirects to) is reported instead. A replacement that already
    /// settled and left the slot is still followed.
    pub fn follow_redirects(&self) -> BoxFuture<'static, TransitionResult> {
        let this = self.clone();
        async move {
            let err = match this.promise().await {
                Ok(state) => return Ok(state),
                Err(err) => err,
            };
            let next = this
                .router()
                .active_transition()
                .filter(|next| !next.ptr_eq(&this))
                .or_else(|| this.superseded_by());
            match next {
                Some(next) => next.follow_redirects().await,
                None => Err(err),
            }
        }
        .boxed()
    }

    /// Serializable view of this transition for diagnostics.
    pub fn snapshot(&self) -> TransitionSnapshot {
        let fields = self.fields();
        TransitionSnapshot {
            sequence: self.inner.sequence,
            intent: Intent::clone(&self.inner.intent),
            target_name: fields.target_name.clone(),
            pivot_handler: fields.pivot_handler.clone(),
            status: fields.status,
            url_method: fields.url_method,
            resolve_index: fields.resolve_index,
            is_active: fields.is_active,
            is_aborted: self.inner.signal.is_aborted(),
            is_intentional: self.inner.is_intentional,
            created_at: self.inner.created_at,
            data: fields.data.clone(),
        }
    }
}

impl PartialEq for Transition {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Transition {}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("sequence", &self.inner.sequence)
            .field("intent", &self.inner.intent.name)
            .field("status", &self.status())
            .field("is_aborted", &self.is_aborted())
            .finish()
    }
}

impl IntoFuture for Transition {
    type Output = TransitionResult;
    type IntoFuture = Completion;

    fn into_future(self) -> Self::IntoFuture {
        self.promise()
    }
}

impl IntoFuture for &Transition {
    type Output = TransitionResult;
    type IntoFuture = Completion;

    fn into_future(self) -> Self::IntoFuture {
        self.promise()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Handler, HandlerError};
    use async_trait::async_trait;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("model failed")]
    struct ModelFailed;

    struct Step {
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Handler for Step {
        fn name(&self) -> &str {
            self.name
        }

        async fn model(
            &self,
            _params: &Params,
            _transition: &Transition,
        ) -> Result<Value, HandlerError> {
            if self.fail {
                Err(Arc::new(ModelFailed))
            } else {
                Ok(Value::String(self.name.to_string()))
            }
        }
    }

    fn router() -> Router {
        Router::builder()
            .route(
                "leaf",
                vec![
                    Arc::new(Step { name: "root", fail: false }) as Arc<dyn Handler>,
                    Arc::new(Step { name: "leaf", fail: false }),
                ],
            )
            .route(
                "broken",
                vec![
                    Arc::new(Step { name: "root", fail: false }) as Arc<dyn Handler>,
                    Arc::new(Step { name: "broken", fail: true }),
                ],
            )
            .build()
            .unwrap()
    }

    fn target_state(router: &Router, name: &str) -> RouteState {
        router
            .apply_intent(&Intent::new(name), &RouteState::default())
            .unwrap()
    }

    #[tokio::test]
    async fn resolving_transition_fulfills_with_resolved_state() {
        let router = router();
        let state = target_state(&router, "leaf");

        let transition = Transition::new(&router, Intent::new("leaf"), Some(state), None);

        assert_eq!(transition.status(), TransitionStatus::Resolving);
        assert_eq!(transition.url_method(), Some(UrlMethod::Update));
        assert_eq!(transition.target_name().as_deref(), Some("leaf"));

        let resolved = transition.promise().await.unwrap();
        assert!(resolved.is_fully_resolved());
        assert_eq!(
            resolved.handler_infos()[1].context(),
            Some(&Value::String("leaf".into()))
        );
        assert_eq!(transition.status(), TransitionStatus::Fulfilled);
        assert!(!transition.is_active());
    }

    #[tokio::test]
    async fn error_constructor_rejects_without_sequence() {
        let router = router();
        let transition = Transition::new(
            &router,
            Intent::new("missing"),
            None,
            Some(TransitionError::UnrecognizedRoute {
                name: "missing".into(),
            }),
        );

        assert_eq!(transition.sequence(), None);
        assert!(transition.params().is_empty());
        let err = transition.await.unwrap_err();
        assert!(matches!(err, TransitionError::UnrecognizedRoute { .. }));
    }

    #[tokio::test]
    async fn noop_transition_fulfills_with_router_state() {
        let router = router();
        let transition = Transition::new(&router, Intent::new("leaf"), None, None);

        assert_eq!(transition.sequence(), None);
        assert_eq!(transition.status(), TransitionStatus::Fulfilled);
        let state = transition.await.unwrap();
        assert!(Arc::ptr_eq(&state, &router.state()));
    }

    #[tokio::test]
    async fn abort_before_first_step_rejects_as_aborted() {
        let router = router();
        let state = target_state(&router, "leaf");
        let transition = Transition::new(&router, Intent::new("leaf"), Some(state), None);

        transition.abort();

        assert_eq!(transition.status(), TransitionStatus::Aborted);
        let err = transition.promise().await.unwrap_err();
        assert_eq!(err.name(), "TransitionAborted");
        assert_eq!(transition.status(), TransitionStatus::Rejected);
    }

    #[tokio::test]
    async fn handler_failure_rejects_with_handler_error() {
        let router = router();
        let state = target_state(&router, "broken");
        let transition = Transition::new(&router, Intent::new("broken"), Some(state), None);

        let err = transition.promise().await.unwrap_err();

        assert_eq!(err.to_string(), "model failed");
        assert!(transition.is_aborted());
        assert!(!transition.is_active());
        assert_eq!(transition.resolve_index(), 1);
    }

    #[tokio::test]
    async fn method_chains_and_clears() {
        let router = router();
        let transition = Transition::new(&router, Intent::new("leaf"), None, None);

        transition.method(Some(UrlMethod::Replace));
        assert_eq!(transition.url_method(), Some(UrlMethod::Replace));

        assert_eq!(transition.method(None).url_method(), None);
    }

    #[tokio::test]
    async fn snapshot_reflects_fields() {
        let router = router();
        let state = target_state(&router, "leaf");
        let transition = Transition::new(&router, Intent::new("leaf"), Some(state), None);
        transition.insert_data("source", Value::from("test"));

        let snapshot = transition.snapshot();

        assert_eq!(snapshot.sequence, transition.sequence());
        assert_eq!(snapshot.target_name.as_deref(), Some("leaf"));
        assert_eq!(snapshot.data.get("source"), Some(&Value::from("test")));
        assert!(snapshot.is_active);
    }
}
