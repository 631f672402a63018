//! Cancellable, retryable transitions.
//!
//! This module holds the transition state machine and the pieces it is
//! built from:
//!
//! - **Abort signal**: cooperative cancellation checked at step boundaries
//! - **Sequence**: process-wide creation order
//! - **Transition**: completion contract plus `abort`, `retry`, `method`,
//!   `trigger` and `follow_redirects`
//!
//! # State machine
//!
//! ```text
//! Pending -> Resolving -> Fulfilled
//!                      -> Aborted -> Rejected(TransitionAborted)
//!                      -> Rejected(handler error)
//! ```
//!
//! A handler failure also marks the transition aborted before the
//! rejection is delivered. An abort observed before the completion
//! contract settles always wins over a successful resolution.

mod abort;
mod error;
mod sequence;
mod snapshot;
#[allow(clippy::module_inception)]
mod transition;

pub use abort::{AbortObserved, AbortSignal};
pub use error::{TransitionError, TRANSITION_ABORTED};
pub use sequence::next_sequence;
pub use snapshot::TransitionSnapshot;
pub use transition::{
    Completion, Transition, TransitionData, TransitionResult, TransitionStatus, UrlMethod,
};
