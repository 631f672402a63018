//! Route model types: intents, handlers, and route state.
//!
//! This module contains the data a transition works on:
//! - `Intent` describing a requested destination
//! - `Handler` hooks and the `HandlerInfo` chain tracking their progress
//! - `RouteState` with the ordered resolution routine

mod handler;
mod intent;
mod state;

pub use handler::{Handler, HandlerError, HandlerInfo, Propagation, ResolutionStatus};
pub use intent::{Intent, Params};
pub use state::{ResolveError, RouteState};
