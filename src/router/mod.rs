//! Router collaborator: route table, current state, and the active
//! transition slot.
//!
//! The router turns intents into target states, starts transitions toward
//! them, and adopts their resolved state when they complete.

mod builder;
mod config;
mod error;
#[allow(clippy::module_inception)]
mod router;

pub use builder::RouterBuilder;
pub use config::RouterConfig;
pub use error::BuildError;
pub use router::Router;
