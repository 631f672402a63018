//! Waypoint: cancellable, retryable transitions for hierarchical routers
//!
//! A transition is a single attempt to move a router from one resolved
//! state to another. Resolution walks an ordered chain of route handlers
//! asynchronously, and the transition stays controllable while it does:
//! it can be aborted when a newer navigation supersedes it, retried, and
//! followed through redirects issued mid-resolution.
//!
//! # Core Concepts
//!
//! - **Intent**: requested destination (route name, params, query params)
//! - **RouteState**: ordered handler-info chain with its params
//! - **Transition**: completion contract plus `abort`, `retry`, `trigger`
//!   and `follow_redirects`
//! - **Router**: owns the current state and the single active transition
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use serde_json::Value;
//! use waypoint::core::{Handler, HandlerError, Intent, Params};
//! use waypoint::router::Router;
//! use waypoint::transition::Transition;
//!
//! struct Post;
//!
//! #[async_trait]
//! impl Handler for Post {
//!     fn name(&self) -> &str {
//!         "post"
//!     }
//!
//!     fn param_names(&self) -> &[&str] {
//!         &["post_id"]
//!     }
//!
//!     async fn model(&self, params: &Params, _t: &Transition) -> Result<Value, HandlerError> {
//!         Ok(Value::from(params["post_id"].clone()))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let router = Router::builder()
//!     .route("post", vec![Arc::new(Post) as Arc<dyn Handler>])
//!     .build()
//!     .unwrap();
//!
//! let state = router
//!     .transition_to(Intent::new("post").with_param("post_id", "42"))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(state.leaf_name(), Some("post"));
//! assert_eq!(state.handler_infos()[0].context(), Some(&Value::from("42")));
//! # }
//! ```

pub mod core;
pub mod events;
pub mod router;
pub mod transition;

// Re-export commonly used types
pub use crate::core::{Handler, HandlerError, HandlerInfo, Intent, Params, RouteState};
pub use events::Event;
pub use router::{Router, RouterConfig};
pub use transition::{Transition, TransitionError, UrlMethod};
