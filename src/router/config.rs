//! Router configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a router and the transitions it starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Label attached to every log line
    pub name: String,

    /// Emit transition lifecycle logs
    pub log_transitions: bool,

    /// Yield to the scheduler before each resolution step so that aborts
    /// issued by other tasks are observed at the next step boundary
    pub yield_between_steps: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            name: "router".to_string(),
            log_transitions: true,
            yield_between_steps: true,
        }
    }
}
