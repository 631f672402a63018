//! Serializable diagnostics view of a transition.

use super::transition::{TransitionData, TransitionStatus, UrlMethod};
use crate::core::Intent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time copy of a transition's observable fields.
///
/// Snapshots carry no control capability; they exist for logging and
/// inspection tooling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionSnapshot {
    /// Creation order, absent for no-op and error transitions
    pub sequence: Option<u64>,

    /// Requested destination
    pub intent: Intent,

    /// Deepest handler of the target chain
    pub target_name: Option<String>,

    /// Deepest handler shared unchanged with the previous chain
    pub pivot_handler: Option<String>,

    pub status: TransitionStatus,

    /// `None` when the location update is suppressed
    pub url_method: Option<UrlMethod>,

    pub resolve_index: usize,
    pub is_active: bool,
    pub is_aborted: bool,
    pub is_intentional: bool,

    /// When the transition was constructed
    pub created_at: DateTime<Utc>,

    pub data: TransitionData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn snapshot_serializes_lowercase_url_method() {
        let snapshot = TransitionSnapshot {
            sequence: Some(3),
            intent: Intent::new("post"),
            target_name: Some("post".into()),
            pivot_handler: Some("application".into()),
            status: TransitionStatus::Resolving,
            url_method: Some(UrlMethod::Replace),
            resolve_index: 1,
            is_active: true,
            is_aborted: false,
            is_intentional: true,
            created_at: Utc::now(),
            data: TransitionData::new(),
        };

        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["url_method"], Value::from("replace"));
        assert_eq!(json["status"], Value::from("Resolving"));
        let back: TransitionSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
