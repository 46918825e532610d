use serde::{Deserialize, Serialize};

/// Network reachability as reported by a connectivity source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReachabilityStatus {
    /// Connectivity is available. `via_wifi` is true when the active
    /// transport is WiFi rather than a metered fallback.
    Reachable { via_wifi: bool },
    /// No connectivity
    Unreachable,
}

impl ReachabilityStatus {
    /// Returns true for any `Reachable` variant, regardless of transport
    pub fn is_reachable(&self) -> bool {
        matches!(self, ReachabilityStatus::Reachable { .. })
    }
}

/// In-memory session log entry for a reachability transition (volatile – lost on app restart)
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionLogEntry {
    pub ts_ms: i64,
    pub status: ReachabilityStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_reachable() {
        assert!(ReachabilityStatus::Reachable { via_wifi: true }.is_reachable());
        assert!(ReachabilityStatus::Reachable { via_wifi: false }.is_reachable());
        assert!(!ReachabilityStatus::Unreachable.is_reachable());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ReachabilityStatus::Reachable { via_wifi: true }).unwrap();
        assert_eq!(json, r#"{"Reachable":{"via_wifi":true}}"#);

        let json = serde_json::to_string(&ReachabilityStatus::Unreachable).unwrap();
        assert_eq!(json, r#""Unreachable""#);

        let status: ReachabilityStatus = serde_json::from_str(r#"{"Reachable":{"via_wifi":false}}"#).unwrap();
        assert_eq!(status, ReachabilityStatus::Reachable { via_wifi: false });
    }
}
