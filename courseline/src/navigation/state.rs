//! Session lifecycle and tracking status.
//!
//! # State Machine
//!
//! ```text
//! Idle --start--> Active
//! Active --3 off-route ticks--> Rerouting --success/failure--> Active
//! Active --arrived at destination--> Completed
//! any --stop--> Idle (terminal for the session)
//! ```

use serde::Serialize;

/// Lifecycle state of a navigation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not navigating, or stopped.
    Idle,
    /// Following the current route.
    Active,
    /// Waiting for a replacement route.
    Rerouting,
    /// Destination reached.
    Completed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Active => "Active",
            SessionState::Rerouting => "Rerouting",
            SessionState::Completed => "Completed",
        }
    }

    /// Whether the session still consumes location ticks.
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Active | SessionState::Rerouting)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Health of the live location feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    /// Fixes are arriving.
    Live,
    /// The source reported an error; manual input still works.
    Degraded(String),
    /// The source has no further fixes.
    SourceEnded,
}

impl TrackingStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, TrackingStatus::Live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_states() {
        assert!(SessionState::Active.is_running());
        assert!(SessionState::Rerouting.is_running());
        assert!(!SessionState::Completed.is_running());
        assert!(!SessionState::Idle.is_running());
        assert_eq!(SessionState::Rerouting.to_string(), "Rerouting");
    }
}
