//! Per-tick output of a navigation session.

use serde::Serialize;
use uuid::Uuid;

use super::instruction::SpeedWarning;
use super::state::SessionState;
use super::voice::Announcement;
use crate::geo::GeoPoint;
use crate::location::LocationFix;
use crate::route::{Step, Waypoint};

/// Snapshot of navigation progress after one location tick.
///
/// Updates are emitted in strict tick order; `sequence` increases by one
/// per update within a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationUpdate {
    pub session_id: Uuid,
    pub sequence: u64,

    /// Raw fix that produced this update.
    pub location: LocationFix,
    pub snapped_location: GeoPoint,
    /// Map-matching confidence, 0.0 when the raw point was used.
    pub match_confidence: f64,
    pub speed_kmh: f64,
    pub bearing: f64,

    pub step_index: usize,
    pub current_step: Step,
    pub next_step: Option<Step>,
    pub distance_to_maneuver_m: f64,
    pub time_to_maneuver_s: f64,
    pub distance_remaining_m: f64,
    pub time_remaining_s: f64,
    pub distance_traveled_m: f64,

    pub waypoint_index: usize,
    /// Next unvisited waypoint.
    pub current_waypoint: Option<Waypoint>,

    pub off_route: bool,
    pub deviation_count: u32,
    /// A new route was swapped in on this tick.
    pub rerouted: bool,

    pub speed_limit_kmh: Option<f64>,
    pub speed_warning: Option<SpeedWarning>,

    /// Instruction for the current distance to the maneuver.
    pub instruction: Option<String>,
    /// What to speak on this tick.
    pub announcements: Vec<Announcement>,

    pub state: SessionState,
}

impl NavigationUpdate {
    /// Text of all announcements on this tick, space separated.
    pub fn voice_text(&self) -> Option<String> {
        if self.announcements.is_empty() {
            None
        } else {
            Some(
                self.announcements
                    .iter()
                    .map(|a| a.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
    }

    /// Whether this is the final update of a completed trip.
    pub fn is_arrival(&self) -> bool {
        self.state == SessionState::Completed
    }
}
