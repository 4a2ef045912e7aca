//! Navigation session configuration.

use super::constants::*;
use crate::route::ManeuverThresholds;

/// Thresholds used by a navigation session.
///
/// Defaults are the fixed values in [`constants`](super::constants).
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationConfig {
    /// Step end, waypoint and destination arrival radius. Default: 20m.
    pub arrival_radius_m: f64,

    /// Off-route distance. Default: 50m.
    pub reroute_threshold_m: f64,

    /// Consecutive off-route ticks before rerouting. Default: 3.
    pub deviation_strikes: u32,

    /// Raw-instruction lead distance. Default: 150m.
    pub instruction_lead_distance_m: f64,

    /// Straight vs turn bearing change. Default: 30°.
    pub turn_angle_threshold_deg: f64,

    /// U-turn bearing change. Default: 160°.
    pub uturn_threshold_deg: f64,

    /// Speed warning step. Default: 10 km/h.
    pub speed_warning_threshold_kmh: f64,

    /// Speed for time estimates. Default: 15 m/s.
    pub average_speed_mps: f64,

    /// Announcement distances. Default: 1000, 500, 200, 50m.
    pub announcement_bands_m: Vec<f64>,

    /// Announcement band half-width. Default: 20m.
    pub announcement_tolerance_m: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            arrival_radius_m: ARRIVAL_RADIUS_M,
            reroute_threshold_m: REROUTE_THRESHOLD_M,
            deviation_strikes: DEVIATION_STRIKES,
            instruction_lead_distance_m: INSTRUCTION_LEAD_DISTANCE_M,
            turn_angle_threshold_deg: TURN_ANGLE_THRESHOLD_DEG,
            uturn_threshold_deg: UTURN_THRESHOLD_DEG,
            speed_warning_threshold_kmh: SPEED_WARNING_THRESHOLD_KMH,
            average_speed_mps: DEFAULT_AVERAGE_SPEED_MPS,
            announcement_bands_m: ANNOUNCEMENT_BANDS_M.to_vec(),
            announcement_tolerance_m: ANNOUNCEMENT_TOLERANCE_M,
        }
    }
}

impl NavigationConfig {
    /// Thresholds for inferring maneuvers on ingested routes.
    pub fn maneuver_thresholds(&self) -> ManeuverThresholds {
        ManeuverThresholds {
            turn_deg: self.turn_angle_threshold_deg,
            uturn_deg: self.uturn_threshold_deg,
        }
    }
}
