//! Navigation thresholds.
//!
//! These values are fixed for interoperability: tests and other clients of
//! the engine depend on them. [`NavigationConfig`](super::NavigationConfig)
//! uses them as defaults.

/// Distance to a step end, waypoint or destination that counts as reached.
pub const ARRIVAL_RADIUS_M: f64 = 20.0;

/// Distance from the route beyond which a position is off-route.
///
/// Exclusive: a position exactly this far away is still on-route.
pub const REROUTE_THRESHOLD_M: f64 = 50.0;

/// Consecutive off-route ticks before a reroute is requested.
pub const DEVIATION_STRIKES: u32 = 3;

/// Distance to the maneuver within which the raw step instruction is spoken.
pub const INSTRUCTION_LEAD_DISTANCE_M: f64 = 150.0;

/// Bearing change below which a maneuver is "continue straight".
pub const TURN_ANGLE_THRESHOLD_DEG: f64 = 30.0;

/// Bearing change at or above which a maneuver is a U-turn.
pub const UTURN_THRESHOLD_DEG: f64 = 160.0;

/// Overspeed, in km/h above the limit, separating the warning severities.
pub const SPEED_WARNING_THRESHOLD_KMH: f64 = 10.0;

/// Speed assumed for time estimates, m/s.
pub const DEFAULT_AVERAGE_SPEED_MPS: f64 = 15.0;

/// Distances to the maneuver at which instructions are announced.
pub const ANNOUNCEMENT_BANDS_M: [f64; 4] = [1000.0, 500.0, 200.0, 50.0];

/// Half-width of each announcement band.
pub const ANNOUNCEMENT_TOLERANCE_M: f64 = 20.0;

/// Below this distance to the maneuver the next step is previewed.
pub const LOOKAHEAD_DISTANCE_M: f64 = 50.0;

/// Above this distance the instruction is a plain "continue".
pub const CONTINUE_DISTANCE_M: f64 = 1000.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_ordered() {
        assert!(ARRIVAL_RADIUS_M < REROUTE_THRESHOLD_M);
        assert!(LOOKAHEAD_DISTANCE_M < INSTRUCTION_LEAD_DISTANCE_M);
        assert!(INSTRUCTION_LEAD_DISTANCE_M < CONTINUE_DISTANCE_M);
        assert!(TURN_ANGLE_THRESHOLD_DEG < UTURN_THRESHOLD_DEG);
    }

    #[test]
    fn test_announcement_bands_do_not_overlap() {
        for pair in ANNOUNCEMENT_BANDS_M.windows(2) {
            assert!(pair[0] - pair[1] > 2.0 * ANNOUNCEMENT_TOLERANCE_M);
        }
    }
}
