//! Off-route detection and the deviation counter.
//!
//! A position is off-route when its distance to the nearest route segment
//! exceeds the reroute threshold. The threshold is exclusive and has no
//! hysteresis of its own: the only smoothing is the strike counter, which
//! requires several consecutive off-route ticks before a reroute.

use crate::geo::{nearest_on_polyline, GeoPoint};

/// Distance from `point` to the nearest segment of `geometry`.
///
/// An empty geometry is infinitely far away.
pub fn distance_from_route(point: GeoPoint, geometry: &[GeoPoint]) -> f64 {
    nearest_on_polyline(point, geometry)
        .map(|(_, d)| d)
        .unwrap_or(f64::INFINITY)
}

/// Whether `point` is off the route. A distance equal to the threshold is
/// on-route.
pub fn is_off_route(point: GeoPoint, geometry: &[GeoPoint], threshold_m: f64) -> bool {
    distance_from_route(point, geometry) > threshold_m
}

/// Counts consecutive off-route ticks.
#[derive(Debug, Clone)]
pub struct DeviationTracker {
    strikes: u32,
    count: u32,
}

impl DeviationTracker {
    pub fn new(strikes: u32) -> Self {
        Self {
            strikes: strikes.max(1),
            count: 0,
        }
    }

    /// Record one tick. Returns `true` when a reroute is due.
    ///
    /// An on-route tick clears the counter. After a failed reroute the
    /// counter stays at or above the strike count, so the next off-route
    /// tick asks again.
    pub fn record(&mut self, off_route: bool) -> bool {
        if off_route {
            self.count = self.count.saturating_add(1);
            self.count >= self.strikes
        } else {
            self.count = 0;
            false
        }
    }

    /// Clear after a successful reroute.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::destination;

    fn north_road() -> Vec<GeoPoint> {
        let a = GeoPoint::new(45.0, 7.0);
        vec![a, destination(a, 0.0, 1000.0)]
    }

    #[test]
    fn test_on_route_point() {
        let road = north_road();
        let p = destination(destination(road[0], 0.0, 500.0), 90.0, 10.0);
        assert!(!is_off_route(p, &road, 50.0));
    }

    #[test]
    fn test_off_route_point() {
        let road = north_road();
        let p = destination(destination(road[0], 0.0, 500.0), 90.0, 100.0);
        assert!(is_off_route(p, &road, 50.0));
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        let road = north_road();
        let p = destination(destination(road[0], 0.0, 500.0), 270.0, 60.0);
        let d = distance_from_route(p, &road);

        assert!(!is_off_route(p, &road, d));
        assert!(is_off_route(p, &road, d - 1e-6));
    }

    #[test]
    fn test_empty_geometry_is_off_route() {
        assert!(is_off_route(GeoPoint::new(0.0, 0.0), &[], 50.0));
    }

    #[test]
    fn test_three_strikes() {
        let mut tracker = DeviationTracker::new(3);
        assert!(!tracker.record(true));
        assert!(!tracker.record(true));
        assert!(tracker.record(true));
        assert_eq!(tracker.count(), 3);

        tracker.reset();
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn test_on_route_tick_clears_counter() {
        let mut tracker = DeviationTracker::new(3);
        tracker.record(true);
        tracker.record(true);
        assert!(!tracker.record(false));
        assert!(!tracker.record(true));
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn test_failed_reroute_retries_on_next_deviation() {
        let mut tracker = DeviationTracker::new(3);
        for _ in 0..3 {
            tracker.record(true);
        }
        // No reset: the reroute failed
        assert!(tracker.record(true));
    }
}
