//! Map-matching result types.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::location::LocationFix;

/// Road classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    Highway,
    Arterial,
    Local,
    /// Posted limit below 30 km/h.
    Residential,
    #[default]
    Unknown,
}

impl RoadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoadType::Highway => "highway",
            RoadType::Arterial => "arterial",
            RoadType::Local => "local",
            RoadType::Residential => "residential",
            RoadType::Unknown => "unknown",
        }
    }
}

/// Estimated lane, 1 = nearest the road centre line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanePosition {
    pub lane: u8,
    pub total_lanes: u8,
}

/// A raw fix corrected onto the road network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedLocation {
    pub original: LocationFix,
    pub snapped: GeoPoint,
    /// Provider road segment id.
    pub road_id: Option<String>,
    /// Distance between the raw and snapped points in metres.
    pub snap_distance_m: f64,
    /// 0.0 to 1.0, non-increasing with snap distance.
    pub confidence: f64,
    /// Degrees.
    pub bearing: f64,
    pub speed_limit_kmh: Option<f64>,
    pub road_type: RoadType,
    pub lane: Option<LanePosition>,
}

impl MatchedLocation {
    /// Fallback when matching failed: the raw point stands in for the snap.
    pub fn unmatched(fix: LocationFix) -> Self {
        Self {
            original: fix,
            snapped: fix.position,
            road_id: None,
            snap_distance_m: 0.0,
            confidence: 0.0,
            bearing: fix.bearing,
            speed_limit_kmh: None,
            road_type: RoadType::Unknown,
            lane: None,
        }
    }

    /// Whether this came from the roads provider.
    pub fn is_matched(&self) -> bool {
        self.confidence > 0.0
    }

    /// Re-attach a cached match to a new fix at the same coordinate.
    pub(crate) fn for_fix(mut self, fix: LocationFix) -> Self {
        self.original = fix;
        self.bearing = fix.bearing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_uses_raw_point() {
        let fix = LocationFix::at(GeoPoint::new(10.0, 20.0)).with_bearing(45.0);
        let matched = MatchedLocation::unmatched(fix);
        assert_eq!(matched.snapped, fix.position);
        assert_eq!(matched.confidence, 0.0);
        assert_eq!(matched.road_type, RoadType::Unknown);
        assert_eq!(matched.bearing, 45.0);
        assert!(!matched.is_matched());
    }
}
