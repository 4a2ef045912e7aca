//! Confidence, road type and lane estimation for snapped points.

use super::config::{MatchingConfig, MAX_LANE};
use super::types::{LanePosition, RoadType};

/// Confidence bands as `(max snap distance in metres, confidence)`.
const CONFIDENCE_BANDS: [(f64, f64); 5] = [(5.0, 1.0), (10.0, 0.9), (20.0, 0.8), (30.0, 0.7), (50.0, 0.5)];

/// Confidence beyond the last band.
const FLOOR_CONFIDENCE: f64 = 0.3;

const HIGHWAY_MIN_KMH: f64 = 100.0;
const ARTERIAL_MIN_KMH: f64 = 60.0;
const LOCAL_MIN_KMH: f64 = 30.0;

/// Confidence for a snap distance. Non-increasing step function.
pub fn confidence_for_distance(snap_distance_m: f64) -> f64 {
    CONFIDENCE_BANDS
        .iter()
        .find(|(max, _)| snap_distance_m <= *max)
        .map(|(_, confidence)| *confidence)
        .unwrap_or(FLOOR_CONFIDENCE)
}

/// Classify a road from its speed limit, falling back to the road id.
pub fn classify_road_type(speed_limit_kmh: Option<f64>, road_id: Option<&str>) -> RoadType {
    if let Some(limit) = speed_limit_kmh {
        return if limit >= HIGHWAY_MIN_KMH {
            RoadType::Highway
        } else if limit >= ARTERIAL_MIN_KMH {
            RoadType::Arterial
        } else if limit >= LOCAL_MIN_KMH {
            RoadType::Local
        } else {
            RoadType::Residential
        };
    }

    let Some(id) = road_id else {
        return RoadType::Unknown;
    };
    let id = id.to_ascii_lowercase();
    if ["highway", "motorway", "freeway", "expressway"]
        .iter()
        .any(|k| id.contains(k))
    {
        RoadType::Highway
    } else if ["avenue", "boulevard", "arterial"].iter().any(|k| id.contains(k)) {
        RoadType::Arterial
    } else if ["street", "road", "lane"].iter().any(|k| id.contains(k)) {
        RoadType::Local
    } else {
        RoadType::Unknown
    }
}

/// Estimate the lane from the lateral snap offset.
///
/// Only attempted when the snap is close enough to be trusted.
pub fn estimate_lane(snap_distance_m: f64, config: &MatchingConfig) -> Option<LanePosition> {
    if snap_distance_m > config.lane_estimation_radius_m || config.lane_width_m <= 0.0 {
        return None;
    }
    let raw = (snap_distance_m / config.lane_width_m).round();
    let lane = raw.clamp(1.0, MAX_LANE as f64) as u8;
    Some(LanePosition {
        lane,
        total_lanes: config.total_lanes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_confidence_steps() {
        assert_eq!(confidence_for_distance(3.0), 1.0);
        assert_eq!(confidence_for_distance(8.0), 0.9);
        assert_eq!(confidence_for_distance(15.0), 0.8);
        assert_eq!(confidence_for_distance(25.0), 0.7);
        assert_eq!(confidence_for_distance(40.0), 0.5);
        assert_eq!(confidence_for_distance(60.0), 0.3);
    }

    #[test]
    fn test_confidence_band_edges_are_inclusive() {
        assert_eq!(confidence_for_distance(5.0), 1.0);
        assert_eq!(confidence_for_distance(50.0), 0.5);
        assert_eq!(confidence_for_distance(50.01), 0.3);
    }

    proptest! {
        #[test]
        fn prop_confidence_non_increasing(a in 0.0f64..500.0, b in 0.0f64..500.0) {
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(confidence_for_distance(near) >= confidence_for_distance(far));
        }
    }

    #[test]
    fn test_road_type_from_speed_limit() {
        assert_eq!(classify_road_type(Some(110.0), None), RoadType::Highway);
        assert_eq!(classify_road_type(Some(100.0), None), RoadType::Highway);
        assert_eq!(classify_road_type(Some(70.0), None), RoadType::Arterial);
        assert_eq!(classify_road_type(Some(30.0), None), RoadType::Local);
        assert_eq!(classify_road_type(Some(20.0), None), RoadType::Residential);
    }

    #[test]
    fn test_road_type_falls_back_to_id() {
        assert_eq!(classify_road_type(None, Some("I-5 Freeway")), RoadType::Highway);
        assert_eq!(classify_road_type(None, Some("Park Avenue")), RoadType::Arterial);
        assert_eq!(classify_road_type(None, Some("Elm Street")), RoadType::Local);
        assert_eq!(classify_road_type(None, Some("ChIJ2eUgeAK6j4AR")), RoadType::Unknown);
        assert_eq!(classify_road_type(None, None), RoadType::Unknown);
    }

    #[test]
    fn test_speed_limit_wins_over_id() {
        assert_eq!(classify_road_type(Some(50.0), Some("motorway")), RoadType::Local);
    }

    #[test]
    fn test_lane_estimation() {
        let config = MatchingConfig::default();
        assert_eq!(estimate_lane(0.5, &config).unwrap().lane, 1);
        assert_eq!(estimate_lane(7.0, &config).unwrap().lane, 2);
        assert_eq!(estimate_lane(11.0, &config).unwrap().lane, 3);
        assert_eq!(estimate_lane(19.0, &config).unwrap().lane, 4);
        assert_eq!(estimate_lane(19.0, &config).unwrap().total_lanes, 3);
        assert!(estimate_lane(20.5, &config).is_none());
    }
}
