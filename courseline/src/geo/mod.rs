//! Geometry kernel.
//!
//! Pure spherical-earth functions used by every other module: great-circle
//! distance, initial bearing, point-to-segment projection and great-circle
//! interpolation. Nothing here holds state, and the same inputs always give
//! bit-identical outputs.
//!
//! All angles are degrees, all distances metres.
//!
//! # Example
//!
//! ```
//! use courseline::geo::{distance, heading, GeoPoint};
//!
//! let a = GeoPoint::new(52.5200, 13.4050);
//! let b = GeoPoint::new(52.5200, 13.4150);
//! assert!(distance(a, b) > 600.0);
//! assert!((heading(a, b) - 90.0).abs() < 0.1);
//! ```

pub mod polyline;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Angular distances below this are treated as coincident points.
const COINCIDENT_RAD: f64 = 1e-12;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Central angle between two points in radians (haversine).
fn central_angle(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * h.sqrt().min(1.0).asin()
}

/// Great-circle distance between two points in metres.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    EARTH_RADIUS_M * central_angle(a, b)
}

/// Initial bearing from `a` towards `b`, in degrees `[0, 360)`.
///
/// 0 = north, 90 = east. Coincident points report 0.
pub fn heading(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_bearing(y.atan2(x).to_degrees())
}

/// Normalize any angle to `[0, 360)`.
pub fn normalize_bearing(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Signed change from bearing `from` to bearing `to`, in `(-180, 180]`.
///
/// Positive values are clockwise (a right turn).
pub fn bearing_change(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Closest point on the segment `seg_start → seg_end` to `point`.
///
/// The scalar projection is `distance(start, p) * cos(θ)` where θ is the
/// angle between the segment heading and the heading towards `p`. The result
/// is clamped to the segment endpoints when the projection falls outside
/// `[0, segment_length]`. A zero-length segment returns its single point.
pub fn project_onto_segment(point: GeoPoint, seg_start: GeoPoint, seg_end: GeoPoint) -> GeoPoint {
    let segment_length = distance(seg_start, seg_end);
    if segment_length <= 0.0 {
        return seg_start;
    }

    let point_distance = distance(seg_start, point);
    if point_distance <= 0.0 {
        return seg_start;
    }

    let angle = (heading(seg_start, point) - heading(seg_start, seg_end)).to_radians();
    let projection = point_distance * angle.cos();

    if projection <= 0.0 {
        seg_start
    } else if projection >= segment_length {
        seg_end
    } else {
        interpolate(seg_start, seg_end, projection / segment_length)
    }
}

/// Point at `fraction` along the great-circle path from `a` to `b`.
///
/// `fraction` is clamped to `[0, 1]`.
pub fn interpolate(a: GeoPoint, b: GeoPoint, fraction: f64) -> GeoPoint {
    let fraction = fraction.clamp(0.0, 1.0);
    if fraction == 0.0 {
        return a;
    }
    if fraction == 1.0 {
        return b;
    }

    let delta = central_angle(a, b);
    if delta < COINCIDENT_RAD {
        return a;
    }

    let lat1 = a.latitude.to_radians();
    let lon1 = a.longitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let lon2 = b.longitude.to_radians();

    let sin_delta = delta.sin();
    let wa = ((1.0 - fraction) * delta).sin() / sin_delta;
    let wb = (fraction * delta).sin() / sin_delta;

    let x = wa * lat1.cos() * lon1.cos() + wb * lat2.cos() * lon2.cos();
    let y = wa * lat1.cos() * lon1.sin() + wb * lat2.cos() * lon2.sin();
    let z = wa * lat1.sin() + wb * lat2.sin();

    GeoPoint::new(
        z.atan2((x * x + y * y).sqrt()).to_degrees(),
        y.atan2(x).to_degrees(),
    )
}

/// Destination reached by travelling `distance_m` from `origin` on an
/// initial bearing of `bearing_deg`.
pub fn destination(origin: GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Total length of a polyline in metres.
pub fn path_length(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Nearest point on a polyline and its distance from `point`.
///
/// A single-point polyline is treated as a degenerate segment. Returns
/// `None` for an empty polyline.
pub fn nearest_on_polyline(point: GeoPoint, polyline: &[GeoPoint]) -> Option<(GeoPoint, f64)> {
    match polyline {
        [] => None,
        [only] => Some((*only, distance(point, *only))),
        _ => polyline
            .windows(2)
            .map(|segment| {
                let projected = project_onto_segment(point, segment[0], segment[1]);
                (projected, distance(point, projected))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1)),
    }
}
