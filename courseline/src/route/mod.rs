//! Route model.
//!
//! A [`Route`] is the immutable plan a navigation session follows: ordered
//! [`Step`]s with geometry, maneuver and distance/duration, plus the trip's
//! waypoints. It is replaced wholesale on reroute, never edited.
//!
//! Construction is the single place where route invariants are checked. A
//! route with no steps, or a step whose geometry disagrees with its endpoints,
//! is rejected here so the session never has to handle it.

mod maneuver;
mod waypoint;

pub use maneuver::{exit_number_from_instruction, Maneuver, ManeuverModifier, ManeuverType};
pub use waypoint::{Waypoint, WaypointKind};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::polyline::{self, PolylineError};
use crate::geo::{distance, heading, path_length, GeoPoint};

/// Maximum distance between a step's endpoints and its polyline ends.
pub const ENDPOINT_TOLERANCE_M: f64 = 10.0;

/// Errors raised when a route violates its construction invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// A route must contain at least one step.
    #[error("route has no steps")]
    NoSteps,

    /// Step geometry does not start/end at the step's endpoints.
    #[error("step {index} geometry is {offset_m:.1} m from its {end} location")]
    GeometryMismatch {
        index: usize,
        end: &'static str,
        offset_m: f64,
    },

    /// Encoded geometry could not be decoded.
    #[error("invalid polyline: {0}")]
    InvalidPolyline(#[from] PolylineError),
}

/// Travel mode requested from the routing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    TwoWheeler,
}

impl VehicleMode {
    /// Provider wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleMode::Driving => "driving",
            VehicleMode::Walking => "walking",
            VehicleMode::Bicycling => "bicycling",
            VehicleMode::TwoWheeler => "two_wheeler",
        }
    }

    /// Parse a wire name; unknown names fall back to driving.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "walking" | "walk" => VehicleMode::Walking,
            "bicycling" | "bicycle" | "bike" => VehicleMode::Bicycling,
            "two_wheeler" | "motorcycle" | "scooter" => VehicleMode::TwoWheeler,
            _ => VehicleMode::Driving,
        }
    }
}

/// Lane guidance for one lane at a maneuver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    /// Directions this lane allows.
    pub indications: Vec<ManeuverModifier>,
    /// Whether the lane is valid for the upcoming maneuver.
    pub valid: bool,
}

/// One leg of turn-by-turn guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub instruction: String,
    /// Length in metres.
    pub distance_m: f64,
    /// Expected travel time in seconds.
    pub duration_s: f64,
    pub start_location: GeoPoint,
    pub end_location: GeoPoint,
    pub maneuver: Option<Maneuver>,
    /// Ordered geometry, first point at `start_location`, last at `end_location`.
    pub polyline: Vec<GeoPoint>,
    /// Posted limit in km/h.
    pub speed_limit_kmh: Option<f64>,
    pub lanes: Option<Vec<Lane>>,
}

impl Step {
    /// Create a step with straight-line geometry between its endpoints.
    ///
    /// Distance defaults to the straight-line length; use the builder
    /// methods to attach provider data.
    pub fn new(instruction: impl Into<String>, start: GeoPoint, end: GeoPoint) -> Self {
        Self {
            instruction: instruction.into(),
            distance_m: distance(start, end),
            duration_s: 0.0,
            start_location: start,
            end_location: end,
            maneuver: None,
            polyline: vec![start, end],
            speed_limit_kmh: None,
            lanes: None,
        }
    }

    /// Replace the geometry; distance is recomputed from it.
    pub fn with_polyline(mut self, polyline: Vec<GeoPoint>) -> Self {
        self.distance_m = path_length(&polyline);
        self.polyline = polyline;
        self
    }

    pub fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = distance_m;
        self
    }

    pub fn with_duration(mut self, duration_s: f64) -> Self {
        self.duration_s = duration_s;
        self
    }

    pub fn with_maneuver(mut self, maneuver: Maneuver) -> Self {
        self.maneuver = Some(maneuver);
        self
    }

    pub fn with_speed_limit(mut self, speed_limit_kmh: f64) -> Self {
        self.speed_limit_kmh = Some(speed_limit_kmh);
        self
    }

    pub fn with_lanes(mut self, lanes: Vec<Lane>) -> Self {
        self.lanes = Some(lanes);
        self
    }

    fn validate(&mut self, index: usize) -> Result<(), RouteError> {
        if self.polyline.is_empty() {
            self.polyline = vec![self.start_location, self.end_location];
        }

        let check = |end: &'static str, a: GeoPoint, b: GeoPoint| {
            let offset_m = distance(a, b);
            if offset_m > ENDPOINT_TOLERANCE_M {
                Err(RouteError::GeometryMismatch {
                    index,
                    end,
                    offset_m,
                })
            } else {
                Ok(())
            }
        };

        if let (Some(first), Some(last)) = (self.polyline.first(), self.polyline.last()) {
            check("start", *first, self.start_location)?;
            check("end", *last, self.end_location)?;
        }
        Ok(())
    }

    /// Heading of the step's first segment.
    fn initial_heading(&self) -> Option<f64> {
        self.polyline
            .windows(2)
            .find(|w| distance(w[0], w[1]) > 0.0)
            .map(|w| heading(w[0], w[1]))
    }

    /// Heading of the step's last segment.
    fn final_heading(&self) -> Option<f64> {
        self.polyline
            .windows(2)
            .rev()
            .find(|w| distance(w[0], w[1]) > 0.0)
            .map(|w| heading(w[0], w[1]))
    }
}

/// Thresholds used to infer missing maneuvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverThresholds {
    pub turn_deg: f64,
    pub uturn_deg: f64,
}

impl Default for ManeuverThresholds {
    fn default() -> Self {
        Self {
            turn_deg: crate::navigation::TURN_ANGLE_THRESHOLD_DEG,
            uturn_deg: crate::navigation::UTURN_THRESHOLD_DEG,
        }
    }
}

/// An immutable planned route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RouteParts", into = "RouteParts")]
pub struct Route {
    steps: Vec<Step>,
    encoded_polyline: String,
    distance_m: f64,
    duration_s: f64,
    waypoints: Vec<Waypoint>,
}

/// Unvalidated route contents, as supplied by a provider or a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteParts {
    pub steps: Vec<Step>,
    #[serde(default)]
    pub encoded_polyline: Option<String>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

impl TryFrom<RouteParts> for Route {
    type Error = RouteError;

    fn try_from(parts: RouteParts) -> Result<Self, Self::Error> {
        Route::from_parts(parts, ManeuverThresholds::default())
    }
}

impl From<Route> for RouteParts {
    fn from(route: Route) -> Self {
        RouteParts {
            steps: route.steps,
            encoded_polyline: Some(route.encoded_polyline),
            distance_m: Some(route.distance_m),
            duration_s: Some(route.duration_s),
            waypoints: route.waypoints,
        }
    }
}

impl Route {
    /// Build a route from steps, deriving totals and overview geometry.
    pub fn new(steps: Vec<Step>, waypoints: Vec<Waypoint>) -> Result<Self, RouteError> {
        Self::from_parts(
            RouteParts {
                steps,
                encoded_polyline: None,
                distance_m: None,
                duration_s: None,
                waypoints,
            },
            ManeuverThresholds::default(),
        )
    }

    /// Validate provider data and build a route.
    ///
    /// Steps without a maneuver get one inferred from the bearing change at
    /// the step boundary.
    pub fn from_parts(parts: RouteParts, thresholds: ManeuverThresholds) -> Result<Self, RouteError> {
        let RouteParts {
            mut steps,
            encoded_polyline,
            distance_m,
            duration_s,
            waypoints,
        } = parts;

        if steps.is_empty() {
            return Err(RouteError::NoSteps);
        }

        for (index, step) in steps.iter_mut().enumerate() {
            step.validate(index)?;
        }

        for index in 1..steps.len() {
            if steps[index].maneuver.is_some() {
                continue;
            }
            let before = steps[index - 1].final_heading();
            let after = steps[index].initial_heading();
            if let (Some(before), Some(after)) = (before, after) {
                steps[index].maneuver = Some(Maneuver::infer(
                    before,
                    after,
                    thresholds.turn_deg,
                    thresholds.uturn_deg,
                ));
            }
        }

        let encoded_polyline = match encoded_polyline {
            Some(encoded) if !encoded.is_empty() => {
                polyline::decode(&encoded)?;
                encoded
            }
            _ => polyline::encode(&concatenated_geometry(&steps)),
        };

        Ok(Self {
            distance_m: distance_m.unwrap_or_else(|| steps.iter().map(|s| s.distance_m).sum()),
            duration_s: duration_s.unwrap_or_else(|| steps.iter().map(|s| s.duration_s).sum()),
            steps,
            encoded_polyline,
            waypoints,
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Step at `index`, if any.
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Number of steps (never zero).
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn encoded_polyline(&self) -> &str {
        &self.encoded_polyline
    }

    /// Total length in metres.
    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Total expected duration in seconds.
    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Final point of the last step.
    pub fn destination(&self) -> GeoPoint {
        // steps is non-empty by construction
        self.steps[self.steps.len() - 1].end_location
    }

    /// Full route geometry with duplicate step joints removed.
    pub fn geometry(&self) -> Vec<GeoPoint> {
        concatenated_geometry(&self.steps)
    }
}

fn concatenated_geometry(steps: &[Step]) -> Vec<GeoPoint> {
    let mut points: Vec<GeoPoint> = Vec::new();
    for step in steps {
        for point in &step.polyline {
            if points.last() != Some(point) {
                points.push(*point);
            }
        }
    }
    points
}
