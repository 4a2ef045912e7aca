//! Provider traits and shared types.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::geo::GeoPoint;
use crate::route::{Route, RouteError, VehicleMode, Waypoint};

/// Errors raised by external routing and roads providers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport-level failure (connection refused, DNS, TLS...).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Request exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// Response body could not be understood.
    #[error("malformed response: {0}")]
    Parse(String),

    /// Provider answered but had nothing for this request.
    #[error("provider returned no results")]
    NoResults,

    /// Provider refused the request (bad key, quota, invalid arguments).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Provider returned a route that fails construction invariants.
    #[error("invalid route: {0}")]
    InvalidRoute(#[from] RouteError),
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::HttpError(_) | ProviderError::Timeout => true,
            ProviderError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Parse(_)
            | ProviderError::NoResults
            | ProviderError::Rejected(_)
            | ProviderError::InvalidRoute(_) => false,
        }
    }
}

/// A request for a route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    /// Ordered intermediate stops.
    pub waypoints: Vec<Waypoint>,
    pub vehicle_mode: VehicleMode,
}

impl RouteRequest {
    pub fn new(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self {
            origin,
            destination,
            waypoints: Vec::new(),
            vehicle_mode: VehicleMode::default(),
        }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Waypoint>) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn with_vehicle_mode(mut self, mode: VehicleMode) -> Self {
        self.vehicle_mode = mode;
        self
    }
}

/// Supplies planned routes.
pub trait RoutingProvider: Send + Sync {
    /// Fetch a route for the request.
    fn get_route<'a>(&'a self, request: &'a RouteRequest)
        -> BoxFuture<'a, Result<Route, ProviderError>>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// A point returned by the snap-to-road service.
#[derive(Debug, Clone, PartialEq)]
pub struct SnappedPoint {
    pub location: GeoPoint,
    /// Index of the input point this was snapped from; `None` for
    /// interpolated points.
    pub original_index: Option<usize>,
    /// Opaque road segment identifier.
    pub place_id: Option<String>,
}

/// Posted speed limit for a road segment.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSpeedLimit {
    pub place_id: String,
    pub limit_kmh: f64,
}

/// Snap-to-road and speed-limit lookups.
pub trait RoadsProvider: Send + Sync {
    /// Snap raw points to the road network.
    fn snap_to_road<'a>(
        &'a self,
        points: &'a [GeoPoint],
        interpolate: bool,
    ) -> BoxFuture<'a, Result<Vec<SnappedPoint>, ProviderError>>;

    /// Look up speed limits for road segments.
    fn speed_limits<'a>(
        &'a self,
        place_ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<PlaceSpeedLimit>, ProviderError>>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
