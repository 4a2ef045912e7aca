//! Google Maps Platform providers.
//!
//! Routes come from the Directions API and snapping/speed limits from the
//! Roads API. Both require an API key with the respective API enabled.
//!
//! # API Endpoints
//!
//! - Directions: `{base}/directions/json?origin=..&destination=..&waypoints=..&mode=..&key=..`
//! - Snap to roads: `{base}/snapToRoads?path=lat,lng|lat,lng&interpolate=true&key=..`
//! - Speed limits: `{base}/speedLimits?placeId=..&placeId=..&key=..`
//!
//! The Roads API accepts at most 100 points or place ids per request, so
//! larger inputs are split into batches.

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use crate::geo::polyline;
use crate::geo::GeoPoint;
use crate::provider::{
    AsyncHttpClient, PlaceSpeedLimit, ProviderError, RoadsProvider, RouteRequest, RoutingProvider,
    SnappedPoint,
};
use crate::route::{Maneuver, ManeuverThresholds, Route, RouteParts, Step};

/// Default Directions API base URL.
pub const DEFAULT_DIRECTIONS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Default Roads API base URL.
pub const DEFAULT_ROADS_BASE_URL: &str = "https://roads.googleapis.com/v1";

/// Roads API batch limit.
const ROADS_BATCH_SIZE: usize = 100;

/// Kilometres per mile.
const KM_PER_MILE: f64 = 1.609_344;

/// Percent-encoded `|` separator.
const PIPE: &str = "%7C";

// ─────────────────────────────────────────────────────────────────────────────
// Directions
// ─────────────────────────────────────────────────────────────────────────────

/// Routing provider backed by the Google Directions API.
pub struct GoogleDirectionsProvider<C: AsyncHttpClient> {
    http_client: C,
    api_key: String,
    base_url: String,
    thresholds: ManeuverThresholds,
}

impl<C: AsyncHttpClient> GoogleDirectionsProvider<C> {
    /// Creates a new Directions provider with the given API key.
    pub fn new(http_client: C, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: DEFAULT_DIRECTIONS_BASE_URL.to_string(),
            thresholds: ManeuverThresholds::default(),
        }
    }

    /// Use a different API host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Thresholds used when a step arrives without a maneuver.
    pub fn with_thresholds(mut self, thresholds: ManeuverThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    fn build_url(&self, request: &RouteRequest) -> String {
        let mut url = format!(
            "{}/directions/json?origin={}&destination={}&mode={}",
            self.base_url,
            request.origin,
            request.destination,
            request.vehicle_mode.as_str()
        );

        if !request.waypoints.is_empty() {
            let waypoints: Vec<String> = request
                .waypoints
                .iter()
                .map(|wp| {
                    if wp.kind.is_pass_through() {
                        format!("via:{}", wp.location)
                    } else {
                        wp.location.to_string()
                    }
                })
                .collect();
            url.push_str("&waypoints=");
            url.push_str(&waypoints.join(PIPE));
        }

        url.push_str("&key=");
        url.push_str(&self.api_key);
        url
    }

    fn parse_route(&self, body: &[u8], request: &RouteRequest) -> Result<Route, ProviderError> {
        let response: DirectionsResponse =
            serde_json::from_slice(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        match response.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" | "NOT_FOUND" => return Err(ProviderError::NoResults),
            other => {
                return Err(ProviderError::Rejected(match response.error_message {
                    Some(msg) => format!("{}: {}", other, msg),
                    None => other.to_string(),
                }))
            }
        }

        let api_route = response
            .routes
            .into_iter()
            .next()
            .ok_or(ProviderError::NoResults)?;

        let mut steps = Vec::new();
        for api_step in api_route.legs.into_iter().flat_map(|leg| leg.steps) {
            let instruction = strip_html(&api_step.html_instructions);
            let geometry = polyline::decode(&api_step.polyline.points)
                .map_err(|e| ProviderError::Parse(format!("step polyline: {}", e)))?;

            let mut step = Step::new(
                instruction.clone(),
                api_step.start_location.into(),
                api_step.end_location.into(),
            )
            .with_polyline(geometry)
            .with_distance(api_step.distance.value)
            .with_duration(api_step.duration.value);

            if let Some(keyword) = api_step.maneuver.as_deref() {
                step = step.with_maneuver(Maneuver::from_provider(keyword, &instruction));
            }
            steps.push(step);
        }

        let parts = RouteParts {
            steps,
            encoded_polyline: api_route.overview_polyline.map(|p| p.points),
            distance_m: None,
            duration_s: None,
            waypoints: request.waypoints.clone(),
        };
        Ok(Route::from_parts(parts, self.thresholds)?)
    }
}

impl<C: AsyncHttpClient> RoutingProvider for GoogleDirectionsProvider<C> {
    fn get_route<'a>(
        &'a self,
        request: &'a RouteRequest,
    ) -> BoxFuture<'a, Result<Route, ProviderError>> {
        Box::pin(async move {
            let url = self.build_url(request);
            debug!(
                origin = %request.origin,
                destination = %request.destination,
                waypoints = request.waypoints.len(),
                "Requesting directions"
            );
            let body = self.http_client.get(&url).await?;
            self.parse_route(&body, request)
        })
    }

    fn name(&self) -> &str {
        "Google Directions"
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    #[serde(default)]
    overview_polyline: Option<ApiPolyline>,
    #[serde(default)]
    legs: Vec<ApiLeg>,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    #[serde(default)]
    steps: Vec<ApiStep>,
}

#[derive(Debug, Deserialize)]
struct ApiStep {
    #[serde(default)]
    html_instructions: String,
    distance: ApiValue,
    duration: ApiValue,
    start_location: ApiLatLng,
    end_location: ApiLatLng,
    polyline: ApiPolyline,
    #[serde(default)]
    maneuver: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiValue {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct ApiLatLng {
    lat: f64,
    lng: f64,
}

impl From<ApiLatLng> for GeoPoint {
    fn from(p: ApiLatLng) -> Self {
        GeoPoint::new(p.lat, p.lng)
    }
}

#[derive(Debug, Deserialize)]
struct ApiPolyline {
    points: String,
}

/// Reduce Directions `html_instructions` to plain text.
///
/// Block-level `<div>` tags start a new sentence; all other tags are dropped.
pub(crate) fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '<' {
            let mut tag = String::new();
            for t in chars.by_ref() {
                if t == '>' {
                    break;
                }
                tag.push(t);
            }
            if tag.trim_start().to_ascii_lowercase().starts_with("div") {
                text.push(' ');
            }
        } else {
            text.push(c);
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Roads
// ─────────────────────────────────────────────────────────────────────────────

/// Roads provider backed by the Google Roads API.
pub struct GoogleRoadsProvider<C: AsyncHttpClient> {
    http_client: C,
    api_key: String,
    base_url: String,
}

impl<C: AsyncHttpClient> GoogleRoadsProvider<C> {
    /// Creates a new Roads provider with the given API key.
    pub fn new(http_client: C, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: DEFAULT_ROADS_BASE_URL.to_string(),
        }
    }

    /// Use a different API host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn snap_url(&self, points: &[GeoPoint], interpolate: bool) -> String {
        let path: Vec<String> = points.iter().map(GeoPoint::to_string).collect();
        format!(
            "{}/snapToRoads?path={}&interpolate={}&key={}",
            self.base_url,
            path.join(PIPE),
            interpolate,
            self.api_key
        )
    }

    fn speed_limits_url(&self, place_ids: &[String]) -> String {
        let mut url = format!("{}/speedLimits?", self.base_url);
        for id in place_ids {
            url.push_str("placeId=");
            url.push_str(id);
            url.push('&');
        }
        url.push_str("key=");
        url.push_str(&self.api_key);
        url
    }
}

impl<C: AsyncHttpClient> RoadsProvider for GoogleRoadsProvider<C> {
    fn snap_to_road<'a>(
        &'a self,
        points: &'a [GeoPoint],
        interpolate: bool,
    ) -> BoxFuture<'a, Result<Vec<SnappedPoint>, ProviderError>> {
        Box::pin(async move {
            let mut snapped = Vec::new();
            for (batch_index, batch) in points.chunks(ROADS_BATCH_SIZE).enumerate() {
                let offset = batch_index * ROADS_BATCH_SIZE;
                let body = self.http_client.get(&self.snap_url(batch, interpolate)).await?;
                let response: SnapResponse = serde_json::from_slice(&body)
                    .map_err(|e| ProviderError::Parse(e.to_string()))?;

                snapped.extend(response.snapped_points.into_iter().map(|p| SnappedPoint {
                    location: GeoPoint::new(p.location.latitude, p.location.longitude),
                    original_index: p.original_index.map(|i| i + offset),
                    place_id: p.place_id,
                }));
            }
            Ok(snapped)
        })
    }

    fn speed_limits<'a>(
        &'a self,
        place_ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<PlaceSpeedLimit>, ProviderError>> {
        Box::pin(async move {
            let mut limits = Vec::new();
            for batch in place_ids.chunks(ROADS_BATCH_SIZE) {
                let body = self.http_client.get(&self.speed_limits_url(batch)).await?;
                let response: SpeedLimitResponse = serde_json::from_slice(&body)
                    .map_err(|e| ProviderError::Parse(e.to_string()))?;

                limits.extend(response.speed_limits.into_iter().map(|l| PlaceSpeedLimit {
                    limit_kmh: if l.units.eq_ignore_ascii_case("MPH") {
                        l.speed_limit * KM_PER_MILE
                    } else {
                        l.speed_limit
                    },
                    place_id: l.place_id,
                }));
            }
            Ok(limits)
        })
    }

    fn name(&self) -> &str {
        "Google Roads"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapResponse {
    #[serde(default)]
    snapped_points: Vec<ApiSnappedPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSnappedPoint {
    location: ApiLatitudeLongitude,
    #[serde(default)]
    original_index: Option<usize>,
    #[serde(default)]
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLatitudeLongitude {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeedLimitResponse {
    #[serde(default)]
    speed_limits: Vec<ApiSpeedLimit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSpeedLimit {
    place_id: String,
    speed_limit: f64,
    #[serde(default = "default_units")]
    units: String,
}

fn default_units() -> String {
    "KPH".to_string()
}
