//! Replay command - run a session against a recorded route and trip.
//!
//! Uses the offline providers: the route file is served for every routing
//! request and each fix snaps to itself.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use courseline::matching::MapMatcher;
use courseline::navigation::Navigator;
use courseline::provider::{PassthroughRoadsProvider, RouteRequest, StaticRoutingProvider};
use courseline::route::{ManeuverThresholds, Route, RouteParts};
use tracing::info;

use super::common::{drive, load_config, load_fixes, OutputFormat};
use crate::error::CliError;

/// Arguments for the replay command.
pub struct ReplayArgs {
    pub route: PathBuf,
    pub fixes: PathBuf,
    pub config: Option<PathBuf>,
    pub speed_limit: Option<f64>,
    pub interval_ms: u64,
    pub format: OutputFormat,
}

/// Run the replay command.
pub async fn run(args: ReplayArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let route = load_route(&args.route, config.navigation.maneuver_thresholds())?;
    let source = load_fixes(&args.fixes, args.interval_ms)?;

    let origin = route
        .steps()
        .first()
        .map(|s| s.start_location)
        .ok_or_else(|| CliError::InvalidArgument("route has no steps".to_string()))?;
    let request = RouteRequest::new(origin, route.destination())
        .with_waypoints(route.waypoints().to_vec())
        .with_vehicle_mode(config.provider.vehicle_mode);

    info!(
        route = %args.route.display(),
        steps = route.step_count(),
        distance_m = route.distance_m(),
        fixes = source.len(),
        "Replaying recorded trip"
    );

    let roads = match args.speed_limit {
        Some(limit) => PassthroughRoadsProvider::new().with_speed_limit(limit),
        None => PassthroughRoadsProvider::new(),
    };
    let matcher = Arc::new(MapMatcher::new(Arc::new(roads), config.matching.clone()));
    let navigator = Navigator::new(
        Arc::new(StaticRoutingProvider::new(route)),
        matcher,
        config.navigation.clone(),
    );

    let handle = navigator.start_navigation(request, &source).await?;
    drive(handle, args.format).await
}

/// Read a route file, inferring missing maneuvers with `thresholds`.
fn load_route(path: &Path, thresholds: ManeuverThresholds) -> Result<Route, CliError> {
    let read_error = |reason: String| CliError::Read {
        path: path.display().to_string(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;
    let parts: RouteParts = serde_json::from_str(&text).map_err(|e| read_error(e.to_string()))?;
    Route::from_parts(parts, thresholds).map_err(|e| read_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseline::geo::{destination, GeoPoint};
    use courseline::route::{ManeuverType, Step};

    #[test]
    fn test_load_route_rejects_empty_route() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.json");
        std::fs::write(&path, r#"{"steps": []}"#).unwrap();
        assert!(matches!(load_route(&path, ManeuverThresholds::default()), Err(CliError::Read { .. })));
    }

    #[test]
    fn test_load_route_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_route(&dir.path().join("nope.json"), ManeuverThresholds::default()).is_err());
    }

    #[test]
    fn test_load_route_applies_thresholds() {
        // North, then a 45 degree bend to the north-east
        let a = GeoPoint::new(52.52, 13.40);
        let b = destination(a, 0.0, 300.0);
        let c = destination(b, 45.0, 300.0);
        let parts = RouteParts {
            steps: vec![Step::new("Head north", a, b), Step::new("Continue", b, c)],
            encoded_polyline: None,
            distance_m: None,
            duration_s: None,
            waypoints: vec![],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.json");
        std::fs::write(&path, serde_json::to_string(&parts).unwrap()).unwrap();

        let default = load_route(&path, ManeuverThresholds::default()).unwrap();
        assert_eq!(
            default.steps()[1].maneuver.as_ref().unwrap().kind,
            ManeuverType::Turn
        );

        let relaxed = ManeuverThresholds {
            turn_deg: 60.0,
            uturn_deg: 160.0,
        };
        let route = load_route(&path, relaxed).unwrap();
        assert_eq!(
            route.steps()[1].maneuver.as_ref().unwrap().kind,
            ManeuverType::Continue
        );
    }
}
