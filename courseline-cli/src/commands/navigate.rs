//! Navigate command - plan a live route and follow recorded fixes.

use std::path::PathBuf;
use std::sync::Arc;

use courseline::geo::GeoPoint;
use courseline::matching::MapMatcher;
use courseline::navigation::Navigator;
use courseline::provider::{ProviderFactory, RouteRequest};
use courseline::route::{Waypoint, WaypointKind};
use tracing::info;

use super::common::{drive, load_config, load_fixes, OutputFormat};
use crate::error::CliError;

/// Arguments for the navigate command.
pub struct NavigateArgs {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub waypoints: Vec<GeoPoint>,
    pub fixes: PathBuf,
    pub config: Option<PathBuf>,
    pub api_key: Option<String>,
    pub interval_ms: u64,
    pub format: OutputFormat,
}

/// Run the navigate command.
pub async fn run(args: NavigateArgs) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;

    // CLI takes precedence, then config
    if let Some(key) = args.api_key {
        config.provider.api_key = Some(key);
    }
    if config.provider.api_key.is_none() {
        return Err(CliError::Config(
            "Google Maps providers require an API key. \
             Set api_key in the [provider] section of config.ini or use --api-key"
                .to_string(),
        ));
    }

    let factory = ProviderFactory::new(config.provider.clone())
        .with_thresholds(config.navigation.maneuver_thresholds());
    let routing = factory.routing()?;
    let roads = factory.roads()?;

    let waypoints = args
        .waypoints
        .iter()
        .enumerate()
        .map(|(i, p)| Waypoint::new(*p, format!("Stop {}", i + 1), WaypointKind::Stop))
        .collect();
    let request = RouteRequest::new(args.origin, args.destination)
        .with_waypoints(waypoints)
        .with_vehicle_mode(config.provider.vehicle_mode);

    let source = load_fixes(&args.fixes, args.interval_ms)?;
    info!(
        origin = %request.origin,
        destination = %request.destination,
        waypoints = request.waypoints.len(),
        mode = request.vehicle_mode.as_str(),
        "Planning route"
    );

    let matcher = Arc::new(MapMatcher::new(roads, config.matching.clone()));
    let navigator = Navigator::new(routing, matcher, config.navigation.clone());
    let handle = navigator.start_navigation(request, &source).await?;
    drive(handle, args.format).await
}
