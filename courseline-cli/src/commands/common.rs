//! Common types and utilities shared across CLI commands.

use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use courseline::config::ConfigFile;
use courseline::geo::GeoPoint;
use courseline::location::ReplayLocationSource;
use courseline::navigation::{
    dispatch_announcements, AnnouncementPriority, NavigationHandle, NavigationUpdate,
    TrackingStatus, VoiceChannel,
};
use futures::{FutureExt, StreamExt};
use tracing::{info, warn};

use crate::error::CliError;

/// How updates are printed.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq)]
pub enum OutputFormat {
    /// One readable line per update
    #[default]
    Text,
    /// One JSON object per update
    Json,
}

/// Parse a "lat,lon" argument.
pub fn parse_point(raw: &str) -> Result<GeoPoint, CliError> {
    let invalid = || CliError::InvalidArgument(format!("expected 'lat,lon', got '{}'", raw));
    let (lat, lon) = raw.split_once(',').ok_or_else(invalid)?;
    let latitude: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let longitude: f64 = lon.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid());
    }
    Ok(GeoPoint::new(latitude, longitude))
}

/// Config from `--config`, else the default path, else defaults.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load(path)?),
        None => match ConfigFile::default_path() {
            Some(default) => Ok(ConfigFile::load_or_default(&default)?),
            None => Ok(ConfigFile::default()),
        },
    }
}

/// Load recorded fixes, optionally paced.
pub fn load_fixes(path: &Path, interval_ms: u64) -> Result<ReplayLocationSource, CliError> {
    let source = ReplayLocationSource::from_json_file(path)?
        .with_interval(Duration::from_millis(interval_ms));
    if source.is_empty() {
        return Err(CliError::InvalidArgument(format!(
            "{} contains no fixes",
            path.display()
        )));
    }
    Ok(source)
}

/// Prints announcements to stdout.
pub struct ConsoleVoice;

impl VoiceChannel for ConsoleVoice {
    fn announce(&self, text: &str, priority: AnnouncementPriority) {
        match priority {
            AnnouncementPriority::FlushNow => println!("  >> {}", text),
            AnnouncementPriority::Enqueue => println!("  >  {}", text),
        }
    }
}

/// Print every update until the session completes, the source runs dry or
/// the user presses Ctrl-C.
pub async fn drive(handle: NavigationHandle, format: OutputFormat) -> Result<(), CliError> {
    let session_id = handle.session_id();
    let stopper = handle.stop_handle();
    let interrupt = stopper.clone();
    if let Err(e) = ctrlc::set_handler(move || interrupt.stop()) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }
    let mut tracking = handle.tracking_watch();
    let mut updates = handle.into_stream();
    let voice = ConsoleVoice;
    let mut last: Option<NavigationUpdate> = None;

    loop {
        tokio::select! {
            update = updates.next() => match update {
                Some(update) => {
                    print_update(&update, format)?;
                    if format == OutputFormat::Text {
                        dispatch_announcements(&update, &voice);
                    }
                    last = Some(update);
                }
                None => break,
            },
            changed = tracking.changed() => {
                let ended = changed.is_err()
                    || *tracking.borrow() == TrackingStatus::SourceEnded;
                if ended {
                    // Everything the source produced is already buffered
                    while let Some(Some(update)) = updates.next().now_or_never() {
                        print_update(&update, format)?;
                        if format == OutputFormat::Text {
                            dispatch_announcements(&update, &voice);
                        }
                        last = Some(update);
                    }
                    stopper.stop();
                    break;
                }
            }
        }
    }

    match last {
        Some(update) => info!(
            session_id = %session_id,
            updates = update.sequence,
            distance_traveled_m = update.distance_traveled_m,
            state = %update.state,
            "Session finished"
        ),
        None => info!(session_id = %session_id, "Session produced no updates"),
    }
    Ok(())
}

fn print_update(update: &NavigationUpdate, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let line = serde_json::to_string(update)
                .map_err(|e| CliError::InvalidArgument(format!("cannot encode update: {}", e)))?;
            println!("{}", line);
        }
        OutputFormat::Text => {
            println!(
                "#{:<4} step {:>2} | {:>7.0} m to maneuver | {:>7.0} m left | {:>5.1} km/h{}{} | {}",
                update.sequence,
                update.step_index,
                update.distance_to_maneuver_m,
                update.distance_remaining_m,
                update.speed_kmh,
                if update.off_route { " | OFF ROUTE" } else { "" },
                if update.rerouted { " | REROUTED" } else { "" },
                update.instruction.as_deref().unwrap_or("-"),
            );
            if let Some(warning) = &update.speed_warning {
                println!("  !  {}", warning.message());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        let p = parse_point("52.52, 13.405").unwrap();
        assert_eq!(p, GeoPoint::new(52.52, 13.405));
    }

    #[test]
    fn test_parse_point_rejects_garbage() {
        assert!(parse_point("52.52").is_err());
        assert!(parse_point("north,east").is_err());
        assert!(parse_point("95.0,10.0").is_err());
    }

    #[test]
    fn test_load_fixes_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixes.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(
            load_fixes(&path, 0),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[navigation]\ndeviation_strikes = 4\n").unwrap();
        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.navigation.deviation_strikes, 4);
    }
}
