//! Raw location input.
//!
//! A [`LocationSource`] is a lazy, possibly unbounded stream of fixes that a
//! session consumes. A source that ends is "no further ticks", and an item
//! error is a degraded-mode signal; neither aborts the session.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::geo::GeoPoint;

/// Metres per second to kilometres per hour.
pub const MPS_TO_KMH: f64 = 3.6;

/// Errors reported by a location source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    /// The user or OS revoked location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// The positioning hardware failed.
    #[error("location sensor failure: {0}")]
    SensorFailure(String),

    /// The source can only be consumed once and already was.
    #[error("location source already consumed")]
    AlreadyConsumed,

    /// A recorded trip could not be loaded.
    #[error("failed to load fixes from {path}: {reason}")]
    Load { path: String, reason: String },
}

/// One raw position report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    #[serde(flatten)]
    pub position: GeoPoint,
    /// Horizontal accuracy radius in metres.
    #[serde(default)]
    pub accuracy_m: f64,
    /// Ground speed in metres per second.
    #[serde(default)]
    pub speed_mps: f64,
    /// Course over ground in degrees.
    #[serde(default)]
    pub bearing: f64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl LocationFix {
    /// A fix at `position` with no motion data.
    pub fn at(position: GeoPoint) -> Self {
        Self {
            position,
            accuracy_m: 0.0,
            speed_mps: 0.0,
            bearing: 0.0,
            timestamp_ms: 0,
        }
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = speed_mps;
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = bearing;
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Ground speed in km/h.
    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps * MPS_TO_KMH
    }
}

/// Stream item produced by a location source.
pub type LocationResult = Result<LocationFix, LocationError>;

/// Supplies raw fixes to a navigation session.
pub trait LocationSource: Send + Sync {
    /// Start a fresh stream of fixes.
    fn fixes(&self) -> BoxStream<'static, LocationResult>;
}

/// Location source fed through a channel, e.g. from a platform callback.
///
/// The stream can be taken once; later calls yield
/// [`LocationError::AlreadyConsumed`].
pub struct ChannelLocationSource {
    receiver: Mutex<Option<mpsc::Receiver<LocationResult>>>,
}

/// Sending half of a [`ChannelLocationSource`].
#[derive(Clone)]
pub struct LocationSender {
    sender: mpsc::Sender<LocationResult>,
}

impl LocationSender {
    /// Deliver a fix. Returns `false` when the session has gone away.
    pub async fn send(&self, fix: LocationFix) -> bool {
        self.sender.send(Ok(fix)).await.is_ok()
    }

    /// Report a source failure.
    pub async fn fail(&self, error: LocationError) -> bool {
        self.sender.send(Err(error)).await.is_ok()
    }
}

impl ChannelLocationSource {
    /// Create a source and its sender with the given buffer size.
    pub fn new(buffer: usize) -> (Self, LocationSender) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (
            Self {
                receiver: Mutex::new(Some(receiver)),
            },
            LocationSender { sender },
        )
    }
}

impl LocationSource for ChannelLocationSource {
    fn fixes(&self) -> BoxStream<'static, LocationResult> {
        match self.receiver.lock().take() {
            Some(receiver) => stream::unfold(receiver, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed(),
            None => stream::once(async { Err(LocationError::AlreadyConsumed) }).boxed(),
        }
    }
}

/// Replays a recorded list of fixes.
#[derive(Debug, Clone)]
pub struct ReplayLocationSource {
    items: Arc<Vec<LocationResult>>,
    interval: Duration,
}

impl ReplayLocationSource {
    pub fn new(fixes: Vec<LocationFix>) -> Self {
        Self::from_results(fixes.into_iter().map(Ok).collect())
    }

    /// Replay a sequence that may contain source errors.
    pub fn from_results(items: Vec<LocationResult>) -> Self {
        Self {
            items: Arc::new(items),
            interval: Duration::ZERO,
        }
    }

    /// Load a JSON array of fixes.
    pub fn from_json_file(path: &Path) -> Result<Self, LocationError> {
        let load_error = |reason: String| LocationError::Load {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let fixes: Vec<LocationFix> =
            serde_json::from_str(&text).map_err(|e| load_error(e.to_string()))?;
        Ok(Self::new(fixes))
    }

    /// Pause between fixes.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl LocationSource for ReplayLocationSource {
    fn fixes(&self) -> BoxStream<'static, LocationResult> {
        let items = Arc::clone(&self.items);
        let interval = self.interval;
        stream::iter(0..items.len())
            .then(move |i| {
                let item = items[i].clone();
                async move {
                    if !interval.is_zero() && i > 0 {
                        tokio::time::sleep(interval).await;
                    }
                    item
                }
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fix(lat: f64) -> LocationFix {
        LocationFix::at(GeoPoint::new(lat, 10.0))
    }

    #[test]
    fn test_speed_conversion() {
        let fix = fix(0.0).with_speed(10.0);
        assert!((fix.speed_kmh() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_fix_json_is_flat() {
        let json = r#"{"latitude":1.5,"longitude":2.5,"speed_mps":3.0,"timestamp_ms":42}"#;
        let fix: LocationFix = serde_json::from_str(json).unwrap();
        assert_eq!(fix.position, GeoPoint::new(1.5, 2.5));
        assert_eq!(fix.speed_mps, 3.0);
        assert_eq!(fix.accuracy_m, 0.0);
        assert_eq!(fix.timestamp_ms, 42);
    }

    #[tokio::test]
    async fn test_channel_source_delivers_in_order() {
        let (source, sender) = ChannelLocationSource::new(4);
        let mut fixes = source.fixes();

        assert!(sender.send(fix(1.0)).await);
        assert!(sender.fail(LocationError::PermissionDenied).await);
        drop(sender);

        assert_eq!(fixes.next().await, Some(Ok(fix(1.0))));
        assert_eq!(fixes.next().await, Some(Err(LocationError::PermissionDenied)));
        assert_eq!(fixes.next().await, None);
    }

    #[tokio::test]
    async fn test_channel_source_is_single_use() {
        let (source, _sender) = ChannelLocationSource::new(1);
        let _first = source.fixes();
        let mut second = source.fixes();
        assert_eq!(second.next().await, Some(Err(LocationError::AlreadyConsumed)));
    }

    #[tokio::test]
    async fn test_replay_source_is_restartable() {
        let source = ReplayLocationSource::new(vec![fix(1.0), fix(2.0)]);
        let first: Vec<_> = source.fixes().collect().await;
        let second: Vec<_> = source.fixes().collect().await;
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_replay_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"latitude":1.0,"longitude":2.0}},{{"latitude":1.1,"longitude":2.0}}]"#
        )
        .unwrap();

        let source = ReplayLocationSource::from_json_file(file.path()).unwrap();
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn test_replay_from_missing_file() {
        let err = ReplayLocationSource::from_json_file(Path::new("/nonexistent/fixes.json"))
            .unwrap_err();
        assert!(matches!(err, LocationError::Load { .. }));
    }
}
