//! Intermediate stops along a trip.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Purpose of a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    Pickup,
    Drop,
    Stop,
    Via,
    Fuel,
    Charging,
    Other,
}

impl WaypointKind {
    /// Parse a free-form kind label.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pickup" | "pick_up" | "pick-up" => WaypointKind::Pickup,
            "drop" | "dropoff" | "drop_off" | "drop-off" => WaypointKind::Drop,
            "stop" => WaypointKind::Stop,
            "via" => WaypointKind::Via,
            "fuel" | "gas" | "petrol" => WaypointKind::Fuel,
            "charging" | "charger" | "ev" => WaypointKind::Charging,
            _ => WaypointKind::Other,
        }
    }

    /// Via points are pass-through: the provider must not stop there.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, WaypointKind::Via)
    }
}

/// An ordered stop on the trip, consumed strictly in sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub location: GeoPoint,
    pub name: String,
    pub kind: WaypointKind,
    /// Expected time spent at the stop.
    #[serde(default, with = "optional_secs")]
    pub dwell: Option<Duration>,
}

impl Waypoint {
    pub fn new(location: GeoPoint, name: impl Into<String>, kind: WaypointKind) -> Self {
        Self {
            location,
            name: name.into(),
            kind,
            dwell: None,
        }
    }

    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = Some(dwell);
        self
    }
}

/// Serialize an optional duration as whole seconds.
mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!(WaypointKind::parse("Pickup"), WaypointKind::Pickup);
        assert_eq!(WaypointKind::parse("drop-off"), WaypointKind::Drop);
        assert_eq!(WaypointKind::parse(" via "), WaypointKind::Via);
        assert_eq!(WaypointKind::parse("charger"), WaypointKind::Charging);
        assert_eq!(WaypointKind::parse("picnic"), WaypointKind::Other);
    }

    #[test]
    fn test_dwell_serializes_as_seconds() {
        let wp = Waypoint::new(GeoPoint::new(1.0, 2.0), "Depot", WaypointKind::Stop)
            .with_dwell(Duration::from_secs(90));
        let json = serde_json::to_value(&wp).unwrap();
        assert_eq!(json["dwell"], 90);

        let back: Waypoint = serde_json::from_value(json).unwrap();
        assert_eq!(back.dwell, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_dwell_defaults_when_missing() {
        let json = r#"{"location":{"latitude":1.0,"longitude":2.0},"name":"A","kind":"via"}"#;
        let wp: Waypoint = serde_json::from_str(json).unwrap();
        assert_eq!(wp.dwell, None);
        assert!(wp.kind.is_pass_through());
    }
}
