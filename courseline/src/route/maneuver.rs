//! Maneuver classification.
//!
//! Providers describe maneuvers with loose keyword strings such as
//! `"turn-slight-left"` or `"roundabout-right"`. They are parsed once, when a
//! route is ingested, into closed enums so nothing downstream has to match
//! substrings again.

use serde::{Deserialize, Serialize};

use crate::geo::bearing_change;

/// Kind of maneuver at the start of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverType {
    Depart,
    Turn,
    Continue,
    Merge,
    Fork,
    Ramp,
    Roundabout,
    UTurn,
    Keep,
    Arrive,
    /// Keyword not recognised.
    Unknown,
}

impl ManeuverType {
    /// Parse a provider maneuver keyword.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.to_ascii_lowercase();
        // Order matters: "uturn-left" must not be read as a turn
        if raw.contains("uturn") || raw.contains("u-turn") {
            ManeuverType::UTurn
        } else if raw.contains("roundabout") || raw.contains("rotary") {
            ManeuverType::Roundabout
        } else if raw.contains("ramp") || raw.contains("exit") {
            ManeuverType::Ramp
        } else if raw.contains("merge") {
            ManeuverType::Merge
        } else if raw.contains("fork") {
            ManeuverType::Fork
        } else if raw.contains("keep") {
            ManeuverType::Keep
        } else if raw.contains("arriv") {
            ManeuverType::Arrive
        } else if raw.contains("depart") {
            ManeuverType::Depart
        } else if raw.contains("turn") {
            ManeuverType::Turn
        } else if raw.contains("straight") || raw.contains("continue") {
            ManeuverType::Continue
        } else {
            ManeuverType::Unknown
        }
    }
}

/// Direction qualifier for a maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverModifier {
    Left,
    Right,
    SlightLeft,
    SlightRight,
    SharpLeft,
    SharpRight,
    Straight,
    UTurn,
}

impl ManeuverModifier {
    /// Parse the direction part of a provider maneuver keyword.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.to_ascii_lowercase();
        let modifier = if raw.contains("uturn") || raw.contains("u-turn") {
            ManeuverModifier::UTurn
        } else if raw.contains("sharp-left") || raw.contains("sharp left") {
            ManeuverModifier::SharpLeft
        } else if raw.contains("sharp-right") || raw.contains("sharp right") {
            ManeuverModifier::SharpRight
        } else if raw.contains("slight-left") || raw.contains("slight left") {
            ManeuverModifier::SlightLeft
        } else if raw.contains("slight-right") || raw.contains("slight right") {
            ManeuverModifier::SlightRight
        } else if raw.contains("left") {
            ManeuverModifier::Left
        } else if raw.contains("right") {
            ManeuverModifier::Right
        } else if raw.contains("straight") {
            ManeuverModifier::Straight
        } else {
            return None;
        };
        Some(modifier)
    }

    /// Classify a signed bearing change into a direction.
    ///
    /// Changes smaller than `turn_threshold_deg` are straight; changes of at
    /// least `uturn_threshold_deg` are U-turns.
    pub fn from_bearing_change(
        change_deg: f64,
        turn_threshold_deg: f64,
        uturn_threshold_deg: f64,
    ) -> Self {
        let magnitude = change_deg.abs();
        if magnitude >= uturn_threshold_deg {
            ManeuverModifier::UTurn
        } else if magnitude < turn_threshold_deg {
            ManeuverModifier::Straight
        } else if change_deg > 0.0 {
            ManeuverModifier::Right
        } else {
            ManeuverModifier::Left
        }
    }

    /// Spoken form, e.g. "slight left".
    pub fn as_str(&self) -> &'static str {
        match self {
            ManeuverModifier::Left => "left",
            ManeuverModifier::Right => "right",
            ManeuverModifier::SlightLeft => "slight left",
            ManeuverModifier::SlightRight => "slight right",
            ManeuverModifier::SharpLeft => "sharp left",
            ManeuverModifier::SharpRight => "sharp right",
            ManeuverModifier::Straight => "straight",
            ManeuverModifier::UTurn => "u-turn",
        }
    }
}

/// A maneuver at the start of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    pub kind: ManeuverType,
    pub modifier: Option<ManeuverModifier>,
    /// Heading after the maneuver, degrees.
    pub bearing_after: Option<f64>,
    /// Roundabout exit to take, 1-based.
    pub exit_number: Option<u8>,
}

impl Maneuver {
    /// Build a maneuver from a provider keyword and the step's instruction.
    pub fn from_provider(keyword: &str, instruction: &str) -> Self {
        let kind = ManeuverType::parse(keyword);
        let exit_number = if kind == ManeuverType::Roundabout {
            exit_number_from_instruction(instruction)
        } else {
            None
        };
        Self {
            kind,
            modifier: ManeuverModifier::parse(keyword),
            bearing_after: None,
            exit_number,
        }
    }

    /// Infer a maneuver from the headings before and after a step boundary.
    pub fn infer(
        heading_before: f64,
        heading_after: f64,
        turn_threshold_deg: f64,
        uturn_threshold_deg: f64,
    ) -> Self {
        let modifier = ManeuverModifier::from_bearing_change(
            bearing_change(heading_before, heading_after),
            turn_threshold_deg,
            uturn_threshold_deg,
        );
        let kind = match modifier {
            ManeuverModifier::Straight => ManeuverType::Continue,
            ManeuverModifier::UTurn => ManeuverType::UTurn,
            _ => ManeuverType::Turn,
        };
        Self {
            kind,
            modifier: Some(modifier),
            bearing_after: Some(heading_after),
            exit_number: None,
        }
    }
}

/// Extract "take the 2nd exit" style exit numbers from instruction text.
pub fn exit_number_from_instruction(instruction: &str) -> Option<u8> {
    let lower = instruction.to_ascii_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let exit_pos = words.iter().position(|w| w.starts_with("exit"))?;
    let ordinal = words.get(exit_pos.checked_sub(1)?)?;

    let digits: String = ordinal.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        return digits.parse().ok();
    }

    const ORDINALS: [&str; 8] = [
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth",
    ];
    ORDINALS
        .iter()
        .position(|o| o == ordinal)
        .map(|i| (i + 1) as u8)
}
