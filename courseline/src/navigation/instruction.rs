//! Instruction text, announcement gating and speed warnings.

use std::collections::HashSet;

use serde::Serialize;

use super::config::NavigationConfig;
use super::constants::{CONTINUE_DISTANCE_M, LOOKAHEAD_DISTANCE_M};
use crate::route::Step;

/// Instruction for the current step at `distance_m` from its maneuver.
///
/// - more than 1000m: "Continue for N kilometers"
/// - above the lead distance: "In R meters, <instruction>"
/// - above 50m: the raw step instruction
/// - otherwise: "Then <next instruction>", or nothing on the last step
pub fn instruction_text(
    distance_m: f64,
    step: &Step,
    next: Option<&Step>,
    lead_distance_m: f64,
) -> Option<String> {
    if distance_m > CONTINUE_DISTANCE_M {
        let km = (distance_m / 1000.0).round() as u64;
        Some(format!("Continue for {} kilometers", km))
    } else if distance_m > lead_distance_m {
        Some(format!(
            "In {} meters, {}",
            distance_m.round() as u64,
            step.instruction
        ))
    } else if distance_m > LOOKAHEAD_DISTANCE_M {
        Some(step.instruction.clone())
    } else {
        next.map(|n| format!("Then {}", n.instruction))
    }
}

/// Decides when a computed instruction is actually spoken.
///
/// An instruction is announced when the distance to the maneuver falls in
/// one of the bands, at most once per (step, band).
#[derive(Debug, Clone)]
pub struct AnnouncementGate {
    bands_m: Vec<f64>,
    tolerance_m: f64,
    announced: HashSet<(usize, usize)>,
}

impl AnnouncementGate {
    pub fn new(bands_m: Vec<f64>, tolerance_m: f64) -> Self {
        Self {
            bands_m,
            tolerance_m,
            announced: HashSet::new(),
        }
    }

    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(
            config.announcement_bands_m.clone(),
            config.announcement_tolerance_m,
        )
    }

    /// Band index containing `distance_m`, if any.
    pub fn band_for(&self, distance_m: f64) -> Option<usize> {
        self.bands_m
            .iter()
            .position(|band| (distance_m - band).abs() <= self.tolerance_m)
    }

    /// Whether to announce now. Marks the band as used.
    pub fn should_announce(&mut self, step_index: usize, distance_m: f64) -> bool {
        match self.band_for(distance_m) {
            Some(band) => self.announced.insert((step_index, band)),
            None => false,
        }
    }

    /// Forget past announcements; step indices restart after a reroute.
    pub fn reset(&mut self) {
        self.announced.clear();
    }
}

/// Overspeed severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedSeverity {
    Info,
    Warning,
    Critical,
}

/// Speed above the posted limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedWarning {
    pub severity: SpeedSeverity,
    pub speed_kmh: f64,
    pub limit_kmh: f64,
    pub excess_kmh: f64,
}

impl SpeedWarning {
    /// Spoken text for the warning.
    pub fn message(&self) -> String {
        let limit = self.limit_kmh.round() as u64;
        match self.severity {
            SpeedSeverity::Critical => {
                format!("Slow down. Speed limit is {} kilometers per hour", limit)
            }
            SpeedSeverity::Warning => format!("Speed limit is {} kilometers per hour", limit),
            SpeedSeverity::Info => format!("Speed limit {} kilometers per hour", limit),
        }
    }
}

/// Classify `speed_kmh` against `limit_kmh`.
///
/// With excess Δ: Δ ≤ 0 none, Δ < threshold info, Δ ≤ 2×threshold warning,
/// otherwise critical. An excess of exactly the threshold is a warning, so
/// 70 km/h in a 60 zone warns rather than informs.
pub fn classify_speed(speed_kmh: f64, limit_kmh: f64, threshold_kmh: f64) -> Option<SpeedWarning> {
    let excess_kmh = speed_kmh - limit_kmh;
    let severity = if excess_kmh <= 0.0 {
        return None;
    } else if excess_kmh < threshold_kmh {
        SpeedSeverity::Info
    } else if excess_kmh <= 2.0 * threshold_kmh {
        SpeedSeverity::Warning
    } else {
        SpeedSeverity::Critical
    };

    Some(SpeedWarning {
        severity,
        speed_kmh,
        limit_kmh,
        excess_kmh,
    })
}
