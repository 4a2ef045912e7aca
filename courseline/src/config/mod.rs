//! Configuration file.
//!
//! Loaded from `~/.courseline/config.ini`. Every key is optional; missing
//! keys keep their defaults.
//!
//! ```ini
//! [navigation]
//! arrival_radius_m = 20
//! reroute_threshold_m = 50
//! deviation_strikes = 3
//! announcement_bands_m = 1000, 500, 200, 50
//!
//! [matching]
//! cache_max_entries = 1000
//! interpolate = true
//!
//! [provider]
//! api_key = AIza...
//! vehicle_mode = driving
//! max_attempts = 3
//! retry_delay_ms = 500
//! ```

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::matching::MatchingConfig;
use crate::navigation::NavigationConfig;
use crate::provider::ProviderSettings;
use crate::route::VehicleMode;

const NAVIGATION_SECTION: &str = "navigation";
const MATCHING_SECTION: &str = "matching";
const PROVIDER_SECTION: &str = "provider";

/// Errors reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid INI syntax: {0}")]
    Parse(String),

    #[error("invalid value for [{section}] {key}: '{value}'")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// All engine settings as stored on disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub navigation: NavigationConfig,
    pub matching: MatchingConfig,
    pub provider: ProviderSettings,
}

impl ConfigFile {
    /// `~/.courseline/config.ini`, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".courseline").join("config.ini"))
    }

    /// Load and parse `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Load `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(props) = ini.section(Some(NAVIGATION_SECTION)) {
            let nav = &mut config.navigation;
            let s = Section::new(NAVIGATION_SECTION, props);
            s.read("arrival_radius_m", &mut nav.arrival_radius_m)?;
            s.read("reroute_threshold_m", &mut nav.reroute_threshold_m)?;
            s.read("deviation_strikes", &mut nav.deviation_strikes)?;
            s.read(
                "instruction_lead_distance_m",
                &mut nav.instruction_lead_distance_m,
            )?;
            s.read("turn_angle_threshold_deg", &mut nav.turn_angle_threshold_deg)?;
            s.read("uturn_threshold_deg", &mut nav.uturn_threshold_deg)?;
            s.read(
                "speed_warning_threshold_kmh",
                &mut nav.speed_warning_threshold_kmh,
            )?;
            s.read("average_speed_mps", &mut nav.average_speed_mps)?;
            s.read("announcement_tolerance_m", &mut nav.announcement_tolerance_m)?;
            if let Some(raw) = s.get("announcement_bands_m") {
                nav.announcement_bands_m = raw
                    .split(',')
                    .map(|band| {
                        band.trim()
                            .parse::<f64>()
                            .map_err(|_| s.invalid("announcement_bands_m", raw))
                    })
                    .collect::<Result<_, _>>()?;
            }
        }

        if let Some(props) = ini.section(Some(MATCHING_SECTION)) {
            let matching = &mut config.matching;
            let s = Section::new(MATCHING_SECTION, props);
            s.read("cache_max_entries", &mut matching.cache_max_entries)?;
            s.read("cache_evict_count", &mut matching.cache_evict_count)?;
            s.read("lane_width_m", &mut matching.lane_width_m)?;
            s.read("total_lanes", &mut matching.total_lanes)?;
            s.read("lane_estimation_radius_m", &mut matching.lane_estimation_radius_m)?;
            if let Some(raw) = s.get("interpolate") {
                matching.interpolate = parse_bool(raw).ok_or_else(|| s.invalid("interpolate", raw))?;
            }
        }

        if let Some(props) = ini.section(Some(PROVIDER_SECTION)) {
            let provider = &mut config.provider;
            let s = Section::new(PROVIDER_SECTION, props);
            if let Some(key) = s.get("api_key") {
                provider.api_key = (!key.is_empty()).then(|| key.to_string());
            }
            if let Some(url) = s.get("directions_base_url") {
                provider.directions_base_url = url.trim_end_matches('/').to_string();
            }
            if let Some(url) = s.get("roads_base_url") {
                provider.roads_base_url = url.trim_end_matches('/').to_string();
            }
            s.read("timeout_secs", &mut provider.timeout_secs)?;
            s.read("max_attempts", &mut provider.max_attempts)?;
            if let Some(raw) = s.get("retry_delay_ms") {
                provider.retry_delay_ms = match raw {
                    "" => None,
                    raw => Some(raw.parse().map_err(|_| s.invalid("retry_delay_ms", raw))?),
                };
            }
            if let Some(raw) = s.get("vehicle_mode") {
                provider.vehicle_mode =
                    parse_vehicle_mode(raw).ok_or_else(|| s.invalid("vehicle_mode", raw))?;
            }
        }

        Ok(config)
    }

    /// Render as INI text. The API key is masked when `redact` is set.
    pub fn to_ini_string(&self, redact: bool) -> String {
        let nav = &self.navigation;
        let matching = &self.matching;
        let provider = &self.provider;

        let bands = nav
            .announcement_bands_m
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let api_key = match &provider.api_key {
            Some(_) if redact => "********".to_string(),
            Some(key) => key.clone(),
            None => String::new(),
        };

        let mut ini = Ini::new();
        ini.with_section(Some(NAVIGATION_SECTION))
            .set("arrival_radius_m", nav.arrival_radius_m.to_string())
            .set("reroute_threshold_m", nav.reroute_threshold_m.to_string())
            .set("deviation_strikes", nav.deviation_strikes.to_string())
            .set(
                "instruction_lead_distance_m",
                nav.instruction_lead_distance_m.to_string(),
            )
            .set(
                "turn_angle_threshold_deg",
                nav.turn_angle_threshold_deg.to_string(),
            )
            .set("uturn_threshold_deg", nav.uturn_threshold_deg.to_string())
            .set(
                "speed_warning_threshold_kmh",
                nav.speed_warning_threshold_kmh.to_string(),
            )
            .set("average_speed_mps", nav.average_speed_mps.to_string())
            .set("announcement_bands_m", bands)
            .set(
                "announcement_tolerance_m",
                nav.announcement_tolerance_m.to_string(),
            );
        ini.with_section(Some(MATCHING_SECTION))
            .set("cache_max_entries", matching.cache_max_entries.to_string())
            .set("cache_evict_count", matching.cache_evict_count.to_string())
            .set("lane_width_m", matching.lane_width_m.to_string())
            .set("total_lanes", matching.total_lanes.to_string())
            .set(
                "lane_estimation_radius_m",
                matching.lane_estimation_radius_m.to_string(),
            )
            .set("interpolate", matching.interpolate.to_string());
        ini.with_section(Some(PROVIDER_SECTION))
            .set("api_key", api_key)
            .set("directions_base_url", provider.directions_base_url.clone())
            .set("roads_base_url", provider.roads_base_url.clone())
            .set("timeout_secs", provider.timeout_secs.to_string())
            .set("vehicle_mode", provider.vehicle_mode.as_str())
            .set("max_attempts", provider.max_attempts.to_string())
            .set(
                "retry_delay_ms",
                provider
                    .retry_delay_ms
                    .map(|ms| ms.to_string())
                    .unwrap_or_default(),
            );

        let mut out = Vec::new();
        if ini.write_to(&mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// One INI section with error context.
struct Section<'a> {
    name: &'a str,
    props: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'a str, props: &'a Properties) -> Self {
        Self { name, props }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.props.get(key).map(str::trim)
    }

    /// Overwrite `target` when `key` is present.
    fn read<T>(&self, key: &str, target: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        if let Some(raw) = self.get(key) {
            *target = raw.parse().map_err(|_| self.invalid(key, raw))?;
        }
        Ok(())
    }

    fn invalid(&self, key: &str, value: &str) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_vehicle_mode(raw: &str) -> Option<VehicleMode> {
    [
        VehicleMode::Driving,
        VehicleMode::Walking,
        VehicleMode::Bicycling,
        VehicleMode::TwoWheeler,
    ]
    .into_iter()
    .find(|mode| mode.as_str().eq_ignore_ascii_case(raw))
}
