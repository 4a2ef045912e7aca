//! Courseline - turn-by-turn navigation and map-matching engine
//!
//! This library turns a planned route and a live stream of GPS fixes into
//! navigation updates: snapped positions, step progress, remaining distance
//! and time, spoken instructions, speed warnings and automatic rerouting.
//!
//! Map services are reached only through the traits in [`provider`], so the
//! engine runs equally against Google Maps Platform, recorded data or test
//! mocks.

pub mod config;
pub mod geo;
pub mod location;
pub mod matching;
pub mod navigation;
pub mod provider;
pub mod route;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
