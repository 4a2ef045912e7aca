//! Map matching.
//!
//! Wraps a [`RoadsProvider`](crate::provider::RoadsProvider) and turns its
//! raw snapped points into [`MatchedLocation`]s with a confidence score,
//! road classification and lane estimate, caching results by raw
//! coordinate.
//!
//! When matching fails the caller falls back to
//! [`MatchedLocation::unmatched`], which uses the raw point as-is.

mod cache;
mod client;
mod config;
mod scoring;
mod types;

pub use cache::{cache_key, CacheStats, MatchCache};
pub use client::MapMatcher;
pub use config::{
    MatchingConfig, DEFAULT_CACHE_EVICT_COUNT, DEFAULT_CACHE_MAX_ENTRIES,
    DEFAULT_LANE_ESTIMATION_RADIUS_M, DEFAULT_LANE_WIDTH_M, DEFAULT_TOTAL_LANES, MAX_LANE,
};
pub use scoring::{classify_road_type, confidence_for_distance, estimate_lane};
pub use types::{LanePosition, MatchedLocation, RoadType};

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors from the map-matching client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// No points were given.
    #[error("no points to match")]
    EmptyInput,

    /// The provider returned an empty result set.
    #[error("no road found near the given points")]
    NoResults,

    /// The roads provider failed.
    #[error("roads provider failed: {0}")]
    Provider(#[from] ProviderError),
}
