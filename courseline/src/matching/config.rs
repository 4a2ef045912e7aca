//! Map-matching configuration.

// ==================== Cache Defaults ====================

/// Default maximum number of cached matches before eviction.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

/// Default number of oldest entries dropped when the cache overflows.
///
/// Eviction is plain truncation of the oldest insertions, not strict LRU.
pub const DEFAULT_CACHE_EVICT_COUNT: usize = 500;

// ==================== Lane Defaults ====================

/// Default lane width in metres.
pub const DEFAULT_LANE_WIDTH_M: f64 = 3.5;

/// Lane count reported when the provider has no lane data.
pub const DEFAULT_TOTAL_LANES: u8 = 3;

/// Lanes are only estimated for snaps at most this far from the raw point.
pub const DEFAULT_LANE_ESTIMATION_RADIUS_M: f64 = 20.0;

/// Lane numbers are clamped to `1..=MAX_LANE`.
pub const MAX_LANE: u8 = 4;

/// Configuration for the map-matching client.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Maximum cached matches. Default: 1000.
    pub cache_max_entries: usize,

    /// Oldest entries evicted on overflow. Default: 500.
    pub cache_evict_count: usize,

    /// Lane width in metres. Default: 3.5.
    pub lane_width_m: f64,

    /// Reported lane count. Default: 3.
    pub total_lanes: u8,

    /// Maximum snap distance for lane estimation. Default: 20m.
    pub lane_estimation_radius_m: f64,

    /// Ask the provider to interpolate points along the road. Default: false.
    pub interpolate: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cache_evict_count: DEFAULT_CACHE_EVICT_COUNT,
            lane_width_m: DEFAULT_LANE_WIDTH_M,
            total_lanes: DEFAULT_TOTAL_LANES,
            lane_estimation_radius_m: DEFAULT_LANE_ESTIMATION_RADIUS_M,
            interpolate: false,
        }
    }
}
