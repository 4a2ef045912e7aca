//! Map-matching client.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use super::cache::{CacheStats, MatchCache};
use super::config::MatchingConfig;
use super::scoring::{classify_road_type, confidence_for_distance, estimate_lane};
use super::types::MatchedLocation;
use super::MatchError;
use crate::geo::{distance, GeoPoint};
use crate::location::LocationFix;
use crate::provider::{RoadsProvider, SnappedPoint};

/// Snaps raw fixes to the road network through a [`RoadsProvider`].
///
/// Results are cached by raw coordinate. The cache can be shared by several
/// matchers (and so by several sessions) through [`with_cache`](Self::with_cache).
pub struct MapMatcher {
    provider: Arc<dyn RoadsProvider>,
    cache: Arc<MatchCache>,
    config: MatchingConfig,
}

impl MapMatcher {
    pub fn new(provider: Arc<dyn RoadsProvider>, config: MatchingConfig) -> Self {
        let cache = Arc::new(MatchCache::new(
            config.cache_max_entries,
            config.cache_evict_count,
        ));
        Self::with_cache(provider, cache, config)
    }

    pub fn with_cache(
        provider: Arc<dyn RoadsProvider>,
        cache: Arc<MatchCache>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<MatchCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Snap a batch of fixes. The result has one entry per input, in order.
    pub async fn snap(&self, fixes: &[LocationFix]) -> Result<Vec<MatchedLocation>, MatchError> {
        if fixes.is_empty() {
            return Err(MatchError::EmptyInput);
        }

        let mut results: Vec<Option<MatchedLocation>> = fixes
            .iter()
            .map(|fix| self.cache.get(fix.position).map(|m| m.for_fix(*fix)))
            .collect();

        let pending: Vec<usize> = (0..fixes.len()).filter(|&i| results[i].is_none()).collect();
        if pending.is_empty() {
            return Ok(results.into_iter().flatten().collect());
        }

        let points: Vec<GeoPoint> = pending.iter().map(|&i| fixes[i].position).collect();
        let snapped = self
            .provider
            .snap_to_road(&points, self.config.interpolate)
            .await?;
        if snapped.is_empty() {
            return Err(MatchError::NoResults);
        }

        let limits = self.lookup_speed_limits(&snapped).await;

        for (request_index, &fix_index) in pending.iter().enumerate() {
            let fix = fixes[fix_index];
            let Some(point) = correlate(&snapped, request_index, fix.position) else {
                continue;
            };
            let matched = self.score(fix, point, &limits);
            self.cache.insert(fix.position, matched.clone());
            results[fix_index] = Some(matched);
        }

        debug!(
            requested = points.len(),
            returned = snapped.len(),
            cached = fixes.len() - pending.len(),
            "Snapped fixes"
        );

        Ok(results
            .into_iter()
            .zip(fixes)
            .map(|(matched, fix)| matched.unwrap_or_else(|| MatchedLocation::unmatched(*fix)))
            .collect())
    }

    /// Snap a single fix.
    pub async fn snap_one(&self, fix: LocationFix) -> Result<MatchedLocation, MatchError> {
        self.snap(&[fix])
            .await?
            .into_iter()
            .next()
            .ok_or(MatchError::NoResults)
    }

    /// Speed limits for every distinct place id; failures are logged and
    /// treated as "no limit known".
    async fn lookup_speed_limits(&self, snapped: &[SnappedPoint]) -> HashMap<String, f64> {
        let mut seen = HashSet::new();
        let place_ids: Vec<String> = snapped
            .iter()
            .filter_map(|p| p.place_id.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if place_ids.is_empty() {
            return HashMap::new();
        }

        match self.provider.speed_limits(&place_ids).await {
            Ok(limits) => limits
                .into_iter()
                .map(|l| (l.place_id, l.limit_kmh))
                .collect(),
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    place_ids = place_ids.len(),
                    error = %e,
                    "Speed limit lookup failed"
                );
                HashMap::new()
            }
        }
    }

    fn score(
        &self,
        fix: LocationFix,
        point: &SnappedPoint,
        limits: &HashMap<String, f64>,
    ) -> MatchedLocation {
        let snap_distance_m = distance(fix.position, point.location);
        let speed_limit_kmh = point
            .place_id
            .as_ref()
            .and_then(|id| limits.get(id))
            .copied();

        MatchedLocation {
            original: fix,
            snapped: point.location,
            road_id: point.place_id.clone(),
            snap_distance_m,
            confidence: confidence_for_distance(snap_distance_m),
            bearing: fix.bearing,
            speed_limit_kmh,
            road_type: classify_road_type(speed_limit_kmh, point.place_id.as_deref()),
            lane: estimate_lane(snap_distance_m, &self.config),
        }
    }
}

/// Find the snapped point for request index `index`.
///
/// Prefers the provider's original-index correlation; otherwise takes the
/// nearest returned point.
fn correlate(snapped: &[SnappedPoint], index: usize, raw: GeoPoint) -> Option<&SnappedPoint> {
    snapped
        .iter()
        .find(|p| p.original_index == Some(index))
        .or_else(|| {
            snapped
                .iter()
                .min_by(|a, b| distance(raw, a.location).total_cmp(&distance(raw, b.location)))
        })
}
