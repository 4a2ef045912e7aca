//! Providers that work without network access.
//!
//! Used by trip replay and by tests: a routing provider that always serves
//! the same route, and a roads provider that treats every raw point as
//! already on the road.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;

use super::types::{
    PlaceSpeedLimit, ProviderError, RoadsProvider, RouteRequest, RoutingProvider, SnappedPoint,
};
use crate::geo::GeoPoint;
use crate::route::Route;

/// Place id reported by [`PassthroughRoadsProvider`] when a speed limit is set.
const PASSTHROUGH_PLACE_ID: &str = "passthrough";

/// Serves a fixed route for every request.
pub struct StaticRoutingProvider {
    route: Route,
    requests: AtomicUsize,
}

impl StaticRoutingProvider {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of routes served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

impl RoutingProvider for StaticRoutingProvider {
    fn get_route<'a>(
        &'a self,
        _request: &'a RouteRequest,
    ) -> BoxFuture<'a, Result<Route, ProviderError>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let route = self.route.clone();
        Box::pin(async move { Ok(route) })
    }

    fn name(&self) -> &str {
        "Static"
    }
}

/// Returns each input point as its own snapped position.
///
/// With [`with_speed_limit`](Self::with_speed_limit) every point is tagged
/// with a single road segment carrying that limit.
#[derive(Debug, Default)]
pub struct PassthroughRoadsProvider {
    speed_limit_kmh: Option<f64>,
}

impl PassthroughRoadsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_speed_limit(mut self, limit_kmh: f64) -> Self {
        self.speed_limit_kmh = Some(limit_kmh);
        self
    }
}

impl RoadsProvider for PassthroughRoadsProvider {
    fn snap_to_road<'a>(
        &'a self,
        points: &'a [GeoPoint],
        _interpolate: bool,
    ) -> BoxFuture<'a, Result<Vec<SnappedPoint>, ProviderError>> {
        let place_id = self
            .speed_limit_kmh
            .map(|_| PASSTHROUGH_PLACE_ID.to_string());
        let snapped = points
            .iter()
            .enumerate()
            .map(|(i, p)| SnappedPoint {
                location: *p,
                original_index: Some(i),
                place_id: place_id.clone(),
            })
            .collect();
        Box::pin(async move { Ok(snapped) })
    }

    fn speed_limits<'a>(
        &'a self,
        place_ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<PlaceSpeedLimit>, ProviderError>> {
        let limits = match self.speed_limit_kmh {
            Some(limit_kmh) => place_ids
                .iter()
                .filter(|id| id.as_str() == PASSTHROUGH_PLACE_ID)
                .map(|id| PlaceSpeedLimit {
                    place_id: id.clone(),
                    limit_kmh,
                })
                .collect(),
            None => Vec::new(),
        };
        Box::pin(async move { Ok(limits) })
    }

    fn name(&self) -> &str {
        "Passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Step;

    #[tokio::test]
    async fn test_static_provider_counts_requests() {
        let a = GeoPoint::new(1.0, 1.0);
        let b = GeoPoint::new(1.0, 1.001);
        let route = Route::new(vec![Step::new("Go east", a, b)], vec![]).unwrap();
        let provider = StaticRoutingProvider::new(route.clone());
        let request = RouteRequest::new(a, b);

        assert_eq!(provider.get_route(&request).await.unwrap(), route);
        assert_eq!(provider.get_route(&request).await.unwrap(), route);
        assert_eq!(provider.request_count(), 2);
    }

    #[tokio::test]
    async fn test_passthrough_keeps_points() {
        let provider = PassthroughRoadsProvider::new();
        let points = [GeoPoint::new(1.0, 2.0), GeoPoint::new(3.0, 4.0)];

        let snapped = provider.snap_to_road(&points, true).await.unwrap();
        assert_eq!(snapped.len(), 2);
        assert_eq!(snapped[1].location, points[1]);
        assert_eq!(snapped[1].original_index, Some(1));
        assert!(snapped[0].place_id.is_none());
        assert!(provider.speed_limits(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_passthrough_with_speed_limit() {
        let provider = PassthroughRoadsProvider::new().with_speed_limit(50.0);
        let snapped = provider
            .snap_to_road(&[GeoPoint::new(1.0, 2.0)], false)
            .await
            .unwrap();
        let id = snapped[0].place_id.clone().unwrap();

        let limits = provider.speed_limits(&[id]).await.unwrap();
        assert_eq!(limits.len(), 1);
        assert_eq!(limits[0].limit_kmh, 50.0);
    }
}
