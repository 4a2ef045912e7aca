//! Rerouting coordinator.
//!
//! Issues the replacement-route request when the session reports that a
//! reroute is due. A failure is not fatal: the session keeps its stale route
//! and asks again on the next deviation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::provider::{ProviderError, RouteRequest, RoutingProvider};
use crate::route::Route;

/// Counters for reroute activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RerouteStats {
    pub attempts: u32,
    pub successes: u32,
    pub failures: u32,
}

/// Requests new routes from the routing provider.
pub struct RerouteCoordinator {
    provider: Arc<dyn RoutingProvider>,
    stats: RerouteStats,
}

impl RerouteCoordinator {
    pub fn new(provider: Arc<dyn RoutingProvider>) -> Self {
        Self {
            provider,
            stats: RerouteStats::default(),
        }
    }

    /// Fetch a replacement route.
    pub async fn reroute(&mut self, request: &RouteRequest) -> Result<Route, ProviderError> {
        self.stats.attempts += 1;
        info!(
            provider = self.provider.name(),
            origin = %request.origin,
            destination = %request.destination,
            waypoints = request.waypoints.len(),
            attempt = self.stats.attempts,
            "Requesting new route"
        );

        match self.provider.get_route(request).await {
            Ok(route) => {
                self.stats.successes += 1;
                Ok(route)
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    "Reroute request failed"
                );
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> RerouteStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::provider::StaticRoutingProvider;
    use crate::route::Step;
    use futures::future::BoxFuture;

    struct FailingRouting;

    impl RoutingProvider for FailingRouting {
        fn get_route<'a>(
            &'a self,
            _request: &'a RouteRequest,
        ) -> BoxFuture<'a, Result<Route, ProviderError>> {
            Box::pin(async { Err(ProviderError::NoResults) })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn request() -> RouteRequest {
        RouteRequest::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.01))
    }

    #[tokio::test]
    async fn test_successful_reroute() {
        let req = request();
        let route = Route::new(vec![Step::new("Go", req.origin, req.destination)], vec![]).unwrap();
        let mut coordinator =
            RerouteCoordinator::new(Arc::new(StaticRoutingProvider::new(route.clone())));

        assert_eq!(coordinator.reroute(&req).await.unwrap(), route);
        assert_eq!(
            coordinator.stats(),
            RerouteStats {
                attempts: 1,
                successes: 1,
                failures: 0
            }
        );
    }

    #[tokio::test]
    async fn test_failed_reroute_is_counted() {
        let mut coordinator = RerouteCoordinator::new(Arc::new(FailingRouting));
        assert!(coordinator.reroute(&request()).await.is_err());
        assert!(coordinator.reroute(&request()).await.is_err());
        assert_eq!(coordinator.stats().failures, 2);
        assert_eq!(coordinator.stats().attempts, 2);
    }
}
