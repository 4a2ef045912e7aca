//! Retry with backoff at the provider boundary.
//!
//! Retries live here, wrapped around a provider, and never inside the
//! navigation session. Only errors classified by
//! [`ProviderError::is_retryable`] are retried; a rejected request or an
//! invalid route fails on the first attempt.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use super::types::{
    PlaceSpeedLimit, ProviderError, RoadsProvider, RouteRequest, RoutingProvider, SnappedPoint,
};
use crate::geo::GeoPoint;
use crate::route::Route;

/// Default initial delay for exponential backoff (100ms).
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;

/// Default maximum delay for exponential backoff (30 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// How a provider call handles transient failures.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum RetryPolicy {
    /// No retries - fail immediately on error.
    #[default]
    None,

    /// Fixed number of attempts with constant delay between them.
    Fixed {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Delay between attempts.
        delay: Duration,
    },

    /// Exponential backoff.
    ///
    /// The delay is multiplied after each failed attempt, up to a maximum.
    ExponentialBackoff {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Delay after the first failure.
        initial_delay: Duration,
        /// Delay cap.
        max_delay: Duration,
        /// Multiplier applied after each failure (typically 2.0).
        multiplier: f64,
    },
}

impl RetryPolicy {
    /// Exponential backoff with the default delays.
    pub fn exponential(max_attempts: u32) -> Self {
        Self::ExponentialBackoff {
            max_attempts,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::Fixed {
            max_attempts,
            delay,
        }
    }

    /// Delay before retry number `attempt` (1-based), or `None` when the
    /// attempts are exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed {
                max_attempts,
                delay,
            } => (attempt < *max_attempts).then_some(*delay),
            Self::ExponentialBackoff {
                max_attempts,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                let delay_ms = initial_delay.as_millis() as f64 * factor;
                let capped = delay_ms.min(max_delay.as_millis() as f64) as u64;
                Some(Duration::from_millis(capped))
            }
        }
    }

    /// Maximum number of attempts for this policy.
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Fixed { max_attempts, .. } => *max_attempts,
            Self::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }
}

/// Run `call` until it succeeds, fails permanently, or the policy gives up.
async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    provider: &str,
    operation: &'static str,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                attempt += 1;
                let Some(delay) = policy.delay_for_attempt(attempt) else {
                    return Err(e);
                };
                warn!(
                    provider = provider,
                    operation = operation,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Provider call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Routing provider wrapper that retries transient failures.
pub struct RetryingRoutingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: RoutingProvider> RetryingRoutingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<P: RoutingProvider> RoutingProvider for RetryingRoutingProvider<P> {
    fn get_route<'a>(
        &'a self,
        request: &'a RouteRequest,
    ) -> BoxFuture<'a, Result<Route, ProviderError>> {
        Box::pin(with_retry(&self.policy, self.inner.name(), "get_route", move || {
            self.inner.get_route(request)
        }))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Roads provider wrapper that retries transient failures.
pub struct RetryingRoadsProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: RoadsProvider> RetryingRoadsProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<P: RoadsProvider> RoadsProvider for RetryingRoadsProvider<P> {
    fn snap_to_road<'a>(
        &'a self,
        points: &'a [GeoPoint],
        interpolate: bool,
    ) -> BoxFuture<'a, Result<Vec<SnappedPoint>, ProviderError>> {
        Box::pin(with_retry(&self.policy, self.inner.name(), "snap_to_road", move || {
            self.inner.snap_to_road(points, interpolate)
        }))
    }

    fn speed_limits<'a>(
        &'a self,
        place_ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<PlaceSpeedLimit>, ProviderError>> {
        Box::pin(with_retry(&self.policy, self.inner.name(), "speed_limits", move || {
            self.inner.speed_limits(place_ids)
        }))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Step;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the queued errors, then succeeds.
    struct FlakyRouting {
        failures: Mutex<Vec<ProviderError>>,
        calls: AtomicU32,
    }

    impl FlakyRouting {
        fn new(failures: Vec<ProviderError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl RoutingProvider for FlakyRouting {
        fn get_route<'a>(
            &'a self,
            request: &'a RouteRequest,
        ) -> BoxFuture<'a, Result<Route, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut failures = self.failures.lock();
                if failures.is_empty() {
                    None
                } else {
                    Some(failures.remove(0))
                }
            };
            Box::pin(async move {
                match next {
                    Some(err) => Err(err),
                    None => Ok(Route::new(
                        vec![Step::new("Go", request.origin, request.destination)],
                        vec![],
                    )?),
                }
            })
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn request() -> RouteRequest {
        RouteRequest::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.01))
    }

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::exponential(4);
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for_attempt(4), None);
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy::ExponentialBackoff {
            max_attempts: 20,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        };
        assert_eq!(policy.delay_for_attempt(10), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_none_and_fixed() {
        assert_eq!(RetryPolicy::None.delay_for_attempt(1), None);
        assert_eq!(RetryPolicy::None.max_attempts(), 1);

        let fixed = RetryPolicy::fixed(2, Duration::from_millis(50));
        assert_eq!(fixed.delay_for_attempt(1), Some(Duration::from_millis(50)));
        assert_eq!(fixed.delay_for_attempt(2), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let provider = RetryingRoutingProvider::new(
            FlakyRouting::new(vec![ProviderError::Timeout, ProviderError::Timeout]),
            RetryPolicy::exponential(3),
        );

        assert!(provider.get_route(&request()).await.is_ok());
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let provider = RetryingRoutingProvider::new(
            FlakyRouting::new(vec![ProviderError::Timeout; 5]),
            RetryPolicy::exponential(3),
        );

        assert_eq!(
            provider.get_route(&request()).await.unwrap_err(),
            ProviderError::Timeout
        );
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let provider = RetryingRoutingProvider::new(
            FlakyRouting::new(vec![ProviderError::Rejected("bad key".into())]),
            RetryPolicy::exponential(3),
        );

        assert!(provider.get_route(&request()).await.is_err());
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1);
    }
}
