//! Routing and roads provider abstraction.
//!
//! The engine never talks to a map service directly. It consumes two
//! traits, [`RoutingProvider`] for planned routes and [`RoadsProvider`] for
//! snap-to-road and speed limits, so that the Google implementations, the
//! offline replay providers and test mocks are interchangeable.
//!
//! # Factory
//!
//! For building the configured providers in one place, use
//! [`ProviderFactory`]:
//!
//! ```ignore
//! use courseline::provider::{ProviderFactory, ReqwestClient};
//!
//! let factory = ProviderFactory::new(settings);
//! let routing = factory.routing()?;
//! let roads = factory.roads()?;
//! ```

mod factory;
mod google;
mod http;
mod offline;
mod retry;
mod types;

pub use factory::{ProviderFactory, ProviderSettings, DEFAULT_MAX_ATTEMPTS};
pub use google::{
    GoogleDirectionsProvider, GoogleRoadsProvider, DEFAULT_DIRECTIONS_BASE_URL,
    DEFAULT_ROADS_BASE_URL,
};
pub use http::{AsyncHttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use offline::{PassthroughRoadsProvider, StaticRoutingProvider};
pub use retry::{
    RetryPolicy, RetryingRoadsProvider, RetryingRoutingProvider, DEFAULT_BACKOFF_MULTIPLIER,
    DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_SECS,
};
pub use types::{
    PlaceSpeedLimit, ProviderError, RoadsProvider, RouteRequest, RoutingProvider, SnappedPoint,
};

#[cfg(test)]
pub use http::tests::MockHttpClient;
