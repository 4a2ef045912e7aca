//! Builds the configured network providers.

use std::sync::Arc;
use std::time::Duration;

use super::google::{
    GoogleDirectionsProvider, GoogleRoadsProvider, DEFAULT_DIRECTIONS_BASE_URL,
    DEFAULT_ROADS_BASE_URL,
};
use super::http::{ReqwestClient, DEFAULT_TIMEOUT_SECS};
use super::retry::{RetryPolicy, RetryingRoadsProvider, RetryingRoutingProvider};
use super::types::{ProviderError, RoadsProvider, RoutingProvider};
use crate::route::{ManeuverThresholds, VehicleMode};

/// Default number of attempts per provider call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Settings for the network providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// Maps Platform API key. Required for the Google providers.
    pub api_key: Option<String>,
    pub directions_base_url: String,
    pub roads_base_url: String,
    pub timeout_secs: u64,
    pub vehicle_mode: VehicleMode,
    /// Attempts per call including the first; 1 disables retries.
    pub max_attempts: u32,
    /// Constant delay between attempts; exponential backoff when unset.
    pub retry_delay_ms: Option<u64>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            directions_base_url: DEFAULT_DIRECTIONS_BASE_URL.to_string(),
            roads_base_url: DEFAULT_ROADS_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            vehicle_mode: VehicleMode::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: None,
        }
    }
}

impl ProviderSettings {
    /// Retry policy derived from `max_attempts` and `retry_delay_ms`.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.retry_delay_ms {
            _ if self.max_attempts <= 1 => RetryPolicy::None,
            Some(delay_ms) => {
                RetryPolicy::fixed(self.max_attempts, Duration::from_millis(delay_ms))
            }
            None => RetryPolicy::exponential(self.max_attempts),
        }
    }
}

/// Creates Google-backed providers wrapped in the configured retry policy.
pub struct ProviderFactory {
    settings: ProviderSettings,
    thresholds: ManeuverThresholds,
}

impl ProviderFactory {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            thresholds: ManeuverThresholds::default(),
        }
    }

    /// Thresholds for maneuvers inferred on planned routes.
    pub fn with_thresholds(mut self, thresholds: ManeuverThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    fn api_key(&self) -> Result<String, ProviderError> {
        match self.settings.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ProviderError::Rejected("no API key configured".to_string())),
        }
    }

    fn http_client(&self) -> Result<ReqwestClient, ProviderError> {
        ReqwestClient::with_timeout(self.settings.timeout_secs)
    }

    /// Directions provider.
    pub fn routing(&self) -> Result<Arc<dyn RoutingProvider>, ProviderError> {
        let provider = GoogleDirectionsProvider::new(self.http_client()?, self.api_key()?)
            .with_base_url(self.settings.directions_base_url.clone())
            .with_thresholds(self.thresholds);
        Ok(Arc::new(RetryingRoutingProvider::new(
            provider,
            self.settings.retry_policy(),
        )))
    }

    /// Roads provider.
    pub fn roads(&self) -> Result<Arc<dyn RoadsProvider>, ProviderError> {
        let provider = GoogleRoadsProvider::new(self.http_client()?, self.api_key()?)
            .with_base_url(self.settings.roads_base_url.clone());
        Ok(Arc::new(RetryingRoadsProvider::new(
            provider,
            self.settings.retry_policy(),
        )))
    }
}
