//! Settings for the external service clients.

use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ORS_BASE_URL: &str = "https://api.openrouteservice.org";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_ROUTING_PROFILE: &str = "driving-car";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings shared by the HTTP clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL for geocoding and directions (OpenRouteService layout)
    pub ors_base_url: String,
    pub ors_api_key: String,
    /// Directions profile, e.g. `driving-car`
    pub routing_profile: String,
    /// Base URL of the prediction service (`{base}/predict`)
    pub prediction_base_url: String,
    /// Base URL of the traffic query endpoint (`{base}/traffic`)
    pub traffic_base_url: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            ors_base_url: DEFAULT_ORS_BASE_URL.to_string(),
            ors_api_key: String::new(),
            routing_profile: DEFAULT_ROUTING_PROFILE.to_string(),
            prediction_base_url: DEFAULT_API_BASE_URL.to_string(),
            traffic_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Retry with exponential backoff for transport failures.
///
/// The default is a single attempt: callers decide whether a failed
/// request is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 1,
            initial_backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling from the initial backoff.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_do_not_retry() {
        let config = ClientConfig::default();
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.routing_profile, "driving-car");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"ors_api_key": "k", "retry": {"max_attempts": 3}}"#).unwrap();
        assert_eq!(config.ors_api_key, "k");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 500);
        assert_eq!(config.ors_base_url, DEFAULT_ORS_BASE_URL);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy { max_attempts: 4, initial_backoff_ms: 1000 };
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff(3), Duration::from_millis(4000));
    }

    #[test]
    fn zero_timeout_is_bounded_to_one_second() {
        let config = ClientConfig { timeout_secs: 0, ..ClientConfig::default() };
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
