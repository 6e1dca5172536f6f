//! reqwest-backed implementations of the service traits.

pub mod ors;
pub mod prediction;
pub mod traffic;

pub use ors::OrsClient;
pub use prediction::PredictionClient;
pub use traffic::TrafficApiClient;

use log::{info, warn};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::future::Future;

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{Result, TrafficError};

/// Build the shared HTTP client. Every request through it is bounded by the
/// configured timeout.
pub fn build_http_client(config: &ClientConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| TrafficError::unavailable("http client", e))
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are exhausted.
pub(crate) async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_tries = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_tries => {
                warn!("Attempt {}/{}: {} failed: {}", attempt, max_tries, what, e);
                let delay = policy.backoff(attempt);
                info!(
                    "Sleeping for {} milliseconds before retry for {}",
                    delay.as_millis(),
                    what
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    warn!("All {} attempts failed for {}", attempt, what);
                }
                return Err(e);
            }
        }
    }
}

/// Send a request and decode a successful JSON body. Transport errors, non-2xx
/// statuses and undecodable bodies all surface as `ServiceUnavailable`.
pub(crate) async fn send_json<T: DeserializeOwned>(service: &str, request: RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| TrafficError::unavailable(service, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(TrafficError::unavailable(service, format!("HTTP {}", status)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| TrafficError::unavailable(service, format!("malformed payload: {}", e)))
}

/// Strip a trailing slash so paths can be appended with `format!`.
pub(crate) fn base_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_only_retryable_errors() {
        let policy = RetryPolicy { max_attempts: 3, initial_backoff_ms: 1 };
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32> = with_retry(&policy, "test", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(TrafficError::unavailable("test", "flaky"))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);

        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32> = with_retry(&policy, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TrafficError::InvalidInput("bad".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_attempt_by_default() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = with_retry(&RetryPolicy::default(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TrafficError::unavailable("test", "down"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn base_url_trims_trailing_slash() {
        assert_eq!(base_url("http://localhost:8000/api/"), "http://localhost:8000/api");
        assert_eq!(base_url("http://localhost:8000/api"), "http://localhost:8000/api");
    }
}
