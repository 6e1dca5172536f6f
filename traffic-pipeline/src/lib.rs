//! Route-and-prediction pipeline.
//!
//! Turns two free-text place queries into a route, traffic conditions along
//! it and a traffic volume prediction, and serves paged traffic queries for
//! the analytics view.
//!
//! Leaf components, each usable on its own:
//! - [`geocode::GeocodeResolver`] - text to ranked coordinates
//! - [`route::RouteFetcher`] - coordinate pair to route geometry
//! - [`aggregate::TrafficAggregator`] - paged queries and region summaries
//! - [`predict::PredictionRequestor`] - feature validation and model calls
//!
//! [`orchestrator::Orchestrator`] composes them. [`sequence`] guards against
//! stale results when requests overlap.

pub mod aggregate;
pub mod config;
pub mod geocode;
pub mod orchestrator;
pub mod predict;
pub mod route;
pub mod sequence;

#[cfg(test)]
mod testing;

use std::future::Future;
use std::time::Duration;

use traffic_core::error::{Result, TrafficError};

/// Await `call`, failing with `ServiceUnavailable` if it takes longer than
/// `limit`.
pub(crate) async fn bounded<T>(
    service: &str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("{} timed out after {:?}", service, limit);
            Err(TrafficError::unavailable(
                service,
                format!("no response within {:?}", limit),
            ))
        }
    }
}
