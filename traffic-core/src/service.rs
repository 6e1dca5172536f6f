//! Seams between the pipeline and the outside world.
//!
//! Service implementations are thin transports: they return the wire
//! payload untouched and leave ranking, coordinate conversion and
//! validation to the pipeline components.

use async_trait::async_trait;

use crate::error::Result;
use crate::geo::{BoundingBox, LatLng};
use crate::observation::{DateFilter, SortOrder, TrafficObservation};
use crate::wire::{DirectionsResponse, GeocodeResponse, PredictionReply, PredictionRequest};

/// Free-text place search.
#[async_trait]
pub trait GeocodingService: Send + Sync {
    async fn search(&self, text: &str, size: usize) -> Result<GeocodeResponse>;
}

/// Point-to-point driving directions.
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn directions(&self, start: LatLng, end: LatLng) -> Result<DirectionsResponse>;
}

/// Traffic volume model.
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// `Err` only for transport or payload failures; a reachable service
    /// declining the request is `Ok(PredictionReply::Rejected)`.
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionReply>;
}

/// Read-only access to stored traffic observations.
#[async_trait]
pub trait TrafficStore: Send + Sync {
    /// Number of observations matching `filter`.
    async fn count(&self, filter: &DateFilter) -> Result<u64>;

    /// Observations matching `filter`, ordered by timestamp (ties in
    /// insertion order), skipping `skip` and returning at most `limit`.
    async fn fetch(
        &self,
        filter: &DateFilter,
        order: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<TrafficObservation>>;

    /// Observations located inside `bounds` (inclusive).
    async fn within_bounds(&self, bounds: &BoundingBox) -> Result<Vec<TrafficObservation>>;
}
