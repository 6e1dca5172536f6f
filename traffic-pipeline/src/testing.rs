//! In-process service fakes that record their calls.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use traffic_core::error::{Result, TrafficError};
use traffic_core::geo::{BoundingBox, LatLng};
use traffic_core::observation::{DateFilter, SortOrder, TrafficObservation};
use traffic_core::service::{GeocodingService, PredictionService, RoutingService, TrafficStore};
use traffic_core::wire::{
    DirectionsResponse, DirectionsRoute, GeocodeFeature, GeocodeProperties, GeocodeResponse,
    LineGeometry, PointGeometry, PredictionReply, PredictionRequest, RouteSummary,
};

use crate::sequence::RequestSequencer;

pub fn feature(
    label: &str,
    lat: f64,
    lng: f64,
    confidence: Option<f64>,
    rank_importance: Option<f64>,
) -> GeocodeFeature {
    GeocodeFeature {
        geometry: PointGeometry::point(lng, lat),
        properties: GeocodeProperties {
            label: Some(label.to_string()),
            confidence,
            rank_importance,
        },
    }
}

/// A directions payload for `points` given latitude first; the payload
/// itself carries `[lng, lat]` like a real provider.
pub fn directions(points: &[(f64, f64)], distance: f64, duration: f64) -> DirectionsResponse {
    DirectionsResponse {
        routes: vec![DirectionsRoute {
            geometry: LineGeometry {
                coordinates: points.iter().map(|(lat, lng)| vec![*lng, *lat]).collect(),
            },
            summary: RouteSummary { distance, duration },
        }],
        features: vec![],
    }
}

#[derive(Default)]
pub struct FakeGeocoder {
    responses: HashMap<String, GeocodeResponse>,
    delay: Option<Duration>,
    interrupt: Option<(String, RequestSequencer)>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, response: GeocodeResponse) -> Self {
        self.responses.insert(query.to_string(), response);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Issue a newer request on `sequencer` while `query` is being resolved.
    pub fn interrupt_on(mut self, query: &str, sequencer: RequestSequencer) -> Self {
        self.interrupt = Some((query.to_string(), sequencer));
        self
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeocodingService for FakeGeocoder {
    async fn search(&self, text: &str, size: usize) -> Result<GeocodeResponse> {
        self.calls.lock().unwrap().push((text.to_string(), size));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((query, sequencer)) = &self.interrupt {
            if query == text {
                sequencer.next();
            }
        }
        self.responses
            .get(text)
            .cloned()
            .ok_or_else(|| TrafficError::unavailable("geocoding service", "connection refused"))
    }
}

pub struct FakeRouter {
    response: Result<DirectionsResponse>,
    calls: Mutex<Vec<(LatLng, LatLng)>>,
}

impl FakeRouter {
    pub fn returning(response: Result<DirectionsResponse>) -> Self {
        FakeRouter {
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(LatLng, LatLng)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoutingService for FakeRouter {
    async fn directions(&self, start: LatLng, end: LatLng) -> Result<DirectionsResponse> {
        self.calls.lock().unwrap().push((start, end));
        self.response.clone()
    }
}

pub struct FakePredictor {
    reply: Result<PredictionReply>,
    calls: Mutex<Vec<PredictionRequest>>,
}

impl FakePredictor {
    pub fn returning(reply: Result<PredictionReply>) -> Self {
        FakePredictor {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn predicting(prediction: f64) -> Self {
        Self::returning(Ok(PredictionReply::Predicted { prediction }))
    }

    pub fn calls(&self) -> Vec<PredictionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PredictionService for FakePredictor {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionReply> {
        self.calls.lock().unwrap().push(*request);
        self.reply.clone()
    }
}

/// A traffic store whose backend is gone.
pub struct FailingStore;

#[async_trait]
impl TrafficStore for FailingStore {
    async fn count(&self, _filter: &DateFilter) -> Result<u64> {
        Err(TrafficError::Store("database is locked".into()))
    }

    async fn fetch(
        &self,
        _filter: &DateFilter,
        _order: SortOrder,
        _skip: u64,
        _limit: u64,
    ) -> Result<Vec<TrafficObservation>> {
        Err(TrafficError::Store("database is locked".into()))
    }

    async fn within_bounds(&self, _bounds: &BoundingBox) -> Result<Vec<TrafficObservation>> {
        Err(TrafficError::Store("database is locked".into()))
    }
}
