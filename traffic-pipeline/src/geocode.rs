//! Free-text place resolution.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use traffic_core::error::{Result, TrafficError};
use traffic_core::geo::LatLng;
use traffic_core::location::Location;
use traffic_core::service::GeocodingService;
use traffic_core::wire::GeocodeFeature;

use crate::bounded;
use crate::config::{DEFAULT_GEOCODE_CANDIDATES, DEFAULT_STAGE_TIMEOUT_SECS};

const GEOCODING: &str = "geocoding service";

/// Resolves free-text place queries to ranked coordinate candidates.
#[derive(Clone)]
pub struct GeocodeResolver {
    service: Arc<dyn GeocodingService>,
    timeout: Duration,
    candidates: usize,
}

impl GeocodeResolver {
    pub fn new(service: Arc<dyn GeocodingService>) -> Self {
        GeocodeResolver {
            service,
            timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            candidates: DEFAULT_GEOCODE_CANDIDATES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of candidates [`resolve_best`](Self::resolve_best) asks for.
    pub fn with_candidates(mut self, candidates: usize) -> Self {
        self.candidates = candidates.max(1);
        self
    }

    /// All candidates for `query`, best first, at most `max_results`.
    ///
    /// Ranked by descending confidence, then descending rank importance;
    /// candidates missing a score rank below those that have one. An empty
    /// result is `NotFound`, never an empty list.
    pub async fn resolve(&self, query: &str, max_results: usize) -> Result<Vec<Location>> {
        let text = query.trim();
        if text.is_empty() {
            return Err(TrafficError::InvalidInput("location query is empty".into()));
        }
        if max_results == 0 {
            return Err(TrafficError::InvalidInput(
                "max_results must be at least 1".into(),
            ));
        }

        let response = bounded(GEOCODING, self.timeout, self.service.search(text, max_results)).await?;
        let mut features = response.features;
        debug!("Geocoder returned {} candidates for {:?}", features.len(), text);
        features.sort_by(rank);

        let locations = features
            .into_iter()
            .take(max_results)
            .map(|feature| to_location(query, feature))
            .collect::<Result<Vec<_>>>()?;
        match locations.first() {
            None => Err(TrafficError::NotFound(query.to_string())),
            Some(best) => {
                info!(
                    "Resolved {:?} to {:?} ({} candidates)",
                    query,
                    best.label.as_deref().unwrap_or("unlabelled"),
                    locations.len()
                );
                Ok(locations)
            }
        }
    }

    /// The top-ranked candidate for `query`.
    pub async fn resolve_best(&self, query: &str) -> Result<Location> {
        let mut candidates = self.resolve(query, self.candidates).await?;
        // `resolve` never returns an empty list.
        Ok(candidates.swap_remove(0))
    }
}

fn score(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(f64::NEG_INFINITY)
}

/// Descending confidence, then descending rank importance.
fn rank(a: &GeocodeFeature, b: &GeocodeFeature) -> Ordering {
    let (pa, pb) = (&a.properties, &b.properties);
    score(pb.confidence)
        .total_cmp(&score(pa.confidence))
        .then_with(|| score(pb.rank_importance).total_cmp(&score(pa.rank_importance)))
}

fn to_location(query: &str, feature: GeocodeFeature) -> Result<Location> {
    let coordinates = LatLng::from_lng_lat(&feature.geometry.coordinates).ok_or_else(|| {
        TrafficError::unavailable(
            GEOCODING,
            format!(
                "malformed candidate coordinates {:?}",
                feature.geometry.coordinates
            ),
        )
    })?;
    Ok(Location {
        query: query.to_string(),
        coordinates: Some(coordinates),
        label: feature.properties.label,
        confidence: feature.properties.confidence,
    })
}
