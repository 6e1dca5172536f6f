//! OpenRouteService geocoding and directions client.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};

use super::{base_url, send_json, with_retry};
use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{Result, TrafficError};
use crate::geo::LatLng;
use crate::service::{GeocodingService, RoutingService};
use crate::wire::{DirectionsResponse, GeocodeResponse};

const GEOCODING: &str = "geocoding service";
const ROUTING: &str = "routing service";

pub struct OrsClient {
    client: Client,
    base_url: String,
    api_key: String,
    profile: String,
    retry: RetryPolicy,
}

impl OrsClient {
    pub fn new(client: Client, config: &ClientConfig) -> Self {
        OrsClient {
            client,
            base_url: base_url(&config.ors_base_url).to_string(),
            api_key: config.ors_api_key.clone(),
            profile: config.routing_profile.clone(),
            retry: config.retry,
        }
    }

    fn geocode_url(&self) -> String {
        format!("{}/geocode/search", self.base_url)
    }

    fn directions_url(&self) -> String {
        format!("{}/v2/directions/{}", self.base_url, self.profile)
    }

    async fn search_once(&self, text: &str, size: usize) -> Result<GeocodeResponse> {
        let size = size.to_string();
        let request = self.client.get(self.geocode_url()).query(&[
            ("api_key", self.api_key.as_str()),
            ("text", text),
            ("size", size.as_str()),
        ]);
        send_json(GEOCODING, request).await
    }

    async fn directions_once(&self, start: &str, end: &str) -> Result<DirectionsResponse> {
        let response = self
            .client
            .get(self.directions_url())
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("start", start),
                ("end", end),
            ])
            .send()
            .await
            .map_err(|e| TrafficError::unavailable(ROUTING, e))?;
        // ORS answers 404 when no routable path connects the two points.
        if response.status() == StatusCode::NOT_FOUND {
            info!("Routing service found no route from {} to {}", start, end);
            return Ok(DirectionsResponse::default());
        }
        if !response.status().is_success() {
            return Err(TrafficError::unavailable(
                ROUTING,
                format!("HTTP {}", response.status()),
            ));
        }
        response
            .json::<DirectionsResponse>()
            .await
            .map_err(|e| TrafficError::unavailable(ROUTING, format!("malformed payload: {}", e)))
    }
}

#[async_trait]
impl GeocodingService for OrsClient {
    async fn search(&self, text: &str, size: usize) -> Result<GeocodeResponse> {
        debug!("Geocoding {:?} (size {})", text, size);
        with_retry(&self.retry, GEOCODING, move || self.search_once(text, size)).await
    }
}

#[async_trait]
impl RoutingService for OrsClient {
    async fn directions(&self, start: LatLng, end: LatLng) -> Result<DirectionsResponse> {
        let (start, end) = (start.to_lng_lat_param(), end.to_lng_lat_param());
        debug!("Requesting directions {} -> {}", start, end);
        let (start, end) = (start.as_str(), end.as_str());
        with_retry(&self.retry, ROUTING, move || self.directions_once(start, end)).await
    }
}
