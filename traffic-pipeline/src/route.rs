//! Origin/destination to route geometry.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use traffic_core::error::{Result, TrafficError};
use traffic_core::geo::LatLng;
use traffic_core::location::Location;
use traffic_core::route::RouteGeometry;
use traffic_core::service::RoutingService;
use traffic_core::wire::DirectionsResponse;

use crate::bounded;
use crate::config::DEFAULT_STAGE_TIMEOUT_SECS;

const ROUTING: &str = "routing service";

/// Fetches the driving route between two resolved locations.
#[derive(Clone)]
pub struct RouteFetcher {
    service: Arc<dyn RoutingService>,
    timeout: Duration,
}

impl RouteFetcher {
    pub fn new(service: Arc<dyn RoutingService>) -> Self {
        RouteFetcher {
            service,
            timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Route between two resolved locations.
    ///
    /// `Ok(None)` means the routing service found no path. Both endpoints
    /// must already carry coordinates; this does not geocode.
    pub async fn fetch_route(
        &self,
        origin: &Location,
        destination: &Location,
    ) -> Result<Option<RouteGeometry>> {
        let start = endpoint(origin, "origin")?;
        let end = endpoint(destination, "destination")?;
        self.fetch_between(start, end).await
    }

    /// Route between two coordinates.
    pub async fn fetch_between(&self, start: LatLng, end: LatLng) -> Result<Option<RouteGeometry>> {
        let response = bounded(ROUTING, self.timeout, self.service.directions(start, end)).await?;
        let route = to_geometry(&response)?;
        match &route {
            Some(r) => info!(
                "Route found: {} points, {:.0} m, {:.0} s",
                r.points().len(),
                r.distance_meters,
                r.duration_seconds
            ),
            None => info!("No route between {:?} and {:?}", start, end),
        }
        Ok(route)
    }
}

fn endpoint(location: &Location, role: &str) -> Result<LatLng> {
    location.coordinates.ok_or_else(|| {
        TrafficError::InvalidEndpoints(format!(
            "{} {:?} has no coordinates",
            role, location.query
        ))
    })
}

/// Convert the provider's `[lng, lat]` polyline into a [`RouteGeometry`].
fn to_geometry(response: &DirectionsResponse) -> Result<Option<RouteGeometry>> {
    let Some((line, summary)) = response.first_route() else {
        return Ok(None);
    };
    let points = line
        .coordinates
        .iter()
        .map(|pair| {
            LatLng::from_lng_lat(pair).ok_or_else(|| {
                TrafficError::unavailable(ROUTING, format!("malformed route coordinate {:?}", pair))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    RouteGeometry::new(points, summary.distance, summary.duration)
        .map(Some)
        .map_err(|e| TrafficError::unavailable(ROUTING, format!("malformed route: {}", e)))
}
