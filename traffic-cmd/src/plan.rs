//! Geocode, route, plan and predict commands.

use std::sync::Arc;

use log::info;
use traffic_core::prediction::RawFeatures;
use traffic_db::Database;
use traffic_pipeline::geocode::GeocodeResolver;
use traffic_pipeline::orchestrator::{Orchestrator, PlanRequest};
use traffic_pipeline::predict::PredictionRequestor;
use traffic_pipeline::route::RouteFetcher;

use crate::services::ServiceArgs;
use crate::traffic::load_store;
use crate::print_json;

pub async fn run_geocode(services: &ServiceArgs, query: &str, size: usize) -> anyhow::Result<()> {
    let clients = services.clients()?;
    let resolver = GeocodeResolver::new(clients.ors)
        .with_timeout(services.pipeline_config().stage_timeout());
    let candidates = resolver.resolve(query, size).await?;
    print_json(&candidates)
}

pub async fn run_route(services: &ServiceArgs, from: &str, to: &str) -> anyhow::Result<()> {
    let clients = services.clients()?;
    let timeout = services.pipeline_config().stage_timeout();
    let resolver = GeocodeResolver::new(clients.ors.clone()).with_timeout(timeout);
    let fetcher = RouteFetcher::new(clients.ors).with_timeout(timeout);

    let origin = resolver.resolve_best(from).await?;
    let destination = resolver.resolve_best(to).await?;
    let route = fetcher.fetch_route(&origin, &destination).await?;
    if route.is_none() {
        info!("No drivable route from {:?} to {:?}", from, to);
    }
    print_json(&route)
}

pub async fn run_plan(
    services: &ServiceArgs,
    from: &str,
    to: &str,
    departure: Option<&str>,
    records: Option<&str>,
    corridor_meters: f64,
) -> anyhow::Result<()> {
    let clients = services.clients()?;
    let store = match records {
        Some(path) => load_store(path)?,
        None => {
            info!("No traffic records given; the traffic summary will have no data");
            Database::new()?
        }
    };

    let request = plan_request(from, to, departure)?;

    let mut config = services.pipeline_config();
    config.corridor_meters = corridor_meters;
    let orchestrator = Orchestrator::from_config(
        &config,
        clients.ors.clone(),
        clients.ors,
        Arc::new(store),
        clients.prediction,
    );
    let result = orchestrator.plan(&request).await?;
    print_json(&result)
}

/// The departure keeps the hour as written; a UTC offset is not applied.
fn plan_request(from: &str, to: &str, departure: Option<&str>) -> anyhow::Result<PlanRequest> {
    let mut request = PlanRequest::new(from, to);
    if let Some(at) = departure {
        request = request.departing(traffic_utils::dates::parse_local_datetime(at)?);
    }
    Ok(request)
}

pub async fn run_predict(
    services: &ServiceArgs,
    hour: &str,
    month: &str,
    longitude: &str,
    latitude: &str,
) -> anyhow::Result<()> {
    let clients = services.clients()?;
    let requestor = PredictionRequestor::new(clients.prediction)
        .with_timeout(services.pipeline_config().stage_timeout());
    let prediction = requestor
        .request(&RawFeatures::new(hour, month, longitude, latitude))
        .await?;
    print_json(&prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn departure_offset_keeps_its_hour() {
        let request = plan_request("Paris", "Lyon", Some("2024-06-14T14:30:00+02:00")).unwrap();
        let at = request.departure.unwrap();
        assert_eq!((at.hour(), at.month()), (14, 6));
    }

    #[test]
    fn departure_is_optional_but_must_parse() {
        assert_eq!(plan_request("Paris", "Lyon", None).unwrap().departure, None);
        assert!(plan_request("Paris", "Lyon", Some("after lunch")).is_err());
    }
}
