//! Plan a route with traffic conditions and a volume prediction.
//!
//! Stages run in order:
//!
//! `Idle -> ResolvingOrigin -> ResolvingDestination -> FetchingRoute ->
//! AggregatingTraffic -> RequestingPrediction -> Complete`
//!
//! Endpoints and the route are hard dependencies: if one fails, the plan
//! stops and the partial result names the failed stage. The traffic summary
//! is advisory: if it fails, it becomes `Unknown` and the prediction still
//! runs. A failed prediction is recorded in the `prediction` field.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use log::{debug, info, warn};
use serde::Serialize;
use traffic_core::error::{Result, TrafficError};
use traffic_core::geo::LatLng;
use traffic_core::location::Location;
use traffic_core::observation::{RegionMetrics, RegionSummary};
use traffic_core::prediction::{Failure, PredictionFeatures, PredictionResult};
use traffic_core::route::RouteGeometry;
use traffic_core::service::{GeocodingService, PredictionService, RoutingService, TrafficStore};

use crate::aggregate::{Region, TrafficAggregator};
use crate::config::PipelineConfig;
use crate::geocode::GeocodeResolver;
use crate::predict::PredictionRequestor;
use crate::route::RouteFetcher;
use crate::sequence::{RequestSequencer, RequestTicket, ResultSlot, Superseded};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRequest {
    pub origin: String,
    pub destination: String,
    /// Hour and month for the prediction; defaults to the current local time
    pub departure: Option<NaiveDateTime>,
    /// Where to predict; defaults to the destination
    pub prediction_coordinates: Option<LatLng>,
}

impl PlanRequest {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        PlanRequest {
            origin: origin.into(),
            destination: destination.into(),
            departure: None,
            prediction_coordinates: None,
        }
    }

    pub fn departing(mut self, at: NaiveDateTime) -> Self {
        self.departure = Some(at);
        self
    }

    pub fn predicting_at(mut self, coordinates: LatLng) -> Self {
        self.prediction_coordinates = Some(coordinates);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    ResolvingOrigin,
    ResolvingDestination,
    FetchingRoute,
    AggregatingTraffic,
    RequestingPrediction,
    Complete,
}

/// The stage that stopped a plan and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub failure: Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Complete,
    /// Both endpoints resolved but the routing service found no path.
    NoRoute,
    Aborted(StageFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrafficConditions {
    Measured(RegionMetrics),
    NoData,
    /// The summary could not be computed.
    Unknown { reason: Failure },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub conditions: TrafficConditions,
}

impl TrafficSummary {
    fn new(route: &RouteGeometry, conditions: TrafficConditions) -> Self {
        TrafficSummary {
            distance_meters: route.distance_meters,
            duration_seconds: route.duration_seconds,
            conditions,
        }
    }

    pub fn congestion_level(&self) -> Option<f64> {
        match &self.conditions {
            TrafficConditions::Measured(m) => Some(m.mean_congestion),
            _ => None,
        }
    }

    pub fn volume(&self) -> Option<f64> {
        match &self.conditions {
            TrafficConditions::Measured(m) => Some(m.mean_volume),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteAndPredictionResult {
    pub origin: Location,
    pub destination: Location,
    pub route: Option<RouteGeometry>,
    pub traffic_summary: Option<TrafficSummary>,
    pub prediction: Option<PredictionResult>,
    pub status: PlanStatus,
}

impl RouteAndPredictionResult {
    fn aborted(origin: Location, destination: Location, stage: Stage, err: TrafficError) -> Self {
        warn!("Plan aborted while {:?}: {}", stage, err);
        RouteAndPredictionResult {
            origin,
            destination,
            route: None,
            traffic_summary: None,
            prediction: None,
            status: PlanStatus::Aborted(StageFailure {
                stage,
                failure: Failure::from(err),
            }),
        }
    }

    /// The hard-dependency failure that stopped the plan, if any.
    pub fn failure(&self) -> Option<&StageFailure> {
        match &self.status {
            PlanStatus::Aborted(f) => Some(f),
            _ => None,
        }
    }
}

/// Runs geocoding, routing, traffic summary and prediction for one plan request.
#[derive(Clone)]
pub struct Orchestrator {
    geocoder: GeocodeResolver,
    router: RouteFetcher,
    aggregator: TrafficAggregator,
    predictor: PredictionRequestor,
    sequencer: RequestSequencer,
}

impl Orchestrator {
    pub fn new(
        geocoder: GeocodeResolver,
        router: RouteFetcher,
        aggregator: TrafficAggregator,
        predictor: PredictionRequestor,
    ) -> Self {
        Orchestrator {
            geocoder,
            router,
            aggregator,
            predictor,
            sequencer: RequestSequencer::new(),
        }
    }

    pub fn from_config(
        config: &PipelineConfig,
        geocoding: Arc<dyn GeocodingService>,
        routing: Arc<dyn RoutingService>,
        store: Arc<dyn TrafficStore>,
        prediction: Arc<dyn PredictionService>,
    ) -> Self {
        let timeout = config.stage_timeout();
        Orchestrator::new(
            GeocodeResolver::new(geocoding)
                .with_timeout(timeout)
                .with_candidates(config.geocode_candidates),
            RouteFetcher::new(routing).with_timeout(timeout),
            TrafficAggregator::new(store)
                .with_timeout(timeout)
                .with_corridor(config.corridor_meters),
            PredictionRequestor::new(prediction).with_timeout(timeout),
        )
    }

    /// Share request numbering with other orchestrators or result slots.
    pub fn with_sequencer(mut self, sequencer: RequestSequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    pub fn sequencer(&self) -> &RequestSequencer {
        &self.sequencer
    }

    /// Start a new plan, superseding any plan still running.
    pub async fn plan(
        &self,
        request: &PlanRequest,
    ) -> std::result::Result<RouteAndPredictionResult, Superseded> {
        let ticket = self.sequencer.next();
        self.plan_with_ticket(ticket, request).await
    }

    /// Plan and publish into `slot` unless a newer plan has overtaken this
    /// one. Returns whether the result was published.
    pub async fn plan_into(
        &self,
        slot: &ResultSlot<RouteAndPredictionResult>,
        request: &PlanRequest,
    ) -> bool {
        let ticket = self.sequencer.next();
        match self.plan_with_ticket(ticket, request).await {
            Ok(result) => slot.publish(ticket, result),
            Err(superseded) => {
                debug!("{}", superseded);
                false
            }
        }
    }

    /// Run a plan under an existing ticket. No stage starts once the ticket
    /// is stale, and a result finished under a stale ticket is discarded.
    pub async fn plan_with_ticket(
        &self,
        ticket: RequestTicket,
        request: &PlanRequest,
    ) -> std::result::Result<RouteAndPredictionResult, Superseded> {
        let result = self.run(ticket, request).await?;
        self.sequencer.check(ticket)?;
        info!("Plan {} finished: {:?}", ticket.id(), stage_reached(&result));
        Ok(result)
    }

    fn enter(&self, ticket: RequestTicket, stage: Stage) -> std::result::Result<(), Superseded> {
        self.sequencer.check(ticket)?;
        info!("Plan {}: {:?}", ticket.id(), stage);
        Ok(())
    }

    async fn run(
        &self,
        ticket: RequestTicket,
        request: &PlanRequest,
    ) -> std::result::Result<RouteAndPredictionResult, Superseded> {
        let unresolved_origin = || Location::unresolved(request.origin.as_str());
        let unresolved_destination = || Location::unresolved(request.destination.as_str());

        self.enter(ticket, Stage::ResolvingOrigin)?;
        let origin = match self.geocoder.resolve_best(&request.origin).await {
            Ok(location) => location,
            Err(e) => {
                return Ok(RouteAndPredictionResult::aborted(
                    unresolved_origin(),
                    unresolved_destination(),
                    Stage::ResolvingOrigin,
                    e,
                ))
            }
        };

        self.enter(ticket, Stage::ResolvingDestination)?;
        let destination = match self.geocoder.resolve_best(&request.destination).await {
            Ok(location) => location,
            Err(e) => {
                return Ok(RouteAndPredictionResult::aborted(
                    origin,
                    unresolved_destination(),
                    Stage::ResolvingDestination,
                    e,
                ))
            }
        };

        self.enter(ticket, Stage::FetchingRoute)?;
        let route = match self.router.fetch_route(&origin, &destination).await {
            Ok(Some(route)) => route,
            Ok(None) => {
                return Ok(RouteAndPredictionResult {
                    origin,
                    destination,
                    route: None,
                    traffic_summary: None,
                    prediction: None,
                    status: PlanStatus::NoRoute,
                })
            }
            Err(e) => {
                return Ok(RouteAndPredictionResult::aborted(
                    origin,
                    destination,
                    Stage::FetchingRoute,
                    e,
                ))
            }
        };

        self.enter(ticket, Stage::AggregatingTraffic)?;
        let target = destination.coordinates.unwrap_or_else(|| route.end());
        let (summary, features) = tokio::join!(
            self.aggregator.summarize_region(Region::Route(&route)),
            async { derive_features(request, target) },
        );
        let conditions = match summary {
            Ok(RegionSummary::Measured(m)) => TrafficConditions::Measured(m),
            Ok(RegionSummary::NoData) => TrafficConditions::NoData,
            Err(e) => {
                warn!("Traffic summary unavailable, continuing: {}", e);
                TrafficConditions::Unknown {
                    reason: Failure::from(e),
                }
            }
        };
        let traffic_summary = TrafficSummary::new(&route, conditions);

        self.enter(ticket, Stage::RequestingPrediction)?;
        let prediction = match features {
            Ok(features) => PredictionResult::from(self.predictor.predict(&features).await),
            Err(e) => PredictionResult::Failed(Failure::from(e)),
        };
        if let PredictionResult::Failed(f) = &prediction {
            warn!("Prediction failed: {}", f.message);
        }

        Ok(RouteAndPredictionResult {
            origin,
            destination,
            route: Some(route),
            traffic_summary: Some(traffic_summary),
            prediction: Some(prediction),
            status: PlanStatus::Complete,
        })
    }
}

/// Hour and month of departure, at the destination unless overridden.
fn derive_features(request: &PlanRequest, destination: LatLng) -> Result<PredictionFeatures> {
    let at = request
        .departure
        .unwrap_or_else(|| Local::now().naive_local());
    let place = request.prediction_coordinates.unwrap_or(destination);
    PredictionFeatures::new(i64::from(at.hour()), i64::from(at.month()), place.lng, place.lat)
}

fn stage_reached(result: &RouteAndPredictionResult) -> Stage {
    match &result.status {
        PlanStatus::Complete => Stage::Complete,
        PlanStatus::NoRoute => Stage::FetchingRoute,
        PlanStatus::Aborted(f) => f.stage,
    }
}
