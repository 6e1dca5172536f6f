//! Feature validation and prediction service calls.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use traffic_core::error::{Result, TrafficError};
use traffic_core::prediction::{FeatureValue, Prediction, PredictionFeatures, RawFeatures};
use traffic_core::service::PredictionService;
use traffic_core::wire::PredictionReply;
use traffic_utils::numbers::{coerce_float, coerce_int, truncate_float};

use crate::bounded;
use crate::config::DEFAULT_STAGE_TIMEOUT_SECS;

const PREDICTION: &str = "prediction service";

pub const GENERIC_FAILURE: &str =
    "Failed to get prediction. Please check your input values and try again.";

/// Coerce and range-check raw inputs.
///
/// Coordinates are checked before hour and month, so a form with both bad
/// coordinates and a bad hour reports the coordinates.
pub fn normalize(raw: &RawFeatures) -> Result<PredictionFeatures> {
    let (longitude, latitude) = match (as_float(&raw.longitude), as_float(&raw.latitude)) {
        (Some(lng), Some(lat)) => (lng, lat),
        _ => {
            return Err(TrafficError::InvalidInput(
                "Longitude and latitude must be valid numbers".into(),
            ))
        }
    };
    let hour = as_int(&raw.hour).ok_or_else(|| {
        TrafficError::InvalidInput("Invalid hour. It must be an integer between 0 and 23".into())
    })?;
    let month = as_int(&raw.month).ok_or_else(|| {
        TrafficError::InvalidInput("Invalid month. It must be an integer between 1 and 12".into())
    })?;
    PredictionFeatures::new(hour, month, longitude, latitude)
}

fn as_int(value: &FeatureValue) -> Option<i64> {
    match value {
        FeatureValue::Integer(i) => Some(*i),
        FeatureValue::Float(f) => truncate_float(*f),
        FeatureValue::Text(s) => coerce_int(s),
    }
}

fn as_float(value: &FeatureValue) -> Option<f64> {
    match value {
        FeatureValue::Integer(i) => Some(*i as f64),
        FeatureValue::Float(f) => Some(*f).filter(|f| f.is_finite()),
        FeatureValue::Text(s) => coerce_float(s),
    }
}

/// Validates raw features and asks the model for a volume prediction.
#[derive(Clone)]
pub struct PredictionRequestor {
    service: Arc<dyn PredictionService>,
    timeout: Duration,
}

impl PredictionRequestor {
    pub fn new(service: Arc<dyn PredictionService>) -> Self {
        PredictionRequestor {
            service,
            timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate `raw` and, only if it is valid, ask the model.
    pub async fn request(&self, raw: &RawFeatures) -> Result<Prediction> {
        let features = normalize(raw)?;
        self.predict(&features).await
    }

    /// Ask the model for already-validated features. The predicted value
    /// is returned exactly as the service sent it.
    pub async fn predict(&self, features: &PredictionFeatures) -> Result<Prediction> {
        let request = features.to_request();
        let reply = bounded(PREDICTION, self.timeout, self.service.predict(&request)).await?;
        match reply {
            PredictionReply::Predicted { prediction } => {
                info!(
                    "Predicted volume {} for hour {} month {} at ({}, {})",
                    prediction, request.hour, request.month, request.y, request.x
                );
                Ok(Prediction {
                    predicted_volume: prediction,
                })
            }
            PredictionReply::Rejected { status, detail } => {
                warn!("Prediction rejected with HTTP {}: {:?}", status, detail);
                Err(TrafficError::PredictionFailed(match detail {
                    Some(detail) => format!("Prediction failed: {}", detail),
                    None => GENERIC_FAILURE.to_string(),
                }))
            }
        }
    }
}
