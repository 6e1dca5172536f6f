use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result, TrafficError};
use crate::wire::PredictionRequest;

/// A raw feature value, as typed into a form or computed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Text(s.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(s: String) -> Self {
        FeatureValue::Text(s)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Integer(v)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        FeatureValue::Integer(i64::from(v))
    }
}

impl From<u32> for FeatureValue {
    fn from(v: u32) -> Self {
        FeatureValue::Integer(i64::from(v))
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Float(v)
    }
}

/// Unvalidated prediction inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeatures {
    pub hour: FeatureValue,
    pub month: FeatureValue,
    pub longitude: FeatureValue,
    pub latitude: FeatureValue,
}

impl RawFeatures {
    pub fn new(
        hour: impl Into<FeatureValue>,
        month: impl Into<FeatureValue>,
        longitude: impl Into<FeatureValue>,
        latitude: impl Into<FeatureValue>,
    ) -> Self {
        RawFeatures {
            hour: hour.into(),
            month: month.into(),
            longitude: longitude.into(),
            latitude: latitude.into(),
        }
    }
}

/// Validated model inputs: hour in [0, 23], month in [1, 12], finite
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionFeatures {
    hour: u8,
    month: u8,
    longitude: f64,
    latitude: f64,
}

impl PredictionFeatures {
    pub fn new(hour: i64, month: i64, longitude: f64, latitude: f64) -> Result<Self> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(TrafficError::InvalidInput(
                "Longitude and latitude must be valid numbers".into(),
            ));
        }
        if !(0..=23).contains(&hour) {
            return Err(TrafficError::InvalidInput(format!(
                "Invalid hour {}. It must be an integer between 0 and 23",
                hour
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(TrafficError::InvalidInput(format!(
                "Invalid month {}. It must be an integer between 1 and 12",
                month
            )));
        }
        Ok(PredictionFeatures {
            hour: hour as u8,
            month: month as u8,
            longitude,
            latitude,
        })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// The wire body, longitude as `x` and latitude as `y`.
    pub fn to_request(&self) -> PredictionRequest {
        PredictionRequest {
            hour: self.hour,
            month: self.month,
            x: self.longitude,
            y: self.latitude,
        }
    }
}

/// A successful model output, passed through unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub predicted_volume: f64,
}

/// Why a stage produced no value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&TrafficError> for Failure {
    fn from(err: &TrafficError) -> Self {
        Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<TrafficError> for Failure {
    fn from(err: TrafficError) -> Self {
        Failure::from(&err)
    }
}

/// A prediction or the reason there is none. There is no placeholder value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionResult {
    Predicted(Prediction),
    Failed(Failure),
}

impl PredictionResult {
    pub fn predicted_volume(&self) -> Option<f64> {
        match self {
            PredictionResult::Predicted(p) => Some(p.predicted_volume),
            PredictionResult::Failed(_) => None,
        }
    }
}

impl From<Result<Prediction>> for PredictionResult {
    fn from(result: Result<Prediction>) -> Self {
        match result {
            Ok(p) => PredictionResult::Predicted(p),
            Err(e) => PredictionResult::Failed(Failure::from(e)),
        }
    }
}
