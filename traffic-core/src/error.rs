/// Error types for the traffic pipeline
use serde::Serialize;
use thiserror::Error;

/// Main error type for geocoding, routing, traffic and prediction operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrafficError {
    /// Geocoding produced no candidate for the query
    #[error("No location found for {0:?}")]
    NotFound(String),

    /// A route was requested for an unresolved origin or destination
    #[error("Invalid route endpoints: {0}")]
    InvalidEndpoints(String),

    /// Caller supplied a malformed or out-of-range value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Page index or page size below 1
    #[error("Invalid page request (page {page_index}, size {page_size})")]
    InvalidPage { page_index: i64, page_size: i64 },

    /// Transport failure, timeout or unparsable payload from an external service
    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// Prediction service was reachable but declined the request
    #[error("{0}")]
    PredictionFailed(String),

    /// Traffic store query failed
    #[error("Traffic store error: {0}")]
    Store(String),
}

/// Copyable classification of a [`TrafficError`], suitable for attaching
/// to partial results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidEndpoints,
    InvalidInput,
    InvalidPage,
    ServiceUnavailable,
    PredictionFailed,
}

impl TrafficError {
    pub fn unavailable(service: impl Into<String>, reason: impl ToString) -> Self {
        TrafficError::ServiceUnavailable {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TrafficError::NotFound(_) => ErrorKind::NotFound,
            TrafficError::InvalidEndpoints(_) => ErrorKind::InvalidEndpoints,
            TrafficError::InvalidInput(_) => ErrorKind::InvalidInput,
            TrafficError::InvalidPage { .. } => ErrorKind::InvalidPage,
            TrafficError::ServiceUnavailable { .. } | TrafficError::Store(_) => {
                ErrorKind::ServiceUnavailable
            }
            TrafficError::PredictionFailed(_) => ErrorKind::PredictionFailed,
        }
    }

    /// Only transport-level failures are worth retrying; argument errors and
    /// explicit rejections will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrafficError::ServiceUnavailable { .. })
    }
}

/// Type alias for Results using TrafficError
pub type Result<T> = std::result::Result<T, TrafficError>;
