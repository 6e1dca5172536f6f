//! Result structs for loader and statistics queries.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a bulk load: rows inserted and rows rejected.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: u32,
    pub skipped: u32,
}

/// Size and time span of the stored observations.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoreStats {
    pub observations: u64,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}
