//! Pipeline tuning knobs.

use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_GEOCODE_CANDIDATES: usize = 5;
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CORRIDOR_METERS: f64 = 500.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Candidates requested from the geocoder per query
    pub geocode_candidates: usize,
    /// Upper bound on any single external call, whatever the transport
    pub stage_timeout_secs: u64,
    /// Observations farther than this from the route polyline are ignored
    pub corridor_meters: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            geocode_candidates: DEFAULT_GEOCODE_CANDIDATES,
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            corridor_meters: DEFAULT_CORRIDOR_METERS,
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs.max(1))
    }
}
