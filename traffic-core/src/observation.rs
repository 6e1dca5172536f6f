use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrafficError};
use crate::geo::LatLng;
use crate::wire::{ObservationRecord, PointGeometry};

/// Upper bound of the congestion scale.
pub const MAX_CONGESTION: f64 = 100.0;

/// A single traffic sample at one place and time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficObservation {
    pub timestamp: DateTime<Utc>,
    pub location: LatLng,
    /// Congestion level in [0, 100]
    pub congestion: f64,
    /// Vehicle count, >= 0
    pub volume: f64,
    /// Mean speed, >= 0
    pub speed: f64,
}

impl TrafficObservation {
    pub fn new(
        timestamp: DateTime<Utc>,
        location: LatLng,
        congestion: f64,
        volume: f64,
        speed: f64,
    ) -> Result<Self> {
        if !(congestion.is_finite() && (0.0..=MAX_CONGESTION).contains(&congestion)) {
            return Err(TrafficError::InvalidInput(format!(
                "congestion {} outside [0, 100]",
                congestion
            )));
        }
        if !(volume.is_finite() && volume >= 0.0) {
            return Err(TrafficError::InvalidInput(format!("negative volume {}", volume)));
        }
        if !(speed.is_finite() && speed >= 0.0) {
            return Err(TrafficError::InvalidInput(format!("negative speed {}", speed)));
        }
        if !(location.lat.is_finite() && location.lng.is_finite()) {
            return Err(TrafficError::InvalidInput("non-finite location".into()));
        }
        Ok(TrafficObservation {
            timestamp,
            location,
            congestion,
            volume,
            speed,
        })
    }

    /// The persisted shape of this observation.
    pub fn to_record(&self) -> ObservationRecord {
        ObservationRecord {
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            location: PointGeometry::point(self.location.lng, self.location.lat),
            congestion: self.congestion,
            volume: self.volume,
            speed: self.speed,
        }
    }
}

impl TryFrom<ObservationRecord> for TrafficObservation {
    type Error = TrafficError;

    fn try_from(value: ObservationRecord) -> Result<Self> {
        if value.location.kind != "Point" {
            return Err(TrafficError::InvalidInput(format!(
                "location must be a Point, got {}",
                value.location.kind
            )));
        }
        let location = LatLng::from_lng_lat(&value.location.coordinates).ok_or_else(|| {
            TrafficError::InvalidInput(format!(
                "location coordinates must be [lng, lat], got {:?}",
                value.location.coordinates
            ))
        })?;
        let timestamp = traffic_utils::dates::parse_timestamp(&value.timestamp)
            .map_err(|e| TrafficError::InvalidInput(e.to_string()))?;
        TrafficObservation::new(timestamp, location, value.congestion, value.volume, value.speed)
    }
}

/// Optional inclusive date bounds for traffic queries. A missing bound is
/// unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateFilter {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        DateFilter {
            start_date,
            end_date,
        }
    }

    /// Half-open timestamp bounds `[from, until)` covering both dates in full.
    pub fn timestamp_bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let from = self.start_date.as_ref().map(traffic_utils::dates::start_of_day);
        let until = self
            .end_date
            .as_ref()
            .and_then(traffic_utils::dates::start_of_next_day);
        (from, until)
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        let (from, until) = self.timestamp_bounds();
        from.map_or(true, |f| *timestamp >= f) && until.map_or(true, |u| *timestamp < u)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// One page of observations plus the totals needed to page through the rest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficPage {
    pub records: Vec<TrafficObservation>,
    pub page_index: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub total_pages: u64,
}

impl TrafficPage {
    /// `ceil(total_records / page_size)`; zero records is zero pages.
    pub fn total_pages_for(total_records: u64, page_size: u32) -> u64 {
        if page_size == 0 {
            return 0;
        }
        total_records.div_ceil(u64::from(page_size))
    }

    /// Clamp a requested page index into `[1, max(total_pages, 1)]`.
    ///
    /// The store never clamps; callers paging through results use this to
    /// keep a stale page index in range after the filters change.
    pub fn clamp_page_index(requested: i64, total_pages: u64) -> u32 {
        let upper = total_pages.clamp(1, u64::from(u32::MAX)) as i64;
        requested.clamp(1, upper) as u32
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page_index) < self.total_pages
    }
}

/// Mean conditions over the observations inside a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionMetrics {
    pub mean_congestion: f64,
    pub mean_volume: f64,
    pub mean_speed: f64,
    pub samples: usize,
}

impl RegionMetrics {
    /// Means over `observations`, or `None` when there are none.
    pub fn from_observations<'a, I>(observations: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a TrafficObservation>,
    {
        let (mut congestion, mut volume, mut speed, mut n) = (0.0, 0.0, 0.0, 0usize);
        for obs in observations {
            congestion += obs.congestion;
            volume += obs.volume;
            speed += obs.speed;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let count = n as f64;
        Some(RegionMetrics {
            mean_congestion: congestion / count,
            mean_volume: volume / count,
            mean_speed: speed / count,
            samples: n,
        })
    }
}

/// Result of summarizing a region: either measured means or an explicit
/// "no observations here" marker. Neither is an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegionSummary {
    Measured(RegionMetrics),
    NoData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(coords: Vec<f64>, congestion: f64) -> ObservationRecord {
        ObservationRecord {
            timestamp: "2024-06-01T14:00:00Z".into(),
            location: PointGeometry {
                kind: "Point".into(),
                coordinates: coords,
            },
            congestion,
            volume: 100.0,
            speed: 40.0,
        }
    }

    #[test]
    fn record_conversion_swaps_coordinates() {
        let obs = TrafficObservation::try_from(record(vec![2.35, 48.85], 42.0)).unwrap();
        assert_eq!(obs.location, LatLng::new(48.85, 2.35));
        assert_eq!(obs.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap());
        let back = obs.to_record();
        assert_eq!(back.location.coordinates, vec![2.35, 48.85]);
        assert_eq!(back.timestamp, "2024-06-01T14:00:00Z");
    }

    #[test]
    fn record_conversion_enforces_invariants() {
        assert!(TrafficObservation::try_from(record(vec![2.35, 48.85], 101.0)).is_err());
        assert!(TrafficObservation::try_from(record(vec![2.35, 48.85], -1.0)).is_err());
        assert!(TrafficObservation::try_from(record(vec![2.35], 10.0)).is_err());
        let mut line = record(vec![2.35, 48.85], 10.0);
        line.location.kind = "LineString".into();
        assert!(TrafficObservation::try_from(line).is_err());
        let mut bad_time = record(vec![2.35, 48.85], 10.0);
        bad_time.timestamp = "soon".into();
        assert!(TrafficObservation::try_from(bad_time).is_err());
    }

    #[test]
    fn date_filter_is_inclusive_on_both_ends() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
        let filter = DateFilter::new(Some(day(1)), Some(day(3)));
        let at = |d, h, m| Utc.with_ymd_and_hms(2024, 6, d, h, m, 0).unwrap();
        assert!(filter.contains(&at(1, 0, 0)));
        assert!(filter.contains(&at(3, 23, 59)));
        assert!(!filter.contains(&at(4, 0, 0)));
        assert!(!filter.contains(&Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap()));
    }

    #[test]
    fn date_filter_open_bounds() {
        let filter = DateFilter::new(None, Some(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        assert!(filter.contains(&Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap()));
        assert!(DateFilter::default().contains(&Utc::now()));
    }

    #[test]
    fn total_pages_is_ceiling() {
        assert_eq!(TrafficPage::total_pages_for(0, 10), 0);
        assert_eq!(TrafficPage::total_pages_for(1, 10), 1);
        assert_eq!(TrafficPage::total_pages_for(10, 10), 1);
        assert_eq!(TrafficPage::total_pages_for(11, 10), 2);
        assert_eq!(TrafficPage::total_pages_for(11, 0), 0);
    }

    #[test]
    fn clamp_page_index_bounds() {
        assert_eq!(TrafficPage::clamp_page_index(0, 5), 1);
        assert_eq!(TrafficPage::clamp_page_index(-3, 5), 1);
        assert_eq!(TrafficPage::clamp_page_index(9, 5), 5);
        assert_eq!(TrafficPage::clamp_page_index(4, 0), 1);
    }

    #[test]
    fn region_metrics_means() {
        let t = Utc::now();
        let p = LatLng::new(0.0, 0.0);
        let obs = vec![
            TrafficObservation::new(t, p, 40.0, 100.0, 30.0).unwrap(),
            TrafficObservation::new(t, p, 44.0, 200.0, 50.0).unwrap(),
        ];
        let m = RegionMetrics::from_observations(&obs).unwrap();
        assert_eq!(m.mean_congestion, 42.0);
        assert_eq!(m.mean_volume, 150.0);
        assert_eq!(m.mean_speed, 40.0);
        assert_eq!(m.samples, 2);
        assert!(RegionMetrics::from_observations(&Vec::<TrafficObservation>::new()).is_none());
    }
}
