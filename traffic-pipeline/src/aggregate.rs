//! Paged traffic queries and region summaries over a [`TrafficStore`].

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use traffic_core::error::{Result, TrafficError};
use traffic_core::geo::BoundingBox;
use traffic_core::observation::{DateFilter, RegionMetrics, RegionSummary, SortOrder, TrafficPage};
use traffic_core::route::RouteGeometry;
use traffic_core::service::TrafficStore;

use crate::bounded;
use crate::config::{DEFAULT_CORRIDOR_METERS, DEFAULT_STAGE_TIMEOUT_SECS};

const STORE: &str = "traffic store";

/// Area to summarize.
#[derive(Debug, Clone, Copy)]
pub enum Region<'a> {
    /// Observations within the corridor around the polyline.
    Route(&'a RouteGeometry),
    Bounds(BoundingBox),
}

/// Paged traffic queries and per-region summaries over the observation store.
#[derive(Clone)]
pub struct TrafficAggregator {
    store: Arc<dyn TrafficStore>,
    corridor_meters: f64,
    timeout: Duration,
}

impl TrafficAggregator {
    pub fn new(store: Arc<dyn TrafficStore>) -> Self {
        TrafficAggregator {
            store,
            corridor_meters: DEFAULT_CORRIDOR_METERS,
            timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
        }
    }

    pub fn with_corridor(mut self, meters: f64) -> Self {
        self.corridor_meters = meters.max(0.0);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One page of observations, oldest first.
    pub async fn query_page(
        &self,
        filter: &DateFilter,
        page_index: i64,
        page_size: i64,
    ) -> Result<TrafficPage> {
        self.query_page_ordered(filter, SortOrder::Ascending, page_index, page_size)
            .await
    }

    /// One page of observations in the given order.
    ///
    /// `page_index` is 1-based and is not clamped here; a page past the end
    /// comes back empty with the real totals.
    pub async fn query_page_ordered(
        &self,
        filter: &DateFilter,
        order: SortOrder,
        page_index: i64,
        page_size: i64,
    ) -> Result<TrafficPage> {
        let invalid = TrafficError::InvalidPage {
            page_index,
            page_size,
        };
        if page_index < 1 || page_size < 1 {
            return Err(invalid);
        }
        let (index, size) = match (u32::try_from(page_index), u32::try_from(page_size)) {
            (Ok(index), Ok(size)) => (index, size),
            _ => return Err(invalid),
        };
        let skip = u64::from(index - 1).saturating_mul(u64::from(size));

        let total_records = bounded(STORE, self.timeout, self.store.count(filter)).await?;
        let records = bounded(
            STORE,
            self.timeout,
            self.store.fetch(filter, order, skip, u64::from(size)),
        )
        .await?;
        let total_pages = TrafficPage::total_pages_for(total_records, size);
        debug!(
            "Page {}/{} ({} records of {})",
            index,
            total_pages,
            records.len(),
            total_records
        );
        Ok(TrafficPage {
            records,
            page_index: index,
            page_size: size,
            total_records,
            total_pages,
        })
    }

    /// Mean conditions over the observations in `region`.
    ///
    /// An empty region is [`RegionSummary::NoData`], not an error.
    pub async fn summarize_region(&self, region: Region<'_>) -> Result<RegionSummary> {
        let bounds = match region {
            Region::Route(route) => route.bounds().padded(self.corridor_meters),
            Region::Bounds(bounds) => bounds,
        };
        let candidates = bounded(STORE, self.timeout, self.store.within_bounds(&bounds)).await?;
        let metrics = match region {
            Region::Route(route) => {
                let corridor = self.corridor_meters;
                RegionMetrics::from_observations(candidates.iter().filter(|obs| {
                    obs.location.distance_to_polyline_meters(route.points()) <= corridor
                }))
            }
            Region::Bounds(_) => RegionMetrics::from_observations(&candidates),
        };
        match metrics {
            Some(m) => {
                info!(
                    "Region summary: {} samples, mean congestion {:.1}",
                    m.samples, m.mean_congestion
                );
                Ok(RegionSummary::Measured(m))
            }
            None => {
                info!("Region summary: no observations in region");
                Ok(RegionSummary::NoData)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingStore;
    use chrono::NaiveDate;
    use traffic_core::error::ErrorKind;
    use traffic_core::geo::LatLng;
    use traffic_db::Database;

    /// Eleven hourly samples on 2024-06-01 near Paris, inserted newest first,
    /// plus one in Lyon on 2024-06-02.
    fn store() -> Arc<Database> {
        let db = Database::new().unwrap();
        let mut csv = String::new();
        for hour in (0..11).rev() {
            csv.push_str(&format!(
                "2024-06-01T{:02}:00:00Z,2.35,48.85,{},{},30\n",
                hour,
                hour * 5,
                hour * 10
            ));
        }
        csv.push_str("2024-06-02T08:00:00Z,4.83,45.76,90,500,5\n");
        db.load_observations_csv(&csv).unwrap();
        Arc::new(db)
    }

    fn line(points: &[(f64, f64)]) -> RouteGeometry {
        RouteGeometry::new(
            points.iter().map(|(lat, lng)| LatLng::new(*lat, *lng)).collect(),
            1000.0,
            60.0,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn pages_concatenate_to_full_ordered_set() {
        let db = store();
        let aggregator = TrafficAggregator::new(db.clone());
        let filter = DateFilter::default();
        let all = db
            .query_observations(&filter, SortOrder::Ascending, 0, 1000)
            .unwrap();

        for size in 1..=13 {
            let first = aggregator.query_page(&filter, 1, size).await.unwrap();
            assert_eq!(first.total_records, 12);
            assert_eq!(first.total_pages, 12u64.div_ceil(size as u64));

            let mut joined = Vec::new();
            for page in 1..=first.total_pages as i64 {
                let p = aggregator.query_page(&filter, page, size).await.unwrap();
                assert_eq!(p.page_index as i64, page);
                joined.extend(p.records);
            }
            assert_eq!(joined, all, "page size {}", size);
        }
        for pair in all.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn page_past_end_is_empty_not_clamped() {
        let aggregator = TrafficAggregator::new(store());
        let page = aggregator.query_page(&DateFilter::default(), 9, 5).await.unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.page_index, 9);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn rejects_bad_page_arguments() {
        let aggregator = TrafficAggregator::new(store());
        for (index, size) in [(0, 10), (-3, 10), (1, 0), (1, -1)] {
            let err = aggregator
                .query_page(&DateFilter::default(), index, size)
                .await
                .unwrap_err();
            assert_eq!(
                err,
                TrafficError::InvalidPage {
                    page_index: index,
                    page_size: size
                }
            );
            assert_eq!(err.kind(), ErrorKind::InvalidPage);
        }
    }

    #[tokio::test]
    async fn date_filter_and_descending_order() {
        let aggregator = TrafficAggregator::new(store());
        let june_2 = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        let page = aggregator
            .query_page(&DateFilter::new(Some(june_2), Some(june_2)), 1, 10)
            .await
            .unwrap();
        assert_eq!(page.total_records, 1);
        assert_eq!(page.records[0].congestion, 90.0);

        let newest = aggregator
            .query_page_ordered(&DateFilter::default(), SortOrder::Descending, 1, 2)
            .await
            .unwrap();
        assert_eq!(newest.records[0].congestion, 90.0);
        assert_eq!(newest.records[1].congestion, 50.0);
    }

    #[tokio::test]
    async fn empty_store_has_zero_pages() {
        let aggregator = TrafficAggregator::new(Arc::new(Database::new().unwrap()));
        let page = aggregator.query_page(&DateFilter::default(), 1, 10).await.unwrap();
        assert_eq!(page.total_records, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn summarizes_observations_along_route() {
        let aggregator = TrafficAggregator::new(store());
        // Short segment through the Paris samples; Lyon is far outside.
        let route = line(&[(48.84, 2.35), (48.86, 2.35)]);
        let summary = aggregator.summarize_region(Region::Route(&route)).await.unwrap();
        match summary {
            RegionSummary::Measured(m) => {
                assert_eq!(m.samples, 11);
                assert_eq!(m.mean_congestion, 25.0);
                assert_eq!(m.mean_volume, 50.0);
                assert_eq!(m.mean_speed, 30.0);
            }
            RegionSummary::NoData => panic!("expected measurements"),
        }
    }

    #[tokio::test]
    async fn corridor_excludes_points_inside_box_but_off_route() {
        // An L-shaped route whose bounding box contains the Paris samples,
        // which sit about 1.1 km from either leg.
        let route = line(&[(48.84, 2.33), (48.84, 2.37), (48.86, 2.37)]);
        let aggregator = TrafficAggregator::new(store()).with_corridor(500.0);
        assert_eq!(
            aggregator.summarize_region(Region::Route(&route)).await.unwrap(),
            RegionSummary::NoData
        );
        let wide = TrafficAggregator::new(store()).with_corridor(2_000.0);
        assert!(matches!(
            wide.summarize_region(Region::Route(&route)).await.unwrap(),
            RegionSummary::Measured(_)
        ));
    }

    #[tokio::test]
    async fn empty_region_is_no_data() {
        let aggregator = TrafficAggregator::new(store());
        let ocean = BoundingBox::new(LatLng::new(40.0, -30.0), LatLng::new(41.0, -29.0));
        assert_eq!(
            aggregator.summarize_region(Region::Bounds(ocean)).await.unwrap(),
            RegionSummary::NoData
        );
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let aggregator = TrafficAggregator::new(Arc::new(FailingStore));
        let ocean = BoundingBox::new(LatLng::new(40.0, -30.0), LatLng::new(41.0, -29.0));
        let err = aggregator.summarize_region(Region::Bounds(ocean)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
        assert!(aggregator.query_page(&DateFilter::default(), 1, 10).await.is_err());
    }
}
