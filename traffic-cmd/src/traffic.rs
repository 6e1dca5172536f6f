//! Traffic record commands: paging, region summaries and store stats.

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use traffic_core::geo::{BoundingBox, LatLng};
use traffic_core::observation::{DateFilter, SortOrder};
use traffic_db::Database;
use traffic_pipeline::aggregate::{Region, TrafficAggregator};
use traffic_utils::dates::parse_date;

use crate::print_json;
use crate::services::ServiceArgs;

/// Load a records file into a fresh in-memory store. `.json` files hold an
/// array of persisted records; anything else is read as headerless CSV.
pub fn load_store(path: &str) -> anyhow::Result<Database> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
    let db = Database::new()?;
    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let report = if is_json {
        db.load_observations_json(&data)?
    } else {
        db.load_observations_csv(&data)?
    };
    if report.skipped > 0 {
        warn!("{}: skipped {} invalid records", path, report.skipped);
    }
    info!("{}: loaded {} records", path, report.loaded);
    Ok(db)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub filter: DateFilter,
    pub order: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl PageQuery {
    pub fn parse(
        page: i64,
        limit: i64,
        start_date: Option<&str>,
        end_date: Option<&str>,
        descending: bool,
    ) -> anyhow::Result<Self> {
        let filter = DateFilter::new(
            start_date.map(parse_date).transpose()?,
            end_date.map(parse_date).transpose()?,
        );
        let order = if descending {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        };
        Ok(PageQuery {
            filter,
            order,
            page,
            limit,
        })
    }
}

pub async fn run_local_page(path: &str, query: &PageQuery) -> anyhow::Result<()> {
    let aggregator = TrafficAggregator::new(Arc::new(load_store(path)?));
    let page = aggregator
        .query_page_ordered(&query.filter, query.order, query.page, query.limit)
        .await?;
    print_json(&page)
}

pub async fn run_remote_page(services: &ServiceArgs, query: &PageQuery) -> anyhow::Result<()> {
    if query.order == SortOrder::Descending {
        warn!("The traffic API only serves ascending pages; ignoring --descending");
    }
    let clients = services.clients()?;
    let page = clients
        .traffic
        .query_page(&query.filter, query.page, query.limit)
        .await?;
    print_json(&page)
}

pub async fn run_summarize(path: &str, corner: (f64, f64), opposite: (f64, f64)) -> anyhow::Result<()> {
    let bounds = BoundingBox::new(LatLng::new(corner.0, corner.1), LatLng::new(opposite.0, opposite.1));
    let aggregator = TrafficAggregator::new(Arc::new(load_store(path)?));
    let summary = aggregator.summarize_region(Region::Bounds(bounds)).await?;
    print_json(&summary)
}

pub fn run_stats(path: &str) -> anyhow::Result<()> {
    let stats = load_store(path)?.query_stats()?;
    print_json(&stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn page_query_parses_dates() {
        let q = PageQuery::parse(2, 25, Some("2024-06-01"), None, true).unwrap();
        assert_eq!(q.filter.start_date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(q.filter.end_date, None);
        assert_eq!(q.order, SortOrder::Descending);
        assert!(PageQuery::parse(1, 10, Some("June 1st"), None, false).is_err());
    }

    #[test]
    fn load_store_picks_format_by_extension() {
        let dir = std::env::temp_dir().join(format!("traffic-cmd-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let csv = dir.join("records.csv");
        std::fs::write(&csv, "2024-06-01T08:00:00Z,2.35,48.85,40,120,35\n").unwrap();
        let json = dir.join("records.JSON");
        std::fs::write(
            &json,
            r#"[{"timestamp": "2024-06-01T08:00:00Z",
                 "location": {"type": "Point", "coordinates": [2.35, 48.85]},
                 "congestion": 40, "volume": 120, "speed": 35}]"#,
        )
        .unwrap();

        for path in [&csv, &json] {
            let db = load_store(path.to_str().unwrap()).unwrap();
            assert_eq!(db.query_stats().unwrap().observations, 1);
        }
        assert!(load_store(dir.join("missing.csv").to_str().unwrap()).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
