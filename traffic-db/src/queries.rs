//! Typed query methods for retrieving traffic observations.
//!
//! Time filters are applied as half-open millisecond ranges derived from the
//! inclusive [`DateFilter`] dates. Ordering is always by timestamp with the
//! row id as a tiebreaker, so offset pagination is stable.

use crate::models::StoreStats;
use crate::Database;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Row};
use traffic_core::error::{Result as TrafficResult, TrafficError};
use traffic_core::geo::{BoundingBox, LatLng};
use traffic_core::observation::{DateFilter, SortOrder, TrafficObservation};
use traffic_core::service::TrafficStore;

const OBSERVATION_COLUMNS: &str = "timestamp_ms, latitude, longitude, congestion, volume, speed";

fn millis_bounds(filter: &DateFilter) -> (Option<i64>, Option<i64>) {
    let (from, until) = filter.timestamp_bounds();
    (
        from.map(|t| t.timestamp_millis()),
        until.map(|t| t.timestamp_millis()),
    )
}

fn from_millis(ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(0, ms))
}

fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<TrafficObservation> {
    Ok(TrafficObservation {
        timestamp: from_millis(row.get(0)?)?,
        location: LatLng::new(row.get(1)?, row.get(2)?),
        congestion: row.get(3)?,
        volume: row.get(4)?,
        speed: row.get(5)?,
    })
}

fn to_sql_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl Database {
    /// Count observations matching the date filter.
    pub fn count_observations(&self, filter: &DateFilter) -> anyhow::Result<u64> {
        let (from, until) = millis_bounds(filter);
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM observations
             WHERE (?1 IS NULL OR timestamp_ms >= ?1)
               AND (?2 IS NULL OR timestamp_ms < ?2)",
            params![from, until],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Get one offset/limit window of observations matching the date filter.
    ///
    /// Ordered by timestamp in the requested direction, ties broken by
    /// insertion order in the same direction, so consecutive windows never
    /// overlap or skip rows.
    pub fn query_observations(
        &self,
        filter: &DateFilter,
        order: SortOrder,
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<TrafficObservation>> {
        let (from, until) = millis_bounds(filter);
        let direction = match order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let sql = format!(
            "SELECT {cols} FROM observations
             WHERE (?1 IS NULL OR timestamp_ms >= ?1)
               AND (?2 IS NULL OR timestamp_ms < ?2)
             ORDER BY timestamp_ms {dir}, id {dir}
             LIMIT ?3 OFFSET ?4",
            cols = OBSERVATION_COLUMNS,
            dir = direction
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![from, until, to_sql_int(limit), to_sql_int(skip)],
                row_to_observation,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "query: query_observations returned {} records (skip {}, limit {})",
            rows.len(),
            skip,
            limit
        );
        Ok(rows)
    }

    /// Get every observation inside a bounding box (bounds inclusive),
    /// ordered by timestamp.
    pub fn query_within_bounds(&self, bounds: &BoundingBox) -> anyhow::Result<Vec<TrafficObservation>> {
        let sql = format!(
            "SELECT {} FROM observations
             WHERE latitude BETWEEN ?1 AND ?2
               AND longitude BETWEEN ?3 AND ?4
             ORDER BY timestamp_ms, id",
            OBSERVATION_COLUMNS
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng],
                row_to_observation,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "query: query_within_bounds returned {} records",
            rows.len()
        );
        Ok(rows)
    }

    /// Get the number of observations and the earliest/latest timestamps.
    pub fn query_stats(&self) -> anyhow::Result<StoreStats> {
        let conn = self.conn()?;
        let (count, min, max): (i64, Option<i64>, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), MIN(timestamp_ms), MAX(timestamp_ms) FROM observations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(StoreStats {
            observations: count as u64,
            earliest: min.map(from_millis).transpose()?,
            latest: max.map(from_millis).transpose()?,
        })
    }
}

fn store_error(e: anyhow::Error) -> TrafficError {
    TrafficError::Store(e.to_string())
}

#[async_trait]
impl TrafficStore for Database {
    async fn count(&self, filter: &DateFilter) -> TrafficResult<u64> {
        self.count_observations(filter).map_err(store_error)
    }

    async fn fetch(
        &self,
        filter: &DateFilter,
        order: SortOrder,
        skip: u64,
        limit: u64,
    ) -> TrafficResult<Vec<TrafficObservation>> {
        self.query_observations(filter, order, skip, limit)
            .map_err(store_error)
    }

    async fn within_bounds(&self, bounds: &BoundingBox) -> TrafficResult<Vec<TrafficObservation>> {
        self.query_within_bounds(bounds).map_err(store_error)
    }
}
