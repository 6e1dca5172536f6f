//! Data loading functions for populating the in-memory traffic store.
//!
//! Each loader parses records from a string slice and inserts the valid ones
//! in a single transaction. Records that violate the persisted-shape
//! invariants are skipped and counted rather than failing the whole load.
//!
//! # Formats
//!
//! - **JSON**: an array of persisted records,
//!   `{"timestamp", "location": {"type": "Point", "coordinates": [lng, lat]}, "congestion", "volume", "speed"}`
//! - **CSV** (no headers): `timestamp,lng,lat,congestion,volume,speed`

use crate::models::LoadReport;
use crate::Database;
use rusqlite::params;
use traffic_core::geo::LatLng;
use traffic_core::observation::TrafficObservation;
use traffic_core::wire::ObservationRecord;

impl Database {
    /// Insert already-validated observations.
    pub fn insert_observations(&self, observations: &[TrafficObservation]) -> anyhow::Result<u32> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO observations (timestamp_ms, latitude, longitude, congestion, volume, speed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for obs in observations {
                stmt.execute(params![
                    obs.timestamp.timestamp_millis(),
                    obs.location.lat,
                    obs.location.lng,
                    obs.congestion,
                    obs.volume,
                    obs.speed
                ])?;
            }
        }
        tx.commit()?;
        Ok(observations.len() as u32)
    }

    /// Load observations from a JSON array of persisted records.
    ///
    /// The payload must be a JSON array; individual elements that fail to
    /// decode or validate are skipped.
    ///
    /// # Example JSON
    /// ```text
    /// [{"timestamp": "2024-06-01T08:00:00Z",
    ///   "location": {"type": "Point", "coordinates": [2.35, 48.85]},
    ///   "congestion": 40, "volume": 120, "speed": 35}]
    /// ```
    pub fn load_observations_json(&self, json_data: &str) -> anyhow::Result<LoadReport> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json_data)?;
        let mut valid = Vec::with_capacity(values.len());
        let mut skipped = 0u32;
        for value in values {
            let observation = serde_json::from_value::<ObservationRecord>(value)
                .map_err(|e| e.to_string())
                .and_then(|record| TrafficObservation::try_from(record).map_err(|e| e.to_string()));
            match observation {
                Ok(obs) => valid.push(obs),
                Err(reason) => {
                    log::debug!("loader: skipping record: {}", reason);
                    skipped += 1;
                }
            }
        }
        let loaded = self.insert_observations(&valid)?;
        log::info!(
            "loader: Loaded {} observations from JSON, skipped {} invalid",
            loaded,
            skipped
        );
        Ok(LoadReport { loaded, skipped })
    }

    /// Load observations from CSV string.
    ///
    /// Expected format (no headers): `timestamp,lng,lat,congestion,volume,speed`
    ///
    /// # Example CSV
    /// ```text
    /// 2024-06-01T08:00:00Z,2.35,48.85,40,120,35
    /// 2024-06-01 09:00:00,2.36,48.86,55,180,22.5
    /// ```
    pub fn load_observations_csv(&self, csv_data: &str) -> anyhow::Result<LoadReport> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut valid = Vec::new();
        let mut skipped = 0u32;
        for result in rdr.records() {
            let r = result?;
            let field = |i: usize| r.get(i).unwrap_or("").trim();
            let number = |i: usize| field(i).parse::<f64>().ok();

            let parsed = match (number(1), number(2), number(3), number(4), number(5)) {
                (Some(lng), Some(lat), Some(congestion), Some(volume), Some(speed)) => {
                    traffic_utils::dates::parse_timestamp(field(0))
                        .map_err(|e| e.to_string())
                        .and_then(|ts| {
                            TrafficObservation::new(ts, LatLng::new(lat, lng), congestion, volume, speed)
                                .map_err(|e| e.to_string())
                        })
                }
                _ => Err(format!("non-numeric field in row {:?}", r)),
            };
            match parsed {
                Ok(obs) => valid.push(obs),
                Err(reason) => {
                    log::debug!("loader: skipping row: {}", reason);
                    skipped += 1;
                }
            }
        }
        let loaded = self.insert_observations(&valid)?;
        log::info!(
            "loader: Loaded {} observations from CSV, skipped {} invalid",
            loaded,
            skipped
        );
        Ok(LoadReport { loaded, skipped })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use traffic_core::observation::DateFilter;

    #[test]
    fn load_csv_skips_invalid_rows() {
        let db = Database::new().unwrap();
        let report = db
            .load_observations_csv(
                "2024-06-01T08:00:00Z,2.35,48.85,40,120,35\n\
                 2024-06-01T09:00:00Z,2.35,48.85,140,120,35\n\
                 2024-06-01T10:00:00Z,2.35,48.85,40,-1,35\n\
                 not-a-date,2.35,48.85,40,120,35\n\
                 2024-06-01T11:00:00Z,east,48.85,40,120,35\n\
                 2024-06-01 12:00:00,2.36,48.86,55,180,22.5\n",
            )
            .unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped, 4);
        assert_eq!(db.count_observations(&DateFilter::default()).unwrap(), 2);
    }

    #[test]
    fn load_json_persisted_shape() {
        let db = Database::new().unwrap();
        let report = db
            .load_observations_json(
                r#"[
                {"timestamp": "2024-06-01T08:00:00Z",
                 "location": {"type": "Point", "coordinates": [2.35, 48.85]},
                 "congestion": 40, "volume": 120, "speed": 35},
                {"timestamp": "2024-06-01T09:00:00Z",
                 "location": {"type": "Point", "coordinates": [2.35]},
                 "congestion": 40, "volume": 120, "speed": 35},
                {"timestamp": "2024-06-01T10:00:00Z",
                 "location": {"type": "Polygon", "coordinates": [2.35, 48.85]},
                 "congestion": 40, "volume": 120, "speed": 35},
                {"timestamp": "2024-06-01T11:00:00Z", "congestion": 40},
                {"timestamp": "2024-06-01T12:00:00Z",
                 "location": {"type": "Point", "coordinates": [2.36, 48.86]},
                 "congestion": 100, "volume": 0, "speed": 0}
            ]"#,
            )
            .unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped, 3);
    }

    #[test]
    fn load_json_requires_array() {
        let db = Database::new().unwrap();
        assert!(db.load_observations_json(r#"{"data": []}"#).is_err());
    }
}
