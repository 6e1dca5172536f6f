//! In-memory SQLite store for traffic observations.
//!
//! This crate loads traffic records (JSON in the persisted GeoJSON shape, or
//! CSV) into an in-memory SQLite database and exposes the paged, time-range
//! and bounding-box queries the traffic aggregator needs, both as typed
//! methods and through the [`TrafficStore`](traffic_core::service::TrafficStore)
//! trait.
//!
//! # Usage
//!
//! ```rust
//! use traffic_db::Database;
//! use traffic_core::observation::{DateFilter, SortOrder};
//!
//! let db = Database::new().unwrap();
//! db.load_observations_csv("2024-06-01T08:00:00Z,2.35,48.85,40,120,35\n").unwrap();
//!
//! let total = db.count_observations(&DateFilter::default()).unwrap();
//! let page = db.query_observations(&DateFilter::default(), SortOrder::Ascending, 0, 10).unwrap();
//! assert_eq!(total, 1);
//! assert_eq!(page.len(), 1);
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.

pub mod schema;
mod loader;
mod queries;
pub mod models;

use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory SQLite database of traffic observations.
///
/// Cheaply cloneable (via `Arc`); clones share one connection, so the store
/// can be handed to concurrent orchestration tasks.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create a new in-memory database with the full schema applied.
    ///
    /// The database is empty after creation; use the `load_*` methods
    /// to populate it.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("traffic store connection lock poisoned"))
    }
}
