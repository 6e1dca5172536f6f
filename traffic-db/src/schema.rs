//! SQL schema for the in-memory traffic store.
//!
//! The schema is applied as a single batch when the database is initialized.

/// Returns the full SQL schema as a single batch string.
///
/// - `observations` - one row per traffic sample. Timestamps are stored as
///   UTC epoch milliseconds so range filters compare numerically; `id`
///   preserves insertion order and breaks timestamp ties.
///
/// The persisted-shape invariants (congestion in [0, 100], non-negative
/// volume and speed) are enforced by CHECK constraints as well as by the
/// loaders.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS observations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp_ms INTEGER NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        congestion REAL NOT NULL CHECK (congestion >= 0 AND congestion <= 100),
        volume REAL NOT NULL CHECK (volume >= 0),
        speed REAL NOT NULL CHECK (speed >= 0)
    );
    CREATE INDEX IF NOT EXISTS idx_obs_timestamp ON observations(timestamp_ms, id);
    CREATE INDEX IF NOT EXISTS idx_obs_location ON observations(latitude, longitude);
    "#
}
