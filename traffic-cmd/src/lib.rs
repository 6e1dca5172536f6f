//! Command implementations for the traffic CLI.
//!
//! Every command prints its result as pretty JSON on stdout; progress and
//! diagnostics go through `log`.

use clap::Subcommand;

pub mod plan;
pub mod services;
pub mod traffic;

pub use services::ServiceArgs;

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a place name to ranked candidate coordinates
    Geocode {
        query: String,

        /// Maximum number of candidates
        #[arg(short = 'n', long, default_value_t = 5)]
        size: usize,
    },

    /// Fetch the route between two place names
    Route { from: String, to: String },

    /// Plan a route with traffic conditions and a volume prediction
    Plan {
        from: String,
        to: String,

        /// Departure time, e.g. 2024-06-14T14:30:00 (default: now)
        #[arg(short = 'd', long)]
        departure: Option<String>,

        /// Traffic records (.json or headerless .csv) for the route summary
        #[arg(short = 'r', long)]
        records: Option<String>,

        /// Observations farther than this from the route are ignored
        #[arg(long, default_value_t = traffic_pipeline::config::DEFAULT_CORRIDOR_METERS)]
        corridor_meters: f64,
    },

    /// Request a traffic volume prediction
    Predict {
        #[arg(long)]
        hour: String,
        #[arg(long)]
        month: String,
        #[arg(long, allow_hyphen_values = true)]
        longitude: String,
        #[arg(long, allow_hyphen_values = true)]
        latitude: String,
    },

    /// Page through traffic records, from a local file or the traffic API
    Traffic {
        /// Traffic records (.json or headerless .csv)
        #[arg(short = 'r', long, conflicts_with = "remote", required_unless_present = "remote")]
        records: Option<String>,

        /// Query the traffic API instead of a local file
        #[arg(long)]
        remote: bool,

        #[arg(short = 'p', long, default_value_t = 1, allow_hyphen_values = true)]
        page: i64,

        #[arg(short = 'l', long, default_value_t = 10, allow_hyphen_values = true)]
        limit: i64,

        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,

        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,

        /// Newest first
        #[arg(long)]
        descending: bool,
    },

    /// Mean traffic conditions inside a bounding box
    Summarize {
        #[arg(short = 'r', long)]
        records: String,
        #[arg(long, allow_hyphen_values = true)]
        min_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        min_lng: f64,
        #[arg(long, allow_hyphen_values = true)]
        max_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        max_lng: f64,
    },

    /// Observation count and time span of a records file
    Stats {
        #[arg(short = 'r', long)]
        records: String,
    },
}

pub async fn run(services: ServiceArgs, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Geocode { query, size } => plan::run_geocode(&services, &query, size).await,
        Command::Route { from, to } => plan::run_route(&services, &from, &to).await,
        Command::Plan {
            from,
            to,
            departure,
            records,
            corridor_meters,
        } => {
            plan::run_plan(
                &services,
                &from,
                &to,
                departure.as_deref(),
                records.as_deref(),
                corridor_meters,
            )
            .await
        }
        Command::Predict {
            hour,
            month,
            longitude,
            latitude,
        } => plan::run_predict(&services, &hour, &month, &longitude, &latitude).await,
        Command::Traffic {
            records,
            remote,
            page,
            limit,
            start_date,
            end_date,
            descending,
        } => {
            let query = traffic::PageQuery::parse(
                page,
                limit,
                start_date.as_deref(),
                end_date.as_deref(),
                descending,
            )?;
            match records {
                Some(path) if !remote => traffic::run_local_page(&path, &query).await,
                _ => traffic::run_remote_page(&services, &query).await,
            }
        }
        Command::Summarize {
            records,
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        } => traffic::run_summarize(&records, (min_lat, min_lng), (max_lat, max_lng)).await,
        Command::Stats { records } => traffic::run_stats(&records),
    }
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
