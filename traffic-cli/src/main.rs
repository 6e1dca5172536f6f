//! traffic-cli - routes, traffic conditions and volume predictions from the
//! command line.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "traffic-cli",
    version,
    about = "Route planning with traffic-aware volume predictions"
)]
struct Cli {
    #[command(flatten)]
    services: traffic_cmd::ServiceArgs,

    #[command(subcommand)]
    command: traffic_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    traffic_cmd::run(cli.services, cli.command).await
}
