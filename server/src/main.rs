// server/src/main.rs

// Entry point for the hospital management server. Parses the command line and
// hands off to the CLI dispatcher.

use anyhow::Result;
use hms_server::cli::start_cli;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real deployments set HMS__* variables directly.
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    start_cli().await
}
