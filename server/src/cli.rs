// server/src/cli.rs
// Command line for the hospital management server: `start` serves the REST API,
// `bootstrap` only makes sure the initial admin account exists.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib::config::{AppConfig, StorageEngineType};
use lib::services::{ensure_admin, Services};
use lib::storage_engine::create_storage;
use log::{error, info};
use rest_api::{start_server, AppState};
use security::{CredentialService, TokenService};
use tokio::sync::oneshot;

#[derive(Parser, Debug)]
#[command(name = "hms-server")]
#[command(version)]
#[command(about = "Hospital management backend: staff, patients, appointments and clinical notes")]
pub struct CliArgs {
    /// YAML or TOML configuration file (defaults to config/hms.yaml when present)
    #[arg(short = 'c', long = "config", value_name = "FILE", env = "HMS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<HmsCommands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum HmsCommands {
    /// Serve the REST API until interrupted
    Start {
        #[arg(short = 'p', long = "port", value_name = "PORT")]
        port: Option<u16>,
        #[arg(long = "host", value_name = "HOST")]
        host: Option<String>,
        #[arg(short = 'e', long = "engine", value_name = "ENGINE")]
        engine: Option<StorageEngineType>,
        #[arg(short = 'd', long = "data-dir", value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
    /// Create the initial admin account if it is missing, then exit
    Bootstrap,
}

impl Default for HmsCommands {
    fn default() -> Self {
        HmsCommands::Start { port: None, host: None, engine: None, data_dir: None }
    }
}

pub async fn start_cli() -> Result<()> {
    let args = CliArgs::parse();
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command.unwrap_or_default() {
        HmsCommands::Start { port, host, engine, data_dir } => {
            apply_overrides(&mut config, port, host, engine, data_dir);
            run_server(config).await
        }
        HmsCommands::Bootstrap => {
            let services = Services::new(create_storage(&config.storage)?);
            let admin = ensure_admin(&services.staff, &config.bootstrap).await?;
            println!("Admin account ready: {} ({})", admin.email, admin.employee_id);
            Ok(())
        }
    }
}

/// Command line flags win over file and environment settings.
pub fn apply_overrides(
    config: &mut AppConfig,
    port: Option<u16>,
    host: Option<String>,
    engine: Option<StorageEngineType>,
    data_dir: Option<PathBuf>,
) {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(engine) = engine {
        config.storage.engine = engine;
    }
    if let Some(dir) = data_dir {
        config.storage.data_directory = dir;
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    info!(
        "Starting hms-server on {}:{} with {} storage",
        config.server.host, config.server.port, config.storage.engine
    );
    let repos = create_storage(&config.storage)?;
    let services = Services::new(repos);
    ensure_admin(&services.staff, &config.bootstrap)
        .await
        .context("Failed to bootstrap the admin account")?;

    let tokens = TokenService::from_config(&config.auth);
    let credentials = CredentialService::new(services.staff.clone(), tokens);
    let state = AppState::new(services, credentials);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    start_server(&config.server, state, shutdown_rx).await
}
