//! StakeIBC Controller CLI
//!
//! Runs the API server or performs one-off operator commands against the
//! configured store. Configuration comes from the environment (`.env` is
//! honoured); see `ControllerConfig::from_env`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use stakeibc::common::init_from_config;
use stakeibc::{start_server, App, ControllerConfig, RegisterHostZoneMsg};

#[derive(Parser)]
#[command(name = "stakeibc")]
#[command(about = "Host zone registration and epoch unbonding ledger controller")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Listen port (overrides STAKEIBC_API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Open a new epoch unbonding record
    StartEpoch {
        #[arg(short, long)]
        epoch_id: u64,
    },

    /// Register a host zone
    RegisterZone {
        /// Admin address submitting the registration
        #[arg(long, env = "STAKEIBC_CREATOR")]
        creator: String,

        #[arg(long)]
        connection_id: String,

        #[arg(long)]
        bech32_prefix: String,

        #[arg(long)]
        ibc_denom: String,

        #[arg(long)]
        host_denom: String,

        #[arg(long, default_value = "channel-0")]
        transfer_channel_id: String,

        #[arg(long, default_value = "4")]
        unbonding_frequency: u64,
    },

    /// List registered host zones
    Zones,

    /// Write the current state as a genesis document
    ExportGenesis {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = ControllerConfig::from_env()?;
    init_from_config(&config)?;

    if config.database_path.is_none() && !matches!(cli.command, Commands::Serve { .. }) {
        tracing::warn!("STAKEIBC_DB_PATH not set, operating on an in-memory store");
    }

    match cli.command {
        Commands::Serve { port } => run_server(config, port).await?,
        Commands::StartEpoch { epoch_id } => {
            let app = App::from_config(config).await?;
            let record = app.start_epoch(epoch_id).await?;
            println!("Started epoch {}", record.id);
        }
        Commands::RegisterZone {
            creator,
            connection_id,
            bech32_prefix,
            ibc_denom,
            host_denom,
            transfer_channel_id,
            unbonding_frequency,
        } => {
            if config.relayer_url.is_none() {
                return Err("register-zone needs STAKEIBC_ICA_RELAYER_URL; \
                    without a relayer, register through the API server"
                    .into());
            }
            let app = App::from_config(config).await?;
            let response = app
                .orchestrator()
                .register_host_zone(RegisterHostZoneMsg {
                    creator,
                    connection_id,
                    bech32_prefix,
                    ibc_denom,
                    host_denom,
                    transfer_channel_id,
                    unbonding_frequency,
                })
                .await?;
            println!(
                "Registered {} over {}",
                response.chain_id, response.connection_id
            );
        }
        Commands::Zones => {
            let app = App::from_config(config).await?;
            for zone in app.registry().all_zones().await? {
                let pending = zone.pending_roles();
                println!(
                    "{}  {}  {}  accounts pending: {}",
                    zone.chain_id,
                    zone.connection_id,
                    zone.host_denom,
                    pending.len()
                );
            }
        }
        Commands::ExportGenesis { out } => {
            let app = App::from_config(config).await?;
            let state = app.export_genesis().await?;
            match out {
                Some(path) => {
                    state.save(&path)?;
                    println!("Genesis written to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&state)?),
            }
        }
    }

    Ok(())
}

/// Run the API server
async fn run_server(
    mut config: ControllerConfig,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port {
        config.api_port = port;
    }
    config.print_summary();

    if config.uses_default_admins() {
        tracing::warn!("running with the default admin allow-list");
    }

    let port = config.api_port;
    let app = Arc::new(App::from_config(config).await?);

    tracing::info!(port, "Starting StakeIBC controller");
    start_server(app, port).await?;

    Ok(())
}
