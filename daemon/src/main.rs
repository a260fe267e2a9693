//! worldkeeperd - Worldkeeper service host
//!
//! Hosts the durable scheduler, the idle and dead-engine sweeps and the
//! in-process simulation core over one sled database:
//! - `run` (default): serve until ctrl-c, answering control requests on
//!   `--listen`
//! - every other command is a control request: sent to the running daemon,
//!   or run directly against the store when no daemon answers

mod control;
mod service;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use control::{ControlRequest, ControlResponse, DEFAULT_LISTEN};
use service::ServeOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use worldkeeper_core::{NullCore, SimulationCore, Store, WorldConfig, WorldKeeper};
use worldkeeper_env::TokioContext;
use worldkeeper_sim::SimEngine;

#[derive(Parser, Debug)]
#[command(name = "worldkeeperd")]
#[command(about = "Keeps observed worlds running", long_about = None)]
struct Args {
    /// sled database directory
    #[arg(long, default_value = "worldkeeper-data")]
    data_dir: PathBuf,

    /// JSON configuration file (missing fields take defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control socket address
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve until interrupted
    Run {
        /// Simulation core step period (ms)
        #[arg(long, default_value = "250", value_parser = clap::value_parser!(u64).range(1..))]
        tick_ms: u64,

        /// Period of the idle and dead-engine sweeps (s)
        #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
        sweep_secs: u64,

        /// Heartbeat the default world every N seconds, as if observed
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        keep_alive_secs: Option<u64>,
    },
    /// Print the lifecycle state of every world
    Status,
    /// Heartbeat the default world
    Heartbeat,
    /// Stop the default world until resumed
    Stop,
    /// Resume a developer-stopped default world
    Resume,
    /// Start the configured encounter in the default world
    Trigger,
    /// Join the default world as a human
    Join {
        token: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Leave the default world
    Leave { token: String },
    /// Submit a raw input, e.g. `send moveTo '{"playerId":1}'`
    Send {
        name: String,
        #[arg(default_value = "{}")]
        args: String,
    },
}

impl Command {
    fn into_request(self) -> Result<ControlRequest> {
        Ok(match self {
            Command::Run { .. } => anyhow::bail!("run is not a control request"),
            Command::Status => ControlRequest::Status,
            Command::Heartbeat => ControlRequest::Heartbeat,
            Command::Stop => ControlRequest::Stop,
            Command::Resume => ControlRequest::Resume,
            Command::Trigger => ControlRequest::Trigger,
            Command::Join { token, name } => ControlRequest::Join { token, name },
            Command::Leave { token } => ControlRequest::Leave { token },
            Command::Send { name, args } => ControlRequest::Send {
                name,
                args: serde_json::from_str(&args).context("input args must be JSON")?,
            },
        })
    }
}

fn load_config(args: &Args) -> Result<WorldConfig> {
    Ok(match &args.config {
        Some(path) => WorldConfig::from_json_file(path).with_context(|| format!("loading config {}", path.display()))?,
        None => WorldConfig::default(),
    })
}

fn open_store(args: &Args) -> Result<Store> {
    Store::open(&args.data_dir).with_context(|| format!("opening store {}", args.data_dir.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let command = args.command.take().unwrap_or(Command::Run {
        tick_ms: 250,
        sweep_secs: 60,
        keep_alive_secs: None,
    });

    match command {
        Command::Run {
            tick_ms,
            sweep_secs,
            keep_alive_secs,
        } => {
            let options = ServeOptions {
                tick: Duration::from_millis(tick_ms),
                sweep: Duration::from_secs(sweep_secs),
                keep_alive: keep_alive_secs.map(Duration::from_secs),
            };
            run(&args, options).await
        }
        command => {
            let request = command.into_request()?;
            let response = match control::request(args.listen.as_str(), &request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("No daemon at {} ({}); using the store directly", args.listen, e);
                    let keeper = WorldKeeper::new(
                        TokioContext::shared(),
                        open_store(&args)?,
                        load_config(&args)?,
                        Arc::new(NullCore),
                    );
                    let response = control::dispatch(&keeper, request);
                    keeper.store().flush()?;
                    response
                }
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            if let ControlResponse::Error { message } = response {
                anyhow::bail!(message);
            }
            Ok(())
        }
    }
}

async fn run(args: &Args, options: ServeOptions) -> Result<()> {
    let config = load_config(args)?;
    let store = open_store(args)?;
    let engine = Arc::new(SimEngine::new(config.roster.clone()));
    let core: Arc<dyn SimulationCore> = engine.clone();
    let keeper = WorldKeeper::new(TokioContext::shared(), store, config, core);

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("binding control socket {}", args.listen))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
        }
    };
    service::serve(&keeper, &engine, &options, Some(listener), shutdown).await?;
    info!("Store flushed");
    Ok(())
}
