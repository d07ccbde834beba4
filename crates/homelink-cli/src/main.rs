//! Command-line interface for the HomeLink device backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use homelink_api::{create_router_with_state, ServerState};
use homelink_core::config::AppConfig;
use homelink_core::{DeviceStore, LogStore, RuleStore};
use homelink_devices::{CommandDispatcher, HubTransport};
use homelink_rules::{spawn_recurring, RuleEvaluator};
use homelink_storage::{MemoryStores, RedbStores};

/// HomeLink - IoT device backend.
#[derive(Parser, Debug)]
#[command(name = "homelink")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = "homelink.toml")]
    config: PathBuf,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server and rule scheduler.
    Serve {
        /// Bind address override, e.g. "0.0.0.0:9480".
        #[arg(long)]
        bind: Option<String>,
    },
    /// Parse the configuration and print the effective values.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_directive = if args.verbose { "homelink=debug" } else { "homelink=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();

    let config = load_config(&args.config)?;

    match args.command {
        Command::Serve { bind } => run_server(config, bind).await,
        Command::CheckConfig => check_config(config),
    }
}

/// Load configuration, falling back to defaults when the file is absent.
fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    AppConfig::from_toml(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn check_config(config: AppConfig) -> Result<()> {
    println!("server:    {}:{}", config.server.host, config.server.port);
    println!("storage:   {} ({})", config.storage.backend, config.storage.path);
    println!(
        "transport: {}",
        if config.transport.effective_connection_string().is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    println!(
        "scheduler: time={}s sensor={}s snapshot={}s",
        config.scheduler.time_rules_secs,
        config.scheduler.sensor_rules_secs,
        config.scheduler.snapshot_secs,
    );
    Ok(())
}

/// Store handles shared by the server and the scheduler.
struct Stores {
    devices: Arc<dyn DeviceStore>,
    rules: Arc<dyn RuleStore>,
    logs: Arc<dyn LogStore>,
}

fn open_stores(config: &AppConfig) -> Result<Stores> {
    match config.storage.backend.as_str() {
        "memory" => {
            let stores = Arc::new(MemoryStores::new());
            Ok(Stores {
                devices: stores.clone(),
                rules: stores.clone(),
                logs: stores,
            })
        }
        "redb" => {
            let stores = Arc::new(
                RedbStores::open(&config.storage.path)
                    .with_context(|| format!("failed to open {}", config.storage.path))?,
            );
            Ok(Stores {
                devices: stores.clone(),
                rules: stores.clone(),
                logs: stores,
            })
        }
        other => anyhow::bail!("unknown storage backend: {other}"),
    }
}

async fn run_server(config: AppConfig, bind: Option<String>) -> Result<()> {
    let stores = open_stores(&config)?;

    let connection_string = config.transport.effective_connection_string();
    let transport = Arc::new(HubTransport::new(connection_string.as_deref()));
    let dispatcher = Arc::new(CommandDispatcher::new(transport));

    let evaluator = Arc::new(RuleEvaluator::new(
        stores.devices.clone(),
        stores.rules.clone(),
        stores.logs.clone(),
        dispatcher.clone(),
    ));
    let jobs = start_scheduler(&config, evaluator);

    let state = ServerState::new(
        stores.devices,
        stores.rules,
        stores.logs,
        dispatcher,
    );
    let app = create_router_with_state(state);

    let bind = bind.unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(%bind, "homelink listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for job in &jobs {
        job.stop();
    }
    tracing::info!("shutdown complete");
    Ok(())
}

/// Spawn the three rule sweeps on their configured cadences.
fn start_scheduler(
    config: &AppConfig,
    evaluator: Arc<RuleEvaluator>,
) -> Vec<homelink_rules::JobHandle> {
    let time_evaluator = evaluator.clone();
    let time_job = spawn_recurring(
        "time_rules",
        Duration::from_secs(config.scheduler.time_rules_secs),
        move || {
            let evaluator = time_evaluator.clone();
            async move {
                match evaluator.run_time_rules(chrono::Utc::now()).await {
                    Ok(fired) if !fired.is_empty() => {
                        tracing::info!(count = fired.len(), "time rules fired")
                    }
                    Ok(_) => {}
                    Err(error) => tracing::error!(%error, "time rule sweep failed"),
                }
            }
        },
    );

    let sensor_evaluator = evaluator.clone();
    let sensor_job = spawn_recurring(
        "sensor_rules",
        Duration::from_secs(config.scheduler.sensor_rules_secs),
        move || {
            let evaluator = sensor_evaluator.clone();
            async move {
                match evaluator.run_sensor_rules().await {
                    Ok(fired) if !fired.is_empty() => {
                        tracing::info!(count = fired.len(), "sensor rules fired")
                    }
                    Ok(_) => {}
                    Err(error) => tracing::error!(%error, "sensor rule sweep failed"),
                }
            }
        },
    );

    let snapshot_job = spawn_recurring(
        "sensor_snapshot",
        Duration::from_secs(config.scheduler.snapshot_secs),
        move || {
            let evaluator = evaluator.clone();
            async move {
                match evaluator.snapshot_sensors().await {
                    Ok(count) => tracing::debug!(count, "sensor snapshot complete"),
                    Err(error) => tracing::error!(%error, "sensor snapshot failed"),
                }
            }
        },
    );

    vec![time_job, sensor_job, snapshot_job]
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for ctrl-c");
    }
}
