//! TICS monitor - Main Entry Point
//!
//! Subscribes to the smoke sensor and bracelet telemetry, raises alerts, and
//! prints every status change to the console.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tics_monitor::config::MonitorConfig;
use tics_monitor::monitor::Monitor;
use tics_monitor::notify::LogNotifier;
use tics_monitor::observability::{init_default_logging, init_logging, LoggingSettings};
use tics_monitor::protocol::messages::{StatusSnapshot, StatusView};
use tics_monitor::telemetry::{ChannelObserver, DistanceEstimator, ReconciliationEngine};
use tics_monitor::transport::mqtt::MqttClient;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, Level};

/// Snapshots buffered for the console before new ones are dropped
const CONSOLE_QUEUE_CAPACITY: usize = 32;

/// Smoke and bracelet proximity monitor over MQTT
#[derive(Parser)]
#[command(name = "tics-monitor")]
#[command(about = "Smoke alarm and bracelet proximity monitor over MQTT")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Broker URL, overrides the configuration file
    #[arg(long, env = "TICS_BROKER_URL")]
    broker: Option<String>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor until SIGINT or SIGTERM
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_observability(cli.verbose);

    info!("Starting TICS monitor v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config, cli.broker.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_monitor(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn init_observability(verbose: u8) {
    if verbose == 0 {
        init_default_logging();
        return;
    }

    let settings = LoggingSettings::from_env();
    let level = if verbose == 1 {
        Level::DEBUG
    } else {
        Level::TRACE
    };
    init_logging(level, settings.format, settings.include_spans);
}

fn load_configuration(
    config_path: &Option<PathBuf>,
    broker_override: Option<&str>,
) -> Result<MonitorConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            MonitorConfig::load_from_file(path)?
        }
        None => {
            let default_paths = ["tics.toml", "config/tics.toml"];

            match default_paths
                .iter()
                .map(PathBuf::from)
                .find(|path| path.exists())
            {
                Some(path) => {
                    info!("Loading configuration from: {}", path.display());
                    MonitorConfig::load_from_file(&path)?
                }
                None => {
                    info!("No configuration file found, using built-in defaults");
                    MonitorConfig::default()
                }
            }
        }
    };

    if let Some(broker_url) = broker_override {
        config.mqtt.broker_url = broker_url.to_string();
        config.validate()?;
    }

    Ok(config)
}

async fn run_monitor(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(device_id = %config.device.id, broker_url = %config.mqtt.broker_url, "Monitor starting");

    let mut monitor = build_monitor(&config)?;

    let (observer, snapshots) = ChannelObserver::channel(CONSOLE_QUEUE_CAPACITY);
    monitor.register_observer(Box::new(observer));
    let console = tokio::spawn(print_status(snapshots, config.distance.estimator()));

    monitor.start().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatch = tokio::spawn(async move { monitor.run(shutdown_rx).await });

    wait_for_shutdown_signal().await?;

    info!("Application shutdown initiated");
    let _ = shutdown_tx.send(true);

    let result = dispatch.await?;
    console.abort();
    result?;
    Ok(())
}

/// Bootstrap: build the monitor with its injected dependencies
fn build_monitor(
    config: &MonitorConfig,
) -> Result<Monitor<MqttClient>, Box<dyn std::error::Error>> {
    let notifier = LogNotifier::new(config.notifications.permission_granted);
    let engine = ReconciliationEngine::new(config, Box::new(notifier));
    let transport = MqttClient::new(&config.mqtt, engine.subscription_topics())?;
    info!(client_id = %transport.client_id(), "MQTT client created");

    Ok(Monitor::new(transport, engine))
}

/// Console observer: folds every snapshot into a view and prints it
async fn print_status(mut snapshots: mpsc::Receiver<StatusSnapshot>, estimator: DistanceEstimator) {
    let mut view = StatusView::default();

    while let Some(snapshot) = snapshots.recv().await {
        let event = snapshot.to_event();
        view.apply(&event, &estimator);

        match event.to_json() {
            Ok(json) => debug!(event = %json, "Status event"),
            Err(e) => debug!(error = %e, "Could not serialize status event"),
        }

        println!(
            "smoke: {:<5}  gas: {:<5}  bracelet: {:<12}  distance: {:.2} m",
            view.smoke_alert,
            view.gas_alert,
            if view.bracelet_connected {
                "connected"
            } else {
                "disconnected"
            },
            view.distance_m
        );
    }
}

async fn wait_for_shutdown_signal() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
    }

    Ok(())
}

fn handle_config_command(
    config: &MonitorConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
