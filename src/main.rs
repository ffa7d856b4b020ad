//! PIR Motion Node - Main Entry Point
//!
//! Loads configuration, starts the node and runs until SIGINT/SIGTERM or a
//! fatal sensor error.

use clap::{Parser, Subcommand};
use pir_motion_node::config::{ConfigError, NodeConfig};
use pir_motion_node::error::NodeResult;
use pir_motion_node::node::MotionNode;
use pir_motion_node::observability::init_default_logging;
use pir_motion_node::sensor::GpioBackend;
use std::path::{Path, PathBuf};
use std::process;
use tokio::signal;
use tracing::{error, info};

/// Config files tried in order when `--config` is not given
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "motion.toml",
    "config/motion.toml",
    "/etc/pir-motion-node/motion.toml",
];

/// PIR motion sensor node publishing to MQTT
#[derive(Parser)]
#[command(name = "pir-motion-node")]
#[command(about = "Publishes PIR motion transitions to an MQTT broker")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "PIR_MOTION_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the motion node (default)
    Run,
    /// Validate configuration
    Config {
        /// Show the resolved configuration
        #[arg(long)]
        show: bool,
    },
}

#[cfg(feature = "rpi")]
fn gpio_backend() -> pir_motion_node::sensor::RppalGpio {
    pir_motion_node::sensor::RppalGpio
}

#[cfg(not(feature = "rpi"))]
fn gpio_backend() -> pir_motion_node::sensor::UnsupportedGpio {
    pir_motion_node::sensor::UnsupportedGpio
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    info!("Starting PIR motion node v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_motion_node(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: Option<&Path>) -> Result<NodeConfig, ConfigError> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return NodeConfig::load_from_file(path);
    }

    let (config, path) = NodeConfig::load_first_existing(&DEFAULT_CONFIG_PATHS)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

async fn run_motion_node(config: NodeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut node = MotionNode::new(config, gpio_backend())?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    let result = tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
            Ok(())
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
            Ok(())
        }
        result = start_and_run(&mut node) => result,
    };

    node.shutdown().await;

    if let Err(e) = &result {
        if e.is_hardware_failure() {
            error!("GPIO unavailable; run on a Raspberry Pi with a build using the `rpi` feature");
        }
    }
    Ok(result?)
}

async fn start_and_run<B: GpioBackend>(node: &mut MotionNode<B>) -> NodeResult<()> {
    node.start().await?;
    info!(topic = %node.topic(), "Motion node running");
    node.run().await
}

fn handle_config_command(
    config: &NodeConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!(topic = %config.topic()?, "Configuration validation complete");
    Ok(())
}
