//! Development front door (binary entry point).

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use front_door::config::{self, ConfigError, FrontDoorConfig};
use front_door::http::HttpServer;
use front_door::lifecycle::{signals, Shutdown};
use front_door::observability::logging;

#[derive(Parser)]
#[command(name = "front-door")]
#[command(about = "Host-routing front door for local development", long_about = None)]
struct Cli {
    /// Address to listen on (overrides the config file)
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("front_door=debug,tower_http=debug");

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => {
            // Defaults describe the local dev topology; they still have to
            // pass the same startup checks as a config file.
            let config = FrontDoorConfig::default();
            config::validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };
    if let Some(addr) = cli.addr {
        config.listener.bind_address = addr;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::listen(shutdown.clone()));

    let server = HttpServer::new(config).map_err(ConfigError::Validation)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
