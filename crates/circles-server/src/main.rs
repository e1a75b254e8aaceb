//! # Circles relay
//!
//! Broadcast relay for the realtime circles demo.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings, then open http://127.0.0.1:8080/
//! circles-server
//!
//! # Run with custom config
//! circles-server --config /path/to/circles.toml
//!
//! # Run with environment variables
//! CIRCLES_PORT=8080 CIRCLES_HOST=0.0.0.0 circles-server
//! ```

use anyhow::Result;
use circles_server::{config::Config, handlers};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "circles-server", version, about = "Broadcast relay for the realtime circles demo")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circles_server=debug,circles_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    tracing::info!("Starting Circles relay on {}", config.bind_addr());

    handlers::run_server(config).await?;

    Ok(())
}
