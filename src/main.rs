//! Development HTTP server.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────┐
//!                   │                    DEV SERVER                    │
//!                   │                                                  │
//!   Client Request  │  ┌──────────┐    ┌──────────┐    ┌───────────┐   │
//!   ────────────────┼─▶│   net    │───▶│   http   │───▶│  handler  │   │
//!                   │  │ listener │    │  server  │    │ static/sse│   │
//!                   │  └──────────┘    └────┬─────┘    └─────┬─────┘   │
//!                   │                       │                │         │
//!                   │               ┌───────┴───────┐  ┌─────┴─────┐   │
//!                   │               │   lifecycle   │  │  pubsub   │   │
//!                   │               │ serve+shutdown│  │    bus    │   │
//!                   │               └───────────────┘  └───────────┘   │
//!                   │                                                  │
//!                   │   config · observability · signals               │
//!                   └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use dev_server::config::{self, ServerConfig};
use dev_server::lifecycle::startup;
use dev_server::observability::logging;

#[derive(Parser)]
#[command(name = "dev-server")]
#[command(about = "Development HTTP server with graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file.
    #[arg(short, long)]
    listen: Option<String>,

    /// Directory to serve, overriding the config file.
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Disable the live-reload event stream.
    #[arg(long)]
    no_live_reload: bool,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(dir) = self.dir {
            config.handler.root = dir;
        }
        if self.no_live_reload {
            config.handler.live_reload = false;
        }

        config::validate_config(&config).map_err(config::ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.logging)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        grace_period_secs = config.shutdown.grace_period_secs,
        "dev-server v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
