//! json-relay binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌──────────────────────────────────────────────┐
//!     ────────────────────┼─▶ http server ─▶ rule mount ─▶ Forwarder ───┼──▶ Backend
//!                         │                                  │          │
//!     Client Response     │                                  ▼          │
//!     ◀───────────────────┼──────────────────────────── RelayBody ◀─────┼─── (stream)
//!                         │                                             │
//!                         │  config · observability · lifecycle         │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use json_relay::config::{load_config, ProxyConfig};
use json_relay::observability::{logging::init_tracing, metrics::init_metrics};
use json_relay::{HttpServer, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "json-relay", version, about = "Streaming JSON request relay")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "JSON_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let config = ProxyConfig::default();
            json_relay::config::validate_config(&config)
                .map_err(json_relay::config::ConfigError::Validation)?;
            config
        }
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_tracing(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "json-relay starting");

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        rules = config.rules.len(),
        "Configuration loaded"
    );

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config)?;

    let signals = Arc::clone(&shutdown);
    tokio::spawn(async move { signals.trigger_on_signal().await });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
