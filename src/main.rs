//! Session server.
//!
//! Serves `/health`, `/echo` (raw body reader) and `/logout` (user cookie
//! clearer) on top of Axum.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use session_server::config::{load_config, validate_config, ConfigError, ServerConfig};
use session_server::observability::{logging, metrics};
use session_server::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "session-server")]
#[command(about = "HTTP server with body reading and sign-out cookie helpers", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability)?;

    let server = HttpServer::new(config);
    let config = server.config();

    tracing::info!(
        config_file = ?cli.config,
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.limits.max_body_bytes,
        request_timeout_secs = config.limits.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
