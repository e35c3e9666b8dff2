//! Request timeout demonstration server.
//!
//! Serves the demonstration endpoints under a global timeout policy, with a
//! handful of routes carrying their own handler-level policies.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace ─▶ global timeout ─▶ router ─▶ [handler timeout] ─▶ handler
//!     ◀────────────── response, or the timeout response of whichever deadline applies
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_timeout::config::{load_config, validate_config, AppConfig, ConfigError};
use request_timeout::observability::{logging, metrics};
use request_timeout::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "request-timeout", version, about = "Request timeout demonstration server")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override timeouts.timeout_seconds
    #[arg(short, long)]
    timeout: Option<f64>,
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeouts.timeout_seconds = timeout;
    }

    // Overrides bypass the loader's validation.
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init(&config.observability);
    tracing::info!("request-timeout v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        timeout_seconds = config.timeouts.timeout_seconds,
        status_code = config.timeouts.status_code,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
