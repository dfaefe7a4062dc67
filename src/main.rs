use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber;

use palisade::config::PalisadeConfig;
use palisade::http::HttpServer;
use palisade::ratelimit::RateLimiter;

#[derive(Parser, Debug)]
#[command(name = "palisade", version, about = "Admission control for conversational-agent APIs")]
struct Args {
    /// Path to a YAML configuration file (defaults are used if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Palisade Admission Control Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => PalisadeConfig::from_file(path)?,
        None => PalisadeConfig::default(),
    };
    config.rate_limiting.validate()?;
    info!(
        http_addr = %config.server.http_addr,
        max_requests_per_minute = config.rate_limiting.max_requests_per_minute,
        max_requests_per_hour = config.rate_limiting.max_requests_per_hour,
        "Configuration loaded"
    );

    // Initialize the rate limiter
    let limiter = Arc::new(RateLimiter::new(config.rate_limiting.clone()));
    info!("Rate limiter initialized");

    // Create and start the HTTP server
    let server = HttpServer::new(config.server.http_addr, limiter);

    info!("Starting HTTP server on {}", config.server.http_addr);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Palisade Admission Control Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
