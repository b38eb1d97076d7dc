//! Mediator Server - standalone binary for the audio-stream transcription
//! mediator.
//!
//! Thin composition: CLI parsing, config loading, logging init, signal
//! handling. The process exit code for a clean drain or a fatal provider
//! error is requested by the core library itself, via `ProcessLifecycle`,
//! once the session orchestrator reaches `Terminated` (§6.6); this binary
//! only needs to exit non-zero itself for errors that happen before a
//! session exists at all (configuration, bind failure).

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mediator_core::{bootstrap, start_server};
use tokio::signal;

use crate::config::ServerConfig;

/// Real-time audio-stream transcription mediator.
#[derive(Parser, Debug)]
#[command(name = "mediator-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "MEDIATOR_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "MEDIATOR_PORT")]
    port: Option<u16>,

    /// Provider adapter id (overrides config file).
    #[arg(long, env = "MEDIATOR_PROVIDER_ID")]
    provider_id: Option<String>,

    /// Provider API key (overrides config file).
    #[arg(long, env = "MEDIATOR_PROVIDER_API_KEY")]
    provider_api_key: Option<String>,

    /// Directory for persisted transcripts and recordings (overrides config file).
    #[arg(short = 'd', long, env = "MEDIATOR_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Mediator Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(provider_id) = args.provider_id {
        config.provider_id = provider_id;
    }
    if let Some(provider_api_key) = args.provider_api_key {
        config.provider_api_key = Some(provider_api_key);
    }
    if let Some(data_dir) = args.data_dir {
        config.transcript_dir = data_dir.join("transcripts");
        if config.recording_enabled {
            config.recording_dir = Some(data_dir.join("recordings"));
        }
    }

    log::info!(
        "Configuration: host={}, port={}, mode={:?}, provider_id={}",
        config.host,
        config.port,
        config.mode,
        config.provider_id
    );

    let bootstrap_config = config.to_bootstrap_config();
    let services = bootstrap(bootstrap_config).context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let orchestrator = services.orchestrator.clone();
    let addr = services.addr;
    let app_state = services.app_state.clone();

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(addr, app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    log::info!("HTTP/WS server started on {}", addr);

    shutdown_signal().await;
    log::info!("Shutdown signal received, draining session...");

    orchestrator.handle_external_interrupt();
    services.shutdown().await;

    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
