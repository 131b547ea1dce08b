//! stagefront-kv - Persistent Store proxy for the Stagefront band site
//!
//! Serves the single site-data record over `GET/PUT /api/data`. The sync
//! secret comes from the environment; without it the PUT path is closed.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use stagefront_common::config::{default_data_dir, load_config, SYNC_SECRET_ENV};
use stagefront_kv::kv::{FileKv, KvBinding, MemoryKv};
use stagefront_kv::{build_router, AppState, RECORD_ROUTE};
use tokio::signal;
use tracing::{info, warn};

/// Which KV binding backs the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BindingKind {
    /// Files under the data directory
    File,
    /// In-process map, lost on restart
    Memory,
    /// No binding attached; every record request fails with 500
    None,
}

/// Command-line arguments for stagefront-kv
#[derive(Parser, Debug)]
#[command(name = "stagefront-kv")]
#[command(about = "KV store proxy for the Stagefront band site")]
#[command(version)]
struct Args {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(short, long, env = "STAGEFRONT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "STAGEFRONT_KV_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "STAGEFRONT_KV_PORT")]
    port: Option<u16>,

    /// Directory for the file binding
    #[arg(long, env = "STAGEFRONT_KV_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Key of the served record
    #[arg(long, env = "STAGEFRONT_KV_RECORD_KEY")]
    record_key: Option<String>,

    /// Shared secret required in the x-auth-key header for PUT
    #[arg(long, env = SYNC_SECRET_ENV, hide_env_values = true)]
    sync_secret: Option<String>,

    /// KV binding to attach
    #[arg(long, value_enum, default_value_t = BindingKind::File)]
    binding: BindingKind,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .init();

    info!(
        "Starting stagefront-kv v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let store = config.store;
    let bind = args.bind.unwrap_or(store.bind);
    let port = args.port.unwrap_or(store.port);
    let record_key = args.record_key.unwrap_or(store.record_key);

    let kv: Option<Arc<dyn KvBinding>> = match args.binding {
        BindingKind::File => {
            let dir = args
                .data_dir
                .or(store.data_dir)
                .unwrap_or_else(|| default_data_dir().join("kv"));
            info!("KV binding: files under {}", dir.display());
            Some(Arc::new(FileKv::new(dir)))
        }
        BindingKind::Memory => {
            warn!("KV binding: in-memory, data is lost on restart");
            Some(Arc::new(MemoryKv::new()))
        }
        BindingKind::None => {
            warn!("No KV binding attached; record requests will fail");
            None
        }
    };

    if args.sync_secret.as_deref().map_or(true, str::is_empty) {
        warn!("{} not set; PUT {} is disabled", SYNC_SECRET_ENV, RECORD_ROUTE);
    } else {
        info!("✓ Sync secret configured; PUT {} enabled", RECORD_ROUTE);
    }

    let state = AppState::new(kv, record_key, args.sync_secret)
        .with_max_body_bytes(store.max_body_bytes);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("stagefront-kv listening on http://{}{}", addr, RECORD_ROUTE);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
