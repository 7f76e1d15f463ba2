//! # Shelf Server
//!
//! Main binary: loads configuration, initializes tracing, opens the storage
//! root and serves it over TCP or a Unix domain socket.

use anyhow::{bail, Context};
use clap::Parser;
use shelf_api::{build_router, AppState};
use shelf_common::config::{AppConfig, LogFormat};
use shelf_fs::{AttributeNames, StorageRoot};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "shelf", version, about = "Metadata-aware static file gateway")]
struct Cli {
    /// Config file to read instead of `./config.{toml,yaml,json}`.
    #[arg(short, long, env = "SHELF_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = shelf_common::config::load_with(cli.config.as_deref())?;

    // Initialize tracing (structured logging)
    init_tracing(config.log.format);

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if let Some(workers) = config.server.workers {
        if workers == 0 {
            bail!("server.workers must be at least 1");
        }
        runtime.worker_threads(workers);
    }
    runtime.build()?.block_on(run(config))
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shelf=info,tower_http=info".into());

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Shelf v{}", env!("CARGO_PKG_VERSION"));

    let root = StorageRoot::open(&config.storage.root)
        .with_context(|| format!("storage root {} is not usable", config.storage.root))?;
    tracing::info!(root = %root.path().display(), xattr_prefix = %config.storage.xattr_prefix, "Storage root ready");

    let mut state = AppState::new(root, AttributeNames::with_prefix(&config.storage.xattr_prefix));
    let health_path = config.server.health_path.trim();
    if !health_path.is_empty() {
        if !health_path.starts_with('/') {
            bail!("server.health_path must start with '/', got {health_path:?}");
        }
        state = state.with_health_path(health_path);
    }
    let app = build_router(state);

    match &config.server.socket_path {
        Some(socket_path) => {
            // A socket file left behind by a previous run blocks the bind.
            match std::fs::remove_file(socket_path) {
                Ok(()) => tracing::debug!(socket_path, "Removed stale socket"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("cannot replace socket {socket_path}"));
                }
            }
            let listener = tokio::net::UnixListener::bind(socket_path)
                .with_context(|| format!("cannot bind unix socket {socket_path}"))?;
            tracing::info!("📡 Listening on unix:{socket_path}");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        None => {
            let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("cannot bind {addr}"))?;
            tracing::info!("📡 Listening on http://{addr}");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. In-flight responses are allowed to finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received termination signal, shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_accepts_config_path() {
        let cli = Cli::parse_from(["shelf", "--config", "/etc/shelf/config.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/shelf/config.toml")));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
