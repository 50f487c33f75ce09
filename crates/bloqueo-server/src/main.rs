//! bloqueo-server – entry point.
//!
//! Startup order:
//! 1. Load `.env`, parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON or human-readable).
//! 3. Open the blob container and wire the orchestrator.
//! 4. Run the requested command: serve HTTP (default), release the lock,
//!    or sweep the final-status cache once.

mod config;
mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use bloqueo_core::impls::{InMemoryBlobStore, LocalBlobStore};
use bloqueo_core::ports::BlobStore;
use bloqueo_core::{App, AppBuilder};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::{Config, StorageKind};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "bloqueo-server")]
#[command(about = "Firewall block/unblock task orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Delete the final-status cache lock blob, e.g. after a crash left it behind
    ReleaseLock,
    /// Drop expired final-status cache entries once and exit
    SweepCache,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("WARN: failed to load .env file ({e})");
        }
    }
    let cli = Cli::parse();
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);
    info!(version = env!("CARGO_PKG_VERSION"), "bloqueo-server starting");

    // ── 3. Storage + core ──────────────────────────────────────────────────────
    let blobs = open_blobs(&cfg);
    let mut builder = AppBuilder::new(blobs);
    if let Some(lease) = cfg.lock_lease {
        builder = builder.lock_lease(lease);
    }
    let app = builder.build().await?;

    // ── 4. Command ─────────────────────────────────────────────────────────────
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg, app).await?,
        Command::ReleaseLock => {
            let lock = app.orchestrator.cache().lock();
            lock.release().await;
            info!(lock = lock.name(), "lock released");
        }
        Command::SweepCache => {
            let removed = app.orchestrator.sweep_final_cache().await?;
            info!(removed, "final-status cache swept");
        }
    }
    Ok(())
}

fn init_tracing(cfg: &Config) {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: BLOQUEO_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn open_blobs(cfg: &Config) -> Arc<dyn BlobStore> {
    match cfg.storage {
        StorageKind::Local => {
            info!(dir = %cfg.container_dir, "using local blob container");
            Arc::new(LocalBlobStore::new(&cfg.container_dir))
        }
        StorageKind::Memory => {
            warn!("using in-memory blob store; tasks are lost on exit");
            Arc::new(InMemoryBlobStore::new())
        }
    }
}

async fn serve(cfg: Config, app: App) -> anyhow::Result<()> {
    let sweeper = cfg.sweep_interval.map(|every| {
        info!(every_secs = every.as_secs(), "final-status cache sweep enabled");
        tokio::spawn(app.sweep_loop(every).run())
    });

    let addr: SocketAddr = cfg.bind_address.parse()?;
    let state = Arc::new(AppState {
        config: Arc::new(cfg),
        orchestrator: Arc::clone(&app.orchestrator),
    });
    let router = routes::build(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("bloqueo-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
