//! Docket server binary.

use anyhow::{Context, Result};
use clap::Parser;
use docket_core::config::AppConfig;
use docket_server::{AppState, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Docket - A task management service
#[derive(Parser, Debug)]
#[command(name = "docketd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DOCKET_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Docket v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. The file is optional; DOCKET_ env vars can provide
    // or override everything.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}, using defaults and env", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("DOCKET_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize the store (applies migrations and validates reclaim config)
    let store = docket_store::from_config(&config.store, &config.reclaim)
        .await
        .context("failed to initialize store")?;
    tracing::info!(
        reclaim_queue_capacity = config.reclaim.queue_capacity,
        "Store initialized"
    );

    // Verify connectivity before accepting requests.
    store
        .health_check()
        .await
        .context("store health check failed")?;

    // Sweep sessions that expired while the server was down.
    let swept = store
        .delete_expired_sessions(OffsetDateTime::now_utc())
        .await
        .context("failed to sweep expired sessions")?;
    if swept > 0 {
        tracing::info!(swept, "Removed expired sessions");
    }

    let state = AppState::new(config.clone(), store);
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives, letting in-flight requests finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
