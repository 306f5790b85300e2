//! # Rolegate HTTP Server
//!
//! Serves the access view for callers authenticated by the fronting proxy,
//! backed by the role cache and the App Configuration role store.
//!
//! ## Configuration
//!
//! Flags fall back to environment variables:
//! - `PORT` - HTTP server port (default: 8080)
//! - `ROLEGATE_CACHE_TTL` - Role cache TTL in seconds (default: 300)
//! - `AZURE_APPCONFIG_CONNECTION_STRING` / `AZURE_APPCONFIG_ENDPOINT` - Role store
//! - `RUST_LOG` - Log filter (overrides `--log-level`)

use anyhow::{Context, Result};
use axum::serve;
use clap::Parser;
use rolegate_appconfig::{ClientOptions, StoreSettings};
use rolegate_authz::http::{router, AppState};
use rolegate_authz::{CacheConfig, GateConfig, RoleCache, RoleResolver};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rolegate HTTP server
#[derive(Parser)]
#[command(name = "rolegate-server")]
#[command(about = "Role-gated access view backed by Azure App Configuration")]
#[command(version)]
struct Cli {
    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Role cache TTL in seconds
    #[arg(long, env = "ROLEGATE_CACHE_TTL", default_value_t = 300)]
    cache_ttl_secs: u64,

    /// App Configuration connection string
    #[arg(long, env = "AZURE_APPCONFIG_CONNECTION_STRING", hide_env_values = true)]
    connection_string: Option<String>,

    /// App Configuration endpoint (authenticates with the credential chain)
    #[arg(long, env = "AZURE_APPCONFIG_ENDPOINT")]
    endpoint: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rolegate Server v{}", rolegate_authz::VERSION);
    info!("Configuration:");
    info!("  Port: {}", cli.port);
    info!("  Cache TTL: {}s", cli.cache_ttl_secs);

    // Missing or malformed settings are fatal; an unreachable store is not
    let settings = StoreSettings::new(cli.connection_string, cli.endpoint);
    let store = settings
        .build(ClientOptions::default())
        .context("Invalid role store settings")?;
    match store.probe().await {
        Ok(()) => info!("Role store reachable at {}", store.endpoint()),
        Err(e) => warn!(
            "Role store at {} is not reachable yet, users resolve to no roles until it is: {}",
            store.endpoint(),
            e
        ),
    }

    let cache = Arc::new(RoleCache::new(CacheConfig {
        ttl: Duration::from_secs(cli.cache_ttl_secs),
    }));
    let resolver = Arc::new(RoleResolver::new(Arc::new(store), cache));
    let app = router(AppState::new(resolver, GateConfig::default()));

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", addr))?;

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shut down gracefully");
    Ok(())
}
