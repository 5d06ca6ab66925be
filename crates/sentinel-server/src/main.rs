//! Sentinel Server
//!
//! HTTP API for risk scans, token billing and identity.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use sentinel_core::config::{self, Config};

use sentinel_server::auth::JwtManager;
use sentinel_server::billing::StoreSettings;
use sentinel_server::clients::{PaymentClient, ScanClient};
use sentinel_server::context::ContextFactory;
use sentinel_server::identity::{IdentityProvider, LogResetSender};
use sentinel_server::server::{AppState, build_router};
use sentinel_server::storage::SentinelDatabase;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Parser, Debug)]
#[command(name = "sentinel-server")]
#[command(version, about = "Sentinel server - risk scans, token billing and identity")]
struct Args {
    /// Host to bind. Overrides the config file.
    #[arg(long, env = "SENTINEL_HOST")]
    host: Option<String>,

    /// Port to listen on. Overrides the config file.
    #[arg(long, env = "SENTINEL_PORT")]
    port: Option<u16>,

    /// Path to SQLite database file.
    #[arg(long, env = "SENTINEL_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Log level for the server's own spans (overridden by `RUST_LOG`).
    #[arg(long, env = "SENTINEL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// JWT secret key.
    #[arg(long, env = "SENTINEL_JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Directory searched for `.sentinel/settings.json`.
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// OpenTelemetry OTLP endpoint for traces and metrics export
    /// (e.g. `http://localhost:4317`). Requires the `metrics` feature.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "SENTINEL_METRICS_ENDPOINT")]
    metrics_endpoint: Option<String>,
}

impl Args {
    /// CLI flags win over every config source.
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.db_path {
            config.server.database_path = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.server.log_level.clone_from(level);
        }
        if self.log_json {
            config.server.log_json = true;
        }
        if let Some(secret) = &self.jwt_secret {
            config.auth.jwt_secret = Some(secret.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let project_dir = match &args.project_dir {
        Some(dir) => Some(dir.clone()),
        None => std::env::current_dir().ok(),
    };
    let mut config = config::load_config(project_dir.as_deref())?;
    args.apply(&mut config);

    let log_filter = format!("sentinel_server={}", config.server.log_level);
    sentinel_core::tracing_init::init_tracing(&log_filter, config.server.log_json);

    #[cfg(feature = "metrics")]
    let metrics_guard = match args.metrics_endpoint.as_deref() {
        Some(endpoint) => Some(sentinel_core::metrics::init_metrics(endpoint)?),
        None => None,
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        "Starting sentinel-server"
    );

    let db_path = match &config.server.database_path {
        Some(path) => path.clone(),
        None => config::database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine data directory"))?,
    };
    info!(path = %db_path.display(), "Opening database");
    let db = SentinelDatabase::open(&db_path).await?;

    let secret = config.auth.jwt_secret.clone().unwrap_or_else(|| {
        warn!("No JWT secret configured, using the development secret");
        DEV_JWT_SECRET.to_string()
    });
    let jwt = Arc::new(JwtManager::new(
        secret.as_bytes(),
        config.auth.access_ttl_secs,
        config.auth.refresh_ttl_days * 86_400,
    ));

    let provider = IdentityProvider::new(
        db.clone(),
        jwt,
        Arc::new(LogResetSender),
        config.server.public_url.clone(),
        config.auth.reset_ttl_secs,
        config.billing.signup_tokens,
    );

    let factory = ContextFactory {
        db,
        provider,
        scan_client: ScanClient::new(&config.scan_api)?,
        payments: PaymentClient::new(&config.payments)?,
        settings: StoreSettings::from_config(&config),
        recent_capacity: config.billing.recent_capacity,
    };
    let state = AppState::new(factory);
    state
        .registry
        .spawn_idle_sweep(Duration::from_secs(config.server.context_idle_secs));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    #[cfg(feature = "metrics")]
    if let Some(guard) = metrics_guard {
        if let Err(e) = guard.shutdown() {
            warn!(error = %e, "Failed to flush telemetry");
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
