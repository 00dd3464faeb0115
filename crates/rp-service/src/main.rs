//! Relying-party gateway
//!
//! Serves a protected resource to callers holding a token signed by the
//! configured issuer.

use rp_service::config::Config;
use rp_service::observability::metrics::init_metrics_recorder;
use rp_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting relying-party gateway");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        sts_url = %config.sts_url,
        bind_address = %config.bind_address(),
        sts_timeout_seconds = config.sts_timeout.as_secs(),
        trust_cache_ttl_seconds = config.trust_cache_ttl.map_or(0, |ttl| ttl.as_secs()),
        jwt_clock_skew_seconds = config.jwt_clock_skew.as_secs(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let listener = routes::bind_listener(&config).await.map_err(|e| {
        error!("Failed to bind {}: {}", config.bind_address(), e);
        e
    })?;
    let addr = listener.local_addr()?;
    let drain_seconds = config.drain_seconds;

    let state = Arc::new(AppState::from_config(config).map_err(|e| {
        error!("Failed to build trust resolver: {}", e);
        e
    })?);

    let app = routes::build_routes(state, metrics_handle);

    info!("Relying-party gateway listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_seconds))
    .await?;

    info!("Relying-party gateway shutdown complete");

    Ok(())
}

/// Install the global subscriber. `RP_LOG_FORMAT=json` selects JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rp_service=debug,tower_http=debug".into());

    let json = std::env::var("RP_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (RP_DRAIN_SECONDS=0)");
    }
}
