use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{middleware, Json, Router};
use clap::Parser;
use tokio::signal;
use tracing::{debug, info, Level};
use tracing_subscriber;

use turnstile::config::TurnstileConfig;
use turnstile::http::{admin_router, rate_limit};
use turnstile::ratelimit::{RateLimitBackend, RateLimiter};

/// In-process HTTP rate limiting service.
#[derive(Parser, Debug)]
#[command(name = "turnstile", version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Turnstile Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    // Load configuration
    let mut config = match args.config {
        Some(ref path) => TurnstileConfig::from_file(path)?,
        None => TurnstileConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    info!(listen_addr = %config.server.listen_addr, "Configuration loaded");

    // Initialize the rate limiter
    let policy = config.rate_limiting.to_policy();
    info!(
        window_ms = config.rate_limiting.window_ms,
        max_requests = config.rate_limiting.max_requests,
        "Rate limiter initialized"
    );
    let limiter = Arc::new(RateLimiter::new(policy)?);

    // Sweep expired counters off the request path as well, so idle keys
    // do not linger until their client returns
    let sweeper = limiter.clone();
    let sweep_interval = Duration::from_secs(config.rate_limiting.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let removed = sweeper.sweep_expired();
            if removed > 0 {
                debug!(removed = removed, "Periodic sweep removed expired entries");
            }
        }
    });

    let backend: Arc<dyn RateLimitBackend> = limiter;
    let rate_limited = Router::new()
        .route("/health", get(health))
        .layer(middleware::from_fn({
            let backend = backend.clone();
            move |req, next| rate_limit(backend.clone(), req, next)
        }));

    let app = rate_limited.merge(admin_router(backend));

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Turnstile Rate Limiting Service stopped");
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
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
