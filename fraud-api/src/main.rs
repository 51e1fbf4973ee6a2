//! fraud-api - HTTP front end for fraud-core
//!
//! Usage: `fraud-api [config.toml]`. Environment variables `FRAUD__SECTION__KEY`
//! override the file (API keys are usually passed that way).

mod api;

use fraud_core::{FraudAnalyzer, FraudConfig};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = FraudConfig::load(config_path.as_deref().map(Path::new))?;

    fraud_core::logging::init(&config.logging);

    info!("🚀 Starting fraud-api v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path),
        None => info!("No config file specified, using defaults and environment"),
    }

    let analyzer = Arc::new(FraudAnalyzer::from_config(&config)?);

    // Load the artifact up front so the first request does not pay for it
    match analyzer.store().snapshot().await {
        Ok(model) => info!(
            "✅ Model loaded: {} tokens, fingerprint {}",
            model.vocabulary().len(),
            model.fingerprint()
        ),
        Err(e) => warn!("⚠️  Model not available yet: {}", e),
    }

    let state = Arc::new(AppState {
        analyzer,
        max_batch: config.server.max_batch,
    });

    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server.listen_addr.clone();
    info!("🌐 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 fraud-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
