//! x402 facilitator HTTP service.
//!
//! Serves the protocol's REST surface over a registered scheme set.
//! Chain mechanisms are wired in by the deployment: construct an
//! [`t402::facilitator::X402Facilitator`], register
//! `ExactEvmFacilitator` / `ExactSvmFacilitator` instances built around
//! your signer implementations, and hand it to
//! [`t402_facilitator::handlers::facilitator_router`]. Run as-is, the
//! service starts with no mechanisms and reports an empty capability
//! catalog.
//!
//! ```bash
//! RUST_LOG=info cargo run -p t402-facilitator
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use t402::facilitator::X402Facilitator;
use t402_facilitator::config::ServiceConfig;
use t402_facilitator::handlers::facilitator_router;
use tower_http::cors;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run().await {
        tracing::error!("facilitator failed: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::load();

    let facilitator = X402Facilitator::new();
    let supported = facilitator.get_supported();
    if supported.kinds.is_empty() {
        tracing::warn!(
            "no schemes registered — the facilitator will report an empty capability catalog"
        );
    }

    let app = facilitator_router(Arc::new(facilitator)).layer(
        cors::CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(cors::Any),
    );

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("facilitator listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("facilitator shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("listen for Ctrl-C");
        tracing::info!("received Ctrl-C, shutting down");
    }
}
