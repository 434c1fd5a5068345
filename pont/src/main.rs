//! # Pont Entry Point
//!
//! The main executable of the Pont gateway. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses the configuration using [`cli::Cli`] and installs the logger.
//! 2. **Connection**: Creates the lazily connected upstream via `pont_core`. The gateway starts
//!    even if the gRPC server isn't up yet, and reports `502` until it is.
//! 3. **Serving**: Exposes the upstream over HTTP/JSON until Ctrl-C (or `SIGTERM`) is received.

mod cli;
mod gateway;
mod logging;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use gateway::{AppState, routes::router};
use pont_core::Proxy;
use pont_core::tonic::transport::Endpoint;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    logging::init(args.log_level)?;

    let upstream = args.upstream_uri();
    let endpoint = Endpoint::from_shared(upstream.clone())
        .with_context(|| format!("invalid gRPC server address '{upstream}'"))?;

    tracing::info!(grpc_addr = %upstream, "connecting to gRPC service");
    let proxy = Proxy::connect_lazy(endpoint, args.probe_interval);

    let app = router(AppState::new(Arc::new(proxy), args.call_timeout));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on HTTP port {}", args.port))?;

    tracing::info!(
        log_level = ?args.log_level,
        port = args.port,
        "pont is serving"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server failure")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received, stopping");
}
