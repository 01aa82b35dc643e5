//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order (metrics, state, listener)
//! - Serve until SIGINT/SIGTERM
//! - Bound the drain of in-flight requests
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the gateway until a termination signal arrives.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    tracing::info!(
        address = %listener.local_addr()?,
        rate_limit_rps = config.rate_limit.requests_per_second,
        rate_limit_burst = config.rate_limit.burst_size,
        "Listening for connections"
    );

    let drain_timeout = Duration::from_secs(config.timeouts.shutdown_secs);
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        _ = signals::wait_for_signal() => {}
        joined = &mut server_task => {
            // Server stopped on its own; nothing left to drain.
            return match joined {
                Ok(result) => result.map_err(StartupError::from),
                Err(e) => Err(std::io::Error::other(e).into()),
            };
        }
    }

    tracing::info!(drain_timeout_secs = drain_timeout.as_secs(), "Shutting down");
    shutdown.trigger();

    match tokio::time::timeout(drain_timeout, server_task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => return Err(std::io::Error::other(e).into()),
        Err(_) => tracing::warn!("In-flight requests did not drain before the deadline"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
