//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeouts, request ID, rate limiting)
//! - Build the shared request state from configuration
//! - Run the idle bucket sweep alongside the server
//! - Serve until the shutdown broadcast fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{error_handling::HandleErrorLayer, middleware, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::http::handlers::{handle_middleware_error, health_handler, query_handler};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lookup::{CommandBuilder, Dispatcher};
use crate::security::client_ip::TrustedProxies;
use crate::security::headers::apply_security_headers;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// `None` when rate limiting is disabled.
    pub limiter: Option<Arc<RateLimiter>>,
    pub proxies: Arc<TrustedProxies>,
    pub commands: Arc<CommandBuilder>,
    pub dispatcher: Arc<Dispatcher>,
    /// Added to the dispatcher timeout to form the request's lookup deadline.
    pub safety_margin: Duration,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.rate_limit)));

        let proxies = match TrustedProxies::from_cidrs(&config.proxies.trusted) {
            Ok(proxies) => proxies,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse trusted proxies; forwarding headers will not be trusted");
                TrustedProxies::default()
            }
        };

        Self {
            limiter,
            proxies: Arc::new(proxies),
            commands: Arc::new(CommandBuilder::new(config.lookup.tool.clone())),
            dispatcher: Arc::new(Dispatcher::from_config(&config.lookup)),
            safety_margin: Duration::from_millis(config.lookup.safety_margin_ms),
            max_body_bytes: config.listener.max_body_bytes,
        }
    }
}

/// HTTP server for the DNS gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let state = AppState::from_config(&config);
        let limiter = state.limiter.clone();

        tracing::info!(
            rate_limit = limiter.is_some(),
            trusted_proxies = state.proxies.len(),
            tool = %state.dispatcher.tool(),
            lookup_timeout_ms = config.lookup.timeout_ms,
            "Gateway state initialized"
        );

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let query = Router::new()
            .route("/query", any(query_handler))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            ));

        let router = Router::new()
            .route("/healthz", any(health_handler))
            .route("/health", any(health_handler))
            .merge(query)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_middleware_error))
                    .timeout(Duration::from_secs(config.timeouts.request_secs)),
            );

        apply_security_headers(router, &config.security)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        if let Some(limiter) = &self.limiter {
            let interval = Duration::from_secs(self.config.rate_limit.cleanup_interval_secs);
            tokio::spawn(limiter.clone().run_eviction_loop(interval, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
