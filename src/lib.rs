//! HTTP gateway for DNS lookups.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /query
//!     ─────────────▶ http::server (request id, trace, timeout, headers)
//!                        │
//!                        ▼
//!                    security::rate_limit ◀── security::client_ip
//!                        │                      (peer + trusted proxies)
//!                        ▼
//!                    http::handlers (decode, validate)
//!                        │
//!                        ▼
//!                    lookup::command → lookup::dispatcher ──▶ kdig
//!                        │                 (deadline, cancel, output cap)
//!                        ▼
//!     ◀───────────── http::response (JSON document)
//! ```
//!
//! Cross-cutting: `config`, `observability`, `resilience`, `lifecycle`.

// Core subsystems
pub mod config;
pub mod http;
pub mod lookup;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
