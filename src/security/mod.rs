//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming /query request:
//!     → client_ip.rs (resolve client from peer + trusted forwarding headers)
//!     → rate_limit.rs (per-client token bucket, 429 on exhaustion)
//!     → Pass to handler
//!
//! Outgoing response:
//!     → headers.rs (nosniff, no-store)
//! ```
//!
//! # Design Decisions
//! - Forwarding headers are ignored unless the peer is a trusted proxy
//! - Fail closed: an empty bucket rejects, never queues

pub mod client_ip;
pub mod headers;
pub mod rate_limit;

pub use client_ip::{resolve_client_ip, ClientAddr, TrustedProxies};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
