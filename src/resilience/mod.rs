//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Lookup request:
//!     → timeouts.rs (request deadline = tool timeout + safety margin)
//!     → lookup::dispatcher (child deadline = min(parent, tool timeout))
//!     → Cancellation from either side kills the tool process
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every subprocess has a deadline
//! - No retries: a failed lookup is reported, not repeated

pub mod timeouts;

pub use timeouts::{CallContext, Interrupted};
