//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → security::rate_limit (client address + admission, /query only)
//!     → handlers.rs (decode, validate, dispatch)
//!     → response.rs (JSON document, status mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use response::{ApiError, QueryResponse};
pub use server::{AppState, HttpServer};
