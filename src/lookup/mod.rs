//! DNS lookup subsystem.
//!
//! # Data Flow
//! ```text
//! RequestPayload (decoded JSON)
//!     → types.rs (validate → LookupRequest)
//!     → command.rs (LookupRequest → Invocation: argv + display string)
//!     → dispatcher.rs (run tool under CallContext → DispatchResult)
//! ```
//!
//! # Design Decisions
//! - DNS semantics live entirely in the external tool
//! - Command construction is pure; only the dispatcher does I/O

pub mod command;
pub mod dispatcher;
pub mod types;

pub use command::{CommandBuilder, Invocation};
pub use dispatcher::{DispatchError, DispatchResult, Dispatcher};
pub use types::{LookupRequest, RecordType, RequestPayload, RequestValidationError, Transport};
