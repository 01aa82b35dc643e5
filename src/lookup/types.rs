//! Lookup request types and payload validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body accepted by `POST /query`.
///
/// Missing fields decode as empty strings / `false`; unknown fields are
/// ignored. The payload is echoed back verbatim in every response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestPayload {
    pub nameserver: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub transport: String,
    pub dnssec: bool,
    pub short: bool,
    pub json: bool,
}

impl RequestPayload {
    /// Echoed in responses produced before a payload has been decoded.
    pub fn placeholder() -> Self {
        Self {
            record_type: "A".to_string(),
            transport: "udp".to_string(),
            ..Self::default()
        }
    }

    /// Check presence and allowed values, producing an immutable request.
    pub fn validate(&self) -> Result<LookupRequest, RequestValidationError> {
        if self.nameserver.is_empty() {
            return Err(RequestValidationError::EmptyNameserver);
        }
        if self.name.is_empty() {
            return Err(RequestValidationError::EmptyName);
        }
        let record_type = match self.record_type.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            _ => return Err(RequestValidationError::RecordType),
        };
        let transport = match self.transport.as_str() {
            "" => Transport::Udp,
            "tcp" => Transport::Tcp,
            "tls" => Transport::Tls,
            "https" => Transport::Https,
            _ => return Err(RequestValidationError::Transport),
        };

        Ok(LookupRequest {
            nameserver: self.nameserver.clone(),
            name: self.name.clone(),
            record_type,
            transport,
            dnssec: self.dnssec,
            short: self.short,
            json: self.json,
        })
    }
}

/// A payload that failed presence or allowed-value checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestValidationError {
    #[error("\"nameserver\" must not be empty")]
    EmptyNameserver,

    #[error("\"name\" must not be empty")]
    EmptyName,

    #[error("\"type\" must be \"AAAA\" or \"A\"")]
    RecordType,

    #[error("\"transport\" must be empty or \"tcp\" or \"tls\" or \"https\"")]
    Transport,
}

/// Record types the gateway forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport the lookup tool uses to reach the nameserver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// The tool's default (plain UDP).
    #[default]
    Udp,
    Tcp,
    Tls,
    Https,
}

impl Transport {
    /// Tool flag selecting this transport, if any.
    pub fn flag(self) -> Option<&'static str> {
        match self {
            Transport::Udp => None,
            Transport::Tcp => Some("+tcp"),
            Transport::Tls => Some("+tls"),
            Transport::Https => Some("+https"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
            Transport::Tls => "tls",
            Transport::Https => "https",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated lookup. Only values of this type reach the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    /// Passed to the tool verbatim; no scheme or port handling.
    pub nameserver: String,
    pub name: String,
    pub record_type: RecordType,
    pub transport: Transport,
    pub dnssec: bool,
    pub short: bool,
    pub json: bool,
}
