//! Client address resolution behind trusted reverse proxies.
//!
//! # Responsibilities
//! - Hold the immutable set of trusted proxy ranges
//! - Pick the address that identifies "the client" for rate limiting and logs
//!
//! # Design Decisions
//! - Forwarding headers are ignored entirely when no proxy is trusted
//! - Fallback order: `X-Forwarded-For` → `X-Real-IP` → connection address
//! - Malformed header entries are skipped, never an error

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use ipnetwork::IpNetwork;
use thiserror::Error;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// A trusted proxy range failed to parse.
#[derive(Debug, Error)]
#[error("invalid CIDR {cidr:?}: {source}")]
pub struct ProxyConfigError {
    pub cidr: String,
    #[source]
    pub source: ipnetwork::IpNetworkError,
}

/// The resolved client address, attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

/// Network ranges whose traffic may supply client-identifying headers.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    ranges: Vec<IpNetwork>,
}

impl TrustedProxies {
    /// Parse CIDR strings. Blank entries are skipped; any invalid entry
    /// rejects the whole list.
    pub fn from_cidrs<I, S>(cidrs: I) -> Result<Self, ProxyConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranges = Vec::new();
        for cidr in cidrs {
            let cidr = cidr.as_ref().trim();
            if cidr.is_empty() {
                continue;
            }
            let network: IpNetwork = cidr.parse().map_err(|source| ProxyConfigError {
                cidr: cidr.to_string(),
                source,
            })?;
            ranges.push(network);
        }
        Ok(Self { ranges })
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether `ip` falls inside any trusted range.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.ranges.iter().any(|network| network.contains(ip))
    }
}

/// Resolve the client address for a request.
///
/// `remote` is the connection peer, as `host:port` or a bare host.
pub fn resolve_client_ip(headers: &HeaderMap, remote: &str, trusted: &TrustedProxies) -> String {
    if trusted.is_empty() {
        return host_from_remote(remote);
    }

    // Left-most entry is the originating client; each later entry is a hop.
    let forwarded = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim);
    for entry in forwarded {
        match entry.parse::<IpAddr>() {
            Ok(ip) if !trusted.contains(ip) => return entry.to_string(),
            _ => continue,
        }
    }

    if let Some(real_ip) = headers
        .get(X_REAL_IP)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
    {
        if let Ok(ip) = real_ip.parse::<IpAddr>() {
            if !trusted.contains(ip) {
                return real_ip.to_string();
            }
        }
    }

    host_from_remote(remote)
}

/// Strip the port from `host:port` (or `[v6]:port`); anything else is
/// returned unchanged.
pub fn host_from_remote(remote: &str) -> String {
    if let Ok(addr) = remote.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    if let Some(rest) = remote.strip_prefix('[') {
        if let Some((host, port)) = rest.split_once("]:") {
            if !port.contains(':') {
                return host.to_string();
            }
        }
        return remote.to_string();
    }
    match remote.split_once(':') {
        Some((host, port)) if !port.contains(':') => host.to_string(),
        _ => remote.to_string(),
    }
}
