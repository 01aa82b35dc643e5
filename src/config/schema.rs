//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the DNS gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Reverse proxies allowed to supply client-identifying headers.
    pub proxies: ProxyConfig,

    /// External lookup tool settings.
    pub lookup: LookupConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration for the HTTP surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upper bound on graceful connection draining at shutdown, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 10,
            shutdown_secs: 10,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Token refill rate per client, in tokens per second.
    pub requests_per_second: f64,

    /// Burst capacity.
    pub burst_size: u32,

    /// Interval between idle bucket sweeps, in seconds.
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 10.0,
            burst_size: 20,
            cleanup_interval_secs: 300,
        }
    }
}

/// Trusted reverse proxy ranges.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// CIDR ranges (e.g. "10.0.0.0/8"). Empty means forwarding headers are
    /// never trusted.
    pub trusted: Vec<String>,
}

/// External lookup tool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Executable name or path.
    pub tool: String,

    /// Hard deadline for a single tool run in milliseconds.
    pub timeout_ms: u64,

    /// Captured stdout is cut to this many bytes (0 disables the cap).
    pub max_output_bytes: usize,

    /// Extra time granted to the request on top of `timeout_ms`.
    pub safety_margin_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            tool: "kdig".to_string(),
            timeout_ms: 5_000,
            max_output_bytes: 32 * 1024,
            safety_margin_ms: 1_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "text" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add security headers to every response.
    pub enable_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [rate_limit]
            burst_size = 5

            [proxies]
            trusted = ["10.0.0.0/8"]
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.burst_size, 5);
        assert_eq!(config.rate_limit.requests_per_second, 10.0);
        assert_eq!(config.proxies.trusted, vec!["10.0.0.0/8".to_string()]);
        assert_eq!(config.lookup.tool, "kdig");
        assert_eq!(config.lookup.max_output_bytes, 32 * 1024);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
