//! Configuration loading from disk and the process environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment, then validation.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of `config`.
///
/// `lookup` is the variable source; pass `std::env::var` in production.
/// Values that fail to parse are logged and ignored.
pub fn apply_env_overrides<F>(mut config: GatewayConfig, lookup: F) -> GatewayConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = parse_var::<u16>(&lookup, "PORT") {
        config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
            Ok(mut addr) => {
                addr.set_port(port);
                addr.to_string()
            }
            Err(_) => format!("0.0.0.0:{}", port),
        };
    }

    if let Some(rps) = parse_var::<f64>(&lookup, "RATE_LIMIT_RPS") {
        config.rate_limit.requests_per_second = rps;
    }
    if let Some(burst) = parse_var::<u32>(&lookup, "RATE_LIMIT_BURST") {
        config.rate_limit.burst_size = burst;
    }

    if let Some(raw) = lookup("TRUSTED_PROXIES") {
        config.proxies.trusted = raw
            .split(',')
            .map(str::trim)
            .filter(|cidr| !cidr.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Some(tool) = lookup("LOOKUP_TOOL").filter(|t| !t.trim().is_empty()) {
        config.lookup.tool = tool;
    }
    if let Some(timeout) = parse_var::<u64>(&lookup, "LOOKUP_TIMEOUT_MS") {
        config.lookup.timeout_ms = timeout;
    }
    if let Some(max) = parse_var::<usize>(&lookup, "LOOKUP_MAX_OUTPUT") {
        config.lookup.max_output_bytes = max;
    }

    if let Some(format) = lookup("LOG_FORMAT") {
        config.observability.log_format = format.trim().to_ascii_lowercase();
    }

    config
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(variable = key, value = raw, error = %e, "Ignoring unparseable environment value");
            None
        }
    }
}
