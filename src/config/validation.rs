//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Reject cookie attributes that cannot be written into a header
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::http::cookies::CookieAttributes;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("limits.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("cookies.path `{0}` must start with `/` and be writable as a cookie attribute")]
    InvalidCookiePath(String),

    #[error("cookies.domain `{0}` must be non-empty, contain no whitespace and be writable as a cookie attribute")]
    InvalidCookieDomain(String),

    #[error("observability.log_level `{0}` is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let path = &config.cookies.path;
    let path_only = CookieAttributes {
        path: path.clone(),
        domain: None,
    };
    if !path.starts_with('/') || !path_only.is_well_formed() {
        errors.push(ValidationError::InvalidCookiePath(path.clone()));
    }

    if let Some(domain) = &config.cookies.domain {
        let domain_only = CookieAttributes {
            domain: Some(domain.clone()),
            ..CookieAttributes::default()
        };
        if domain.is_empty() || domain.contains(char::is_whitespace) || !domain_only.is_well_formed() {
            errors.push(ValidationError::InvalidCookieDomain(domain.clone()));
        }
    }

    if tracing::Level::from_str(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
