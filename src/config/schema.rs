//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::http::body::{BodyLimit, DEFAULT_MAX_BODY_BYTES};
use crate::http::cookies::CookieAttributes;

/// Root configuration for the session server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request size and time limits.
    pub limits: LimitsConfig,

    /// Attributes of the cookie expiry directives.
    pub cookies: CookieConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            request_timeout_secs: 30,
        }
    }
}

impl LimitsConfig {
    pub fn body_limit(&self) -> BodyLimit {
        BodyLimit::new(self.max_body_bytes)
    }
}

/// Cookie settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CookieConfig {
    /// Path the user cookies were set with.
    pub path: String,

    /// Domain the user cookies were set with, if any.
    pub domain: Option<String>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
        }
    }
}

impl CookieConfig {
    pub fn attributes(&self) -> CookieAttributes {
        CookieAttributes {
            path: self.path.clone(),
            domain: self.domain.clone(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Address for the Prometheus scrape endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.limits.body_limit(), BodyLimit::default());
        assert_eq!(config.cookies.attributes(), CookieAttributes::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: ServerConfig = toml::from_str(
            r#"
            [limits]
            max_body_bytes = 512

            [cookies]
            domain = "example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.limits.max_body_bytes, 512);
        assert_eq!(config.limits.request_timeout_secs, 30);
        assert_eq!(config.cookies.path, "/");
        assert_eq!(config.cookies.domain.as_deref(), Some("example.com"));
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
