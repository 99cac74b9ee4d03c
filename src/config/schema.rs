//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::validation::ValidationError;
use crate::observability::TracingLogger;
use crate::relay::{RelayConfig, TransportOptions};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Forwarding rules, one mount each.
    pub rules: Vec<RuleConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
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

/// One forwarding rule: requests under `mount` go to `target_host`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Rule identifier for logging/metrics.
    pub name: String,

    /// Path prefix the rule is mounted at.
    pub mount: String,

    /// Backend base URL, e.g. "http://orders.internal:8080".
    pub target_host: String,

    /// Suffix for the rule's log messages.
    #[serde(default)]
    pub annotation: Option<String>,

    /// Attach `x-curl-command` to responses.
    #[serde(default)]
    pub debug_header: bool,

    /// Log start/end/error events through `TracingLogger`.
    #[serde(default = "default_log_requests")]
    pub log_requests: bool,

    /// Whole-exchange timeout for the backend request.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Extra outbound headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_log_requests() -> bool {
    true
}

impl RuleConfig {
    pub fn new(
        name: impl Into<String>,
        mount: impl Into<String>,
        target_host: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mount: mount.into(),
            target_host: target_host.into(),
            annotation: None,
            debug_header: false,
            log_requests: default_log_requests(),
            timeout_secs: None,
            headers: BTreeMap::new(),
        }
    }

    /// `headers` as a `HeaderMap`.
    pub fn header_map(&self) -> Result<HeaderMap, ValidationError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let invalid = || ValidationError::InvalidHeader {
                rule: self.name.clone(),
                header: name.clone(),
            };
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            map.insert(name, value);
        }
        Ok(map)
    }

    pub fn transport_options(&self) -> Option<TransportOptions> {
        self.timeout_secs.map(|secs| TransportOptions {
            timeout: Some(Duration::from_secs(secs)),
        })
    }

    /// Build the relay configuration. The annotation defaults to the rule name.
    pub fn relay_config(&self) -> Result<RelayConfig, ValidationError> {
        let annotation = self.annotation.clone().unwrap_or_else(|| self.name.clone());
        let mut config = RelayConfig::new(self.target_host.clone())
            .with_extra_headers(self.header_map()?)
            .with_debug_header(self.debug_header)
            .with_annotation(annotation);
        if self.log_requests {
            config = config.with_logger(Arc::new(TracingLogger));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_defaults() {
        let rule: RuleConfig = toml::from_str(
            r#"
            name = "orders"
            mount = "/orders"
            target_host = "http://orders.internal"
            "#,
        )
        .unwrap();

        assert!(rule.log_requests);
        assert!(!rule.debug_header);
        assert!(rule.transport_options().is_none());

        let relay = rule.relay_config().unwrap();
        assert!(relay.has_logger());
        assert_eq!(relay.annotation(), Some("orders"));
    }

    #[test]
    fn test_rule_headers_and_timeout() {
        let mut rule = RuleConfig::new("billing", "/billing", "http://billing.internal");
        rule.headers.insert("x-api-key".into(), "k-1".into());
        rule.timeout_secs = Some(5);
        rule.log_requests = false;

        assert_eq!(rule.header_map().unwrap()["x-api-key"], "k-1");
        assert_eq!(
            rule.transport_options(),
            Some(TransportOptions {
                timeout: Some(Duration::from_secs(5))
            })
        );
        assert!(!rule.relay_config().unwrap().has_logger());
    }

    #[test]
    fn test_invalid_header_name() {
        let mut rule = RuleConfig::new("billing", "/billing", "http://billing.internal");
        rule.headers.insert("bad header".into(), "v".into());
        assert!(matches!(
            rule.header_map(),
            Err(ValidationError::InvalidHeader { .. })
        ));
    }
}
