//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binary
//! - Define the `RelayLogger` capability used by the relay hooks
//! - Provide `TracingLogger`, the stock implementation
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level from `RUST_LOG`, falling back to config

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;
use crate::error::ErrorKind;

/// Structured payload of one relay log event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogEvent {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Log sink for relay events. Implementations should not panic.
pub trait RelayLogger: Send + Sync {
    fn info(&self, event: &LogEvent, message: &str);
    fn error(&self, event: &LogEvent, message: &str);
}

/// Forwards relay events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RelayLogger for TracingLogger {
    fn info(&self, event: &LogEvent, message: &str) {
        tracing::info!(
            target: "json_relay::relay",
            method = %event.method,
            url = event.url.as_deref().unwrap_or(""),
            duration_ms = event.duration_ms,
            event = %serde_json::to_string(event).unwrap_or_default(),
            "{}",
            message
        );
    }

    fn error(&self, event: &LogEvent, message: &str) {
        tracing::error!(
            target: "json_relay::relay",
            method = %event.method,
            url = event.url.as_deref().unwrap_or(""),
            kind = event.error.map(|kind| kind.as_str()).unwrap_or(""),
            event = %serde_json::to_string(event).unwrap_or_default(),
            "{}",
            message
        );
    }
}

/// Install the global subscriber.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "json_relay={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
