//! Relay lifecycle events.
//!
//! Emits "Proxy start", "Proxy end" and "Proxy error" through the rule's
//! `RelayLogger`. Nothing is emitted when the rule has no logger.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use serde_json::Value;

use crate::error::ForwardError;
use crate::observability::logging::{LogEvent, RelayLogger};
use crate::relay::context::ForwardingContext;

/// Arrays in logged bodies keep at most this many items.
pub const MAX_LOGGED_ITEMS: usize = 10;

#[derive(Clone, Default)]
pub struct Hooks {
    logger: Option<Arc<dyn RelayLogger>>,
    annotation: Option<Arc<str>>,
}

impl Hooks {
    pub fn new(logger: Option<Arc<dyn RelayLogger>>, annotation: Option<&str>) -> Self {
        Self {
            logger,
            annotation: annotation.map(Arc::from),
        }
    }

    /// Right before the outbound request is issued.
    pub fn start(&self, cx: &ForwardingContext) {
        let Some(logger) = &self.logger else {
            return;
        };

        let body = serde_json::from_slice::<Value>(&cx.body)
            .map(|value| summarize(&value, MAX_LOGGED_ITEMS))
            .ok();
        let event = LogEvent {
            method: cx.method.to_string(),
            host: Some(cx.host.clone()),
            path: Some(cx.path.clone()),
            url: Some(cx.url.clone()),
            headers: Some(header_fields(&cx.headers)),
            body,
            ..Default::default()
        };
        logger.info(&event, &self.message(format!("Proxy start: {} {}", cx.method, cx.url)));
    }

    /// When the response stream has been fully handed to the client.
    pub fn end(&self, cx: &ForwardingContext, duration_ms: f64) {
        let Some(logger) = &self.logger else {
            return;
        };

        let event = LogEvent {
            method: cx.method.to_string(),
            host: Some(cx.host.clone()),
            path: Some(cx.path.clone()),
            url: Some(cx.url.clone()),
            duration_ms: Some(duration_ms),
            ..Default::default()
        };
        logger.info(
            &event,
            &self.message(format!(
                "Proxy end: {} {} in {:.3}ms",
                cx.method, cx.url, duration_ms
            )),
        );
    }

    pub fn error(&self, method: &str, error: &ForwardError) {
        let Some(logger) = &self.logger else {
            return;
        };

        let event = LogEvent {
            method: method.to_string(),
            url: error.url().map(str::to_string),
            error: Some(error.kind()),
            detail: Some(error.detail().to_string()),
            ..Default::default()
        };
        logger.error(&event, &self.message(format!("Proxy error: {}", error)));
    }

    fn message(&self, text: String) -> String {
        match &self.annotation {
            Some(annotation) => format!("{} - {}", text, annotation),
            None => text,
        }
    }
}

/// Copy of `value` with every array cut to `max_items`, followed by a
/// marker naming how many items were left out.
pub fn summarize(value: &Value, max_items: usize) -> Value {
    match value {
        Value::Array(items) => {
            let mut kept: Vec<Value> = items
                .iter()
                .take(max_items)
                .map(|item| summarize(item, max_items))
                .collect();
            if items.len() > max_items {
                kept.push(Value::String(format!(
                    "... {} more items",
                    items.len() - max_items
                )));
            }
            Value::Array(kept)
        }
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, field)| (key.clone(), summarize(field, max_items)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn header_fields(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
