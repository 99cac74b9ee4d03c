//! Inbound request view and per-request forwarding state.

use std::time::Instant;

use axum::http::{Extensions, HeaderMap, Method, Uri};
use bytes::Bytes;
use serde_json::Value;

use crate::relay::transport::TransportOptions;

/// The already-parsed request handed to the relay by the hosting framework.
#[derive(Debug, Default)]
pub struct InboundRequest {
    pub method: Method,
    /// Original URI as received, before any routing layer consumed a prefix.
    pub uri: Uri,
    /// Portion of the path consumed by the routing layer in front of the relay.
    pub mount_prefix: String,
    pub headers: HeaderMap,
    /// Request extensions, including `TransportOptions` and state left by
    /// outer middleware for resolvers.
    pub extensions: Extensions,
    /// Decoded JSON body. `None` when the request had no body.
    pub body: Option<Value>,
}

impl InboundRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            ..Default::default()
        }
    }

    pub fn with_mount_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mount_prefix = prefix.into();
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_extension<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }

    /// Original path including the query string, verbatim.
    pub fn original_path(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn transport_options(&self) -> Option<&TransportOptions> {
        self.extensions.get::<TransportOptions>()
    }
}

/// Working state of one forwarding operation.
///
/// Host and headers are fixed once resolved. The context is owned by the
/// request's operation and finally moved into the response body, where the
/// end-of-stream event reads the start timestamp.
#[derive(Debug)]
pub struct ForwardingContext {
    pub method: Method,
    pub host: String,
    /// Original path with the mount prefix removed.
    pub path: String,
    /// `host` + `path`, joined without normalization.
    pub url: String,
    pub headers: HeaderMap,
    /// Serialized JSON body.
    pub body: Bytes,
    pub debug_header: bool,
    pub transport: Option<TransportOptions>,
    pub started: Instant,
}

impl ForwardingContext {
    /// Milliseconds since the outbound request was issued.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}
