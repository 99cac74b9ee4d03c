//! Outbound request composition.
//!
//! # Responsibilities
//! - Strip the mount prefix from the original path (query kept verbatim)
//! - Join host and path into the destination URL
//! - Re-serialize the parsed JSON body
//! - Carry method and transport options over unchanged
//!
//! # Design Decisions
//! - No network activity here; the result is a plain descriptor
//! - No slash normalization at the host/path join
//! - An absent body is sent as `{}`, never omitted

use std::time::Instant;

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::relay::context::{ForwardingContext, InboundRequest};
use crate::relay::resolve::Resolved;
use crate::relay::transport::TransportOptions;

/// Descriptor handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub transport: Option<TransportOptions>,
}

/// Original path with the mount prefix removed.
///
/// Paths that do not start with the prefix are returned unchanged.
pub fn destination_path<'a>(original: &'a str, mount_prefix: &str) -> &'a str {
    original.strip_prefix(mount_prefix).unwrap_or(original)
}

/// JSON text of the inbound body, keys in their received order.
pub fn serialize_body(body: Option<&Value>) -> Bytes {
    match body {
        Some(value) => Bytes::from(value.to_string()),
        None => Bytes::from(Value::Object(Map::new()).to_string()),
    }
}

impl ForwardingContext {
    /// Build the per-request context from resolved settings.
    pub fn compose(resolved: Resolved, request: &InboundRequest) -> Self {
        let path = destination_path(request.original_path(), &request.mount_prefix).to_string();
        let url = format!("{}{}", resolved.host, path);

        Self {
            method: request.method.clone(),
            host: resolved.host,
            path,
            url,
            headers: resolved.headers,
            body: serialize_body(request.body.as_ref()),
            debug_header: resolved.debug_header,
            transport: request.transport_options().cloned(),
            started: Instant::now(),
        }
    }

    pub fn outbound(&self) -> OutboundRequest {
        OutboundRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            transport: self.transport.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::config::RelayConfig;
    use crate::relay::resolve::resolve;
    use axum::http::Uri;
    use serde_json::json;
    use std::time::Duration;

    fn compose(config: &RelayConfig, request: &InboundRequest) -> ForwardingContext {
        ForwardingContext::compose(resolve(config, request).unwrap(), request)
    }

    #[test]
    fn test_destination_path_strips_prefix() {
        assert_eq!(destination_path("/orders/42?expand=lines", "/orders"), "/42?expand=lines");
        assert_eq!(destination_path("/orders", "/orders"), "");
        assert_eq!(destination_path("/other/1", "/orders"), "/other/1");
        assert_eq!(destination_path("/a%2Fb/*?q=%20", ""), "/a%2Fb/*?q=%20");
    }

    #[test]
    fn test_url_is_plain_concatenation() {
        let request = InboundRequest::new(Method::GET, Uri::from_static("/api/v1/items?page=2"))
            .with_mount_prefix("/api");

        let cx = compose(&RelayConfig::new("http://backend:9000"), &request);
        assert_eq!(cx.path, "/v1/items?page=2");
        assert_eq!(cx.url, "http://backend:9000/v1/items?page=2");

        // Trailing slash on the host is kept, producing a double slash.
        let cx = compose(&RelayConfig::new("http://backend:9000/"), &request);
        assert_eq!(cx.url, "http://backend:9000//v1/items?page=2");
    }

    #[test]
    fn test_absent_body_serializes_as_empty_object() {
        let request = InboundRequest::new(Method::POST, Uri::from_static("/x"));
        let cx = compose(&RelayConfig::new("http://backend"), &request);
        assert_eq!(&cx.body[..], b"{}");
    }

    #[test]
    fn test_body_reserialized_without_changes() {
        let request = InboundRequest::new(Method::PUT, Uri::from_static("/x"))
            .with_body(json!({"sku": "A-1", "qty": [1, 2, 3]}));
        let cx = compose(&RelayConfig::new("http://backend"), &request);
        let echoed: Value = serde_json::from_slice(&cx.body).unwrap();
        assert_eq!(echoed, json!({"sku": "A-1", "qty": [1, 2, 3]}));
        assert_eq!(cx.method, Method::PUT);
    }

    #[test]
    fn test_body_keeps_key_order() {
        let body: Value = serde_json::from_str(r#"{"sku":"A-1","qty":2,"a":{"z":1,"b":2}}"#).unwrap();
        assert_eq!(
            &serialize_body(Some(&body))[..],
            br#"{"sku":"A-1","qty":2,"a":{"z":1,"b":2}}"#
        );
    }

    #[test]
    fn test_transport_options_carried_over() {
        let options = TransportOptions {
            timeout: Some(Duration::from_millis(250)),
        };
        let request = InboundRequest::new(Method::GET, Uri::from_static("/x"))
            .with_extension(options.clone());
        let outbound = compose(&RelayConfig::new("http://backend"), &request).outbound();
        assert_eq!(outbound.transport, Some(options));
    }

    #[test]
    fn test_composition_is_deterministic() {
        let request = InboundRequest::new(Method::POST, Uri::from_static("/svc/orders?a=1"))
            .with_mount_prefix("/svc")
            .with_body(json!({"id": 7}));
        let config = RelayConfig::new("http://backend");

        let first = compose(&config, &request).outbound();
        let second = compose(&config, &request).outbound();
        assert_eq!(first, second);
    }
}
