//! Configuration resolution.
//!
//! # Responsibilities
//! - Resolve the target host (fixed or per request)
//! - Resolve extra headers and merge them over the JSON defaults
//! - Resolve whether the debug command header is wanted
//!
//! # Design Decisions
//! - Pure: only reads the inbound request
//! - Host failures are request-scoped `HostResolution` errors, never panics

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};

use crate::error::ForwardError;
use crate::relay::config::RelayConfig;
use crate::relay::context::InboundRequest;
use crate::relay::setting::TargetHost;

/// Concrete values for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub host: String,
    pub headers: HeaderMap,
    pub debug_header: bool,
}

pub fn resolve(config: &RelayConfig, request: &InboundRequest) -> Result<Resolved, ForwardError> {
    let host = resolve_host(&config.target_host, request, config.annotation())?;
    let headers = merge_headers(config.extra_headers.resolve(request));
    let debug_header = config.debug_header.resolve(request);

    Ok(Resolved {
        host,
        headers,
        debug_header,
    })
}

fn resolve_host(
    target: &TargetHost,
    request: &InboundRequest,
    annotation: Option<&str>,
) -> Result<String, ForwardError> {
    let suffix = annotation
        .map(|a| format!(" ({})", a))
        .unwrap_or_default();

    let host = match target {
        TargetHost::Fixed(host) => host.clone(),
        TargetHost::Resolver(resolve) => resolve(request).map_err(|cause| {
            ForwardError::host_resolution(
                format!(
                    "target host resolver failed for {}{}: {}",
                    request.original_path(),
                    suffix,
                    cause
                ),
                Some(cause),
            )
        })?,
    };

    if host.is_empty() {
        return Err(ForwardError::host_resolution(
            format!("target host resolved to an empty string ({:?}){}", host, suffix),
            None,
        ));
    }

    Ok(host)
}

/// Default JSON headers with `extra` laid over them, key by key.
pub fn merge_headers(extra: HeaderMap) -> HeaderMap {
    let mut headers = default_headers();
    // Extend replaces every value of a key that `extra` carries.
    headers.extend(extra);
    headers
}

pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}
