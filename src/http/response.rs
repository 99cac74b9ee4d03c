//! Response handling and transformation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from backend responses
//! - Render `ForwardError` for clients (default error handler)
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Transport timeouts result in 504 Gateway Timeout
//! - Error bodies are JSON: `{"error": {"kind": ..., "message": ...}}`

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{ErrorHandler, ErrorKind, ForwardError};

static HOP_BY_HOP: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove headers that only apply to a single connection.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Names listed in `Connection` are hop-by-hop as well.
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// JSON error body shared by every error the HTTP layer renders.
pub fn error_response(status: StatusCode, kind: &str, message: &str) -> Response {
    let body = json!({
        "error": {
            "kind": kind,
            "message": message,
        }
    });
    (status, Json(body)).into_response()
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::HostResolution => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::UpstreamRequest if self.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::UpstreamRequest | ErrorKind::UpstreamResponse => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.kind().as_str(), self.detail())
    }
}

/// Logs the failure and renders it as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, error: ForwardError) -> Response {
        tracing::error!(
            kind = %error.kind(),
            url = error.url().unwrap_or(""),
            "{}",
            error.detail()
        );
        error.into_response()
    }
}
