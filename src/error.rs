//! Forwarding failures and the continuation that receives them.
//!
//! # Taxonomy
//! - `HostResolution`: the target host did not resolve to a non-empty string
//! - `UpstreamRequest`: the transport failed before a response head arrived
//! - `UpstreamResponse`: piping the backend body to the client failed
//!
//! # Design Decisions
//! - Every failure is request-scoped; nothing here brings the process down
//! - The relay never writes an error response itself: it hands the error to
//!   an `ErrorHandler`, exactly once per request
//! - No kind is ever retried at this layer

use std::fmt;

use axum::http::HeaderValue;
use axum::response::Response;
use serde::Serialize;

/// Boxed error used for causes coming from resolvers and transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of a forwarding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "HOST_RESOLUTION_ERROR")]
    HostResolution,
    #[serde(rename = "UPSTREAM_REQUEST_ERROR")]
    UpstreamRequest,
    #[serde(rename = "UPSTREAM_RESPONSE_ERROR")]
    UpstreamResponse,
}

impl ErrorKind {
    /// Stable wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::HostResolution => "HOST_RESOLUTION_ERROR",
            ErrorKind::UpstreamRequest => "UPSTREAM_REQUEST_ERROR",
            ErrorKind::UpstreamResponse => "UPSTREAM_RESPONSE_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of one forwarding operation.
#[derive(Debug)]
pub struct ForwardError {
    kind: ErrorKind,
    detail: String,
    url: Option<String>,
    source: Option<BoxError>,
    curl_command: Option<HeaderValue>,
}

impl ForwardError {
    /// The target host could not be resolved. No URL exists yet.
    pub fn host_resolution(detail: impl Into<String>, source: Option<BoxError>) -> Self {
        Self {
            kind: ErrorKind::HostResolution,
            detail: detail.into(),
            url: None,
            source,
            curl_command: None,
        }
    }

    /// The transport failed before a response arrived.
    pub fn upstream_request(url: impl Into<String>, source: BoxError) -> Self {
        let url = url.into();
        Self {
            kind: ErrorKind::UpstreamRequest,
            detail: format!("request to {} failed: {}", url, source),
            url: Some(url),
            source: Some(source),
            curl_command: None,
        }
    }

    /// The response stream broke after the response was committed.
    pub fn upstream_response(
        url: impl Into<String>,
        reason: &str,
        source: Option<BoxError>,
    ) -> Self {
        let url = url.into();
        let detail = match &source {
            Some(cause) => format!("streaming response from {} failed: {}: {}", url, reason, cause),
            None => format!("streaming response from {} failed: {}", url, reason),
        };
        Self {
            kind: ErrorKind::UpstreamResponse,
            detail,
            url: Some(url),
            source,
            curl_command: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Destination URL, when resolution got far enough to build one.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Attach the encoded debug command of the request that failed.
    pub fn with_curl_command(mut self, command: Option<HeaderValue>) -> Self {
        self.curl_command = command;
        self
    }

    /// Encoded `x-curl-command` value, when the rule has the debug header on.
    pub fn curl_command(&self) -> Option<&HeaderValue> {
        self.curl_command.as_ref()
    }

    /// True when the underlying cause is a transport timeout.
    pub fn is_timeout(&self) -> bool {
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            if err.is::<crate::relay::transport::TransportTimeout>() {
                return true;
            }
            cause = err.source();
        }
        false
    }
}

impl fmt::Display for ForwardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for ForwardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// Centralized error continuation supplied by the hosting application.
///
/// Called exactly once for a failed request. If the failure happened before
/// the response head was sent, the returned response goes to the client.
/// After that point the returned response is dropped and the connection is
/// torn down instead.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, error: ForwardError) -> Response;
}

impl<F> ErrorHandler for F
where
    F: Fn(ForwardError) -> Response + Send + Sync + 'static,
{
    fn handle(&self, error: ForwardError) -> Response {
        self(error)
    }
}
