//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Issue one request per descriptor, return the response head and a
//!   streaming body
//! - Honor per-request `TransportOptions` (response timeout)
//!
//! # Design Decisions
//! - Connection pooling and keep-alive belong to the hyper-util client
//! - Only the transport applies timeouts; the relay adds none of its own
//! - A body dropped before its end closes the connection instead of
//!   returning it to the pool

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{Request, Response};
use bytes::Bytes;
use http_body_util::{combinators::UnsyncBoxBody, BodyExt, Full};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::error::BoxError;
use crate::relay::compose::OutboundRequest;

/// Streaming body returned by a transport.
pub type TransportBody = UnsyncBoxBody<Bytes, BoxError>;

/// Transport settings attached to an inbound request and carried unchanged
/// onto the outbound one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Maximum wait for the backend's response head.
    pub timeout: Option<Duration>,
}

/// The backend did not answer in time.
#[derive(Debug, Error)]
#[error("no response within {0:?}")]
pub struct TransportTimeout(pub Duration);

/// Capability to issue an HTTP request and stream its response.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: OutboundRequest) -> Result<Response<TransportBody>, BoxError>;
}

impl OutboundRequest {
    /// Convert into an `http::Request` with a fully buffered body.
    pub fn into_http(self) -> Result<Request<Full<Bytes>>, axum::http::Error> {
        let mut builder = Request::builder().method(self.method).uri(self.url);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }
        builder.body(Full::new(self.body))
    }
}

/// Default transport backed by the hyper-util legacy client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: OutboundRequest) -> Result<Response<TransportBody>, BoxError> {
        let timeout = request.transport.as_ref().and_then(|options| options.timeout);
        let pending = self.client.request(request.into_http()?);

        let response = match timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| TransportTimeout(limit))??,
            None => pending.await?,
        };

        Ok(response.map(|body| {
            body.map_err(|err| Box::new(err) as BoxError)
                .boxed_unsync()
        }))
    }
}
