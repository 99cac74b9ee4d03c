//! Stream forwarding.
//!
//! # Responsibilities
//! - Run one forwarding operation: resolve → compose → send → stream
//! - Copy the backend status and end-to-end headers to the client
//! - Attach the debug command header when enabled
//! - Route failures to the error continuation
//!
//! # Design Decisions
//! - Exactly one outbound request per inbound request, never retried
//! - The start timestamp is taken right before the request is issued
//! - Failures before the response head go back through `handle`; later
//!   ones are reported by `RelayBody`

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::response::Response;

use crate::error::{ErrorHandler, ForwardError};
use crate::http::response::{strip_hop_by_hop, DefaultErrorHandler};
use crate::observability::{metrics, Hooks};
use crate::relay::body::RelayBody;
use crate::relay::config::RelayConfig;
use crate::relay::context::{ForwardingContext, InboundRequest};
use crate::relay::curl::{curl_header, CURL_COMMAND_HEADER};
use crate::relay::resolve::resolve;
use crate::relay::transport::{HyperTransport, Transport};

/// Forwarding handler for one rule.
pub struct Forwarder {
    config: Arc<RelayConfig>,
    transport: Arc<dyn Transport>,
    errors: Arc<dyn ErrorHandler>,
    hooks: Hooks,
    rule: Arc<str>,
}

impl Forwarder {
    /// Forwarder using the hyper-util transport and the default error handler.
    pub fn new(config: RelayConfig) -> Self {
        let hooks = Hooks::new(config.logger.clone(), config.annotation());
        let rule: Arc<str> = Arc::from(config.annotation().unwrap_or("default"));
        Self {
            config: Arc::new(config),
            transport: Arc::new(HyperTransport::new()),
            errors: Arc::new(DefaultErrorHandler),
            hooks,
            rule,
        }
    }

    pub fn with_transport(mut self, transport: impl Transport) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_error_handler(mut self, errors: impl ErrorHandler) -> Self {
        self.errors = Arc::new(errors);
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Forward one request. Any failure goes to the error handler; when the
    /// transport fails and the debug header is on, the handler's response
    /// still carries `x-curl-command`.
    pub async fn handle(&self, request: InboundRequest) -> Response {
        let method = request.method.clone();
        match self.forward(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(error = %error, "Forwarding failed before response");
                self.hooks.error(method.as_str(), &error);
                metrics::record_failure(&self.rule, error.kind());
                let command = error.curl_command().cloned();
                let mut response = self.errors.handle(error);
                if let Some(command) = command {
                    response.headers_mut().insert(CURL_COMMAND_HEADER, command);
                }
                response
            }
        }
    }

    /// Forward one request, returning failures that happen before the
    /// response head. Streaming failures still go to the error handler.
    pub async fn forward(&self, request: InboundRequest) -> Result<Response, ForwardError> {
        let resolved = resolve(&self.config, &request)?;
        let mut cx = ForwardingContext::compose(resolved, &request);
        drop(request);

        let outbound = cx.outbound();
        let debug_command = if cx.debug_header {
            curl_header(&outbound)
        } else {
            None
        };

        self.hooks.start(&cx);
        cx.started = Instant::now();

        let response = match self.transport.send(outbound).await {
            Ok(response) => response,
            Err(source) => {
                return Err(ForwardError::upstream_request(cx.url.clone(), source)
                    .with_curl_command(debug_command))
            }
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        if let Some(command) = debug_command {
            parts.headers.insert(CURL_COMMAND_HEADER, command);
        }

        tracing::debug!(url = %cx.url, status = %parts.status, "Upstream responded");

        let body = RelayBody::new(
            body,
            cx,
            self.hooks.clone(),
            Arc::clone(&self.errors),
            Arc::clone(&self.rule),
        );
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
