//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with one relay mount per rule
//! - Wire up middleware (tracing, body limit, request ID)
//! - Bind server to listener and shut down gracefully
//! - Hand each request to its rule's `Forwarder`

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::validation::ValidationError;
use crate::config::ProxyConfig;
use crate::http::request::{read_inbound, MakeRequestUuid, X_REQUEST_ID};
use crate::relay::{Forwarder, TransportOptions};

/// State injected into a rule's handler.
#[derive(Clone)]
struct MountState {
    forwarder: Arc<Forwarder>,
    prefix: Arc<str>,
    transport: Option<TransportOptions>,
}

/// Mount `forwarder` at `path` on `router`.
///
/// `transport` is attached to requests that carry no `TransportOptions` of
/// their own.
pub fn mount(
    router: Router,
    path: &str,
    forwarder: Forwarder,
    transport: Option<TransportOptions>,
) -> Router {
    let prefix = path.trim_end_matches('/');
    let state = MountState {
        forwarder: Arc::new(forwarder),
        prefix: Arc::from(prefix),
        transport,
    };

    let rule = Router::new()
        .route("/", any(relay_handler))
        .route("/{*rest}", any(relay_handler))
        .with_state(state.clone());

    if prefix.is_empty() {
        return router.merge(rule);
    }

    // A nested catch-all needs a non-empty tail, so `<prefix>/` gets its own route.
    let bare = Router::new()
        .route(&format!("{prefix}/"), any(relay_handler))
        .with_state(state);
    router.nest(prefix, rule).merge(bare)
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Build a server with one `Forwarder` per configured rule.
    pub fn new(config: ProxyConfig) -> Result<Self, ValidationError> {
        let mut router = Router::new();
        for rule in &config.rules {
            let forwarder = Forwarder::new(rule.relay_config()?);
            router = mount(router, &rule.mount, forwarder, rule.transport_options());
            tracing::info!(
                rule = %rule.name,
                mount = %rule.mount,
                target_host = %rule.target_host,
                "Relay rule mounted"
            );
        }
        Ok(Self::with_router(config, router))
    }

    /// Serve an application-built router (e.g. forwarders with dynamic
    /// resolvers) with the standard middleware stack.
    pub fn with_router(config: ProxyConfig, router: Router) -> Self {
        let router = Self::apply_layers(&config, router);
        Self { router, config }
    }

    fn apply_layers(config: &ProxyConfig, router: Router) -> Router {
        router
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rules = self.config.rules.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn relay_handler(State(state): State<MountState>, request: Request) -> Response {
    let mut inbound = match read_inbound(request, &state.prefix).await {
        Ok(inbound) => inbound,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected inbound body");
            return rejection.into_response();
        }
    };

    if let Some(defaults) = &state.transport {
        if inbound.transport_options().is_none() {
            inbound.extensions.insert(defaults.clone());
        }
    }

    state.forwarder.handle(inbound).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RuleConfig;
    use crate::error::BoxError;
    use crate::relay::{OutboundRequest, RelayConfig, Transport, TransportBody};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::StatusCode;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Echoes the outbound URL and body back as the response body.
    #[derive(Clone, Default)]
    struct Echo(Arc<Mutex<Vec<OutboundRequest>>>);

    #[async_trait]
    impl Transport for Echo {
        async fn send(&self, request: OutboundRequest) -> Result<axum::http::Response<TransportBody>, BoxError> {
            let text = format!("{} {}", request.url, String::from_utf8_lossy(&request.body));
            self.0.lock().unwrap().push(request);
            let body = Full::new(Bytes::from(text))
                .map_err(|never| match never {})
                .boxed_unsync();
            Ok(axum::http::Response::new(body))
        }
    }

    fn router(echo: &Echo, path: &str) -> Router {
        let forwarder = Forwarder::new(RelayConfig::new("http://backend")).with_transport(echo.clone());
        let router = mount(Router::new(), path, forwarder, None);
        HttpServer::with_router(ProxyConfig::default(), router).into_router()
    }

    async fn call(router: Router, uri: &str, body: &'static str) -> (StatusCode, String) {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_nested_mount_strips_prefix() {
        let echo = Echo::default();
        let (status, text) = call(router(&echo, "/orders"), "/orders/v1/items?page=2", r#"{"a":1}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, r#"http://backend/v1/items?page=2 {"a":1}"#);
    }

    #[tokio::test]
    async fn test_mount_with_trailing_slash_forwarded() {
        let echo = Echo::default();
        let (status, text) = call(router(&echo, "/orders"), "/orders/?a=1", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "http://backend/?a=1 {}");

        let (_, text) = call(router(&echo, "/orders"), "/orders", "").await;
        assert_eq!(text, "http://backend {}");
    }

    #[tokio::test]
    async fn test_root_mount_keeps_path() {
        let echo = Echo::default();
        let (_, text) = call(router(&echo, "/"), "/anything/here", "").await;
        assert_eq!(text, "http://backend/anything/here {}");
    }

    #[tokio::test]
    async fn test_rule_timeout_applied_as_default() {
        let echo = Echo::default();
        let rule = RuleConfig {
            timeout_secs: Some(3),
            ..RuleConfig::new("orders", "/orders", "http://backend")
        };
        let forwarder = Forwarder::new(rule.relay_config().unwrap()).with_transport(echo.clone());
        let router = mount(Router::new(), &rule.mount, forwarder, rule.transport_options());

        call(router, "/orders/x", "{}").await;

        let sent = echo.0.lock().unwrap();
        assert_eq!(sent[0].transport, rule.transport_options());
    }

    #[tokio::test]
    async fn test_request_id_propagated() {
        let echo = Echo::default();
        let request = axum::http::Request::builder()
            .uri("/orders/x")
            .body(Body::empty())
            .unwrap();
        let response = router(&echo, "/orders").oneshot(request).await.unwrap();
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }
}
