//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Uri};
use axum::routing::any;
use axum::{Json, Router};
use futures_util::stream;
use json_relay::config::RuleConfig;
use json_relay::{HttpServer, ProxyConfig, Shutdown};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// A running relay. Dropping it shuts the server down.
pub struct Relay {
    pub addr: SocketAddr,
    _shutdown: Shutdown,
}

impl Relay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a relay serving the given rules.
pub async fn start_relay(rules: Vec<RuleConfig>) -> Relay {
    start_relay_config(ProxyConfig {
        rules,
        ..Default::default()
    })
    .await
}

pub async fn start_relay_config(config: ProxyConfig) -> Relay {
    start_server(HttpServer::new(config).unwrap()).await
}

/// Start a relay around a hand-built router.
pub async fn start_relay_with(config: ProxyConfig, router: Router) -> Relay {
    start_server(HttpServer::with_router(config, router)).await
}

async fn start_server(server: HttpServer) -> Relay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });
    Relay {
        addr,
        _shutdown: shutdown,
    }
}

/// Serve `router` as a backend on an ephemeral port.
pub async fn spawn_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Backend answering every request with a JSON description of it.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        Json(json!({
            "method": method.as_str(),
            "uri": uri.to_string(),
            "body": String::from_utf8_lossy(&body),
            "content_type": header("content-type"),
            "accept": header("accept"),
            "api_key": header("x-api-key"),
        }))
    }

    spawn_backend(Router::new().fallback(echo)).await
}

/// Raw-TCP backend writing `response` verbatim, then closing.
pub async fn start_raw_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Sets its flag when the backend stream holding it is dropped.
pub struct ReleaseFlag(pub Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Backend streaming 16 KiB chunks forever. `released` flips once the
/// stream is dropped.
pub async fn start_endless_backend(released: Arc<AtomicBool>) -> SocketAddr {
    let handler = move || {
        let guard = ReleaseFlag(released.clone());
        async move {
            let chunks = stream::unfold(guard, |guard| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                let chunk: Result<Bytes, std::io::Error> = Ok(Bytes::from(vec![b' '; 16 * 1024]));
                Some((chunk, guard))
            });
            Body::from_stream(chunks)
        }
    };
    spawn_backend(Router::new().route("/feed", any(handler))).await
}

/// Backend that answers after `delay`.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let handler = move || async move {
        tokio::time::sleep(delay).await;
        Json(json!({"late": true}))
    };
    spawn_backend(Router::new().fallback(handler)).await
}

/// Address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Poll `flag` until it is set or `timeout` elapses.
pub async fn wait_for(flag: &AtomicBool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    flag.load(Ordering::SeqCst)
}
