//! JSON request relay library.
//!
//! Mounts forwarding rules on an axum router. Each rule resolves a backend
//! host, rebuilds the inbound JSON request for it, and streams the backend
//! response back to the client with backpressure.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;

pub use config::schema::ProxyConfig;
pub use error::{BoxError, ErrorHandler, ErrorKind, ForwardError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{Forwarder, InboundRequest, RelayConfig, Setting, TargetHost};
