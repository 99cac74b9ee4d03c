//! JSON request relay.
//!
//! # Data Flow
//! ```text
//! InboundRequest (parsed JSON body, original URI, mount prefix)
//!     → resolve.rs (target host, extra headers, debug flag)
//!     → compose.rs (ForwardingContext → OutboundRequest)
//!     → curl.rs (optional x-curl-command header)
//!     → forward.rs (Transport::send, response head)
//!     → body.rs (RelayBody streams backend frames to the client)
//!     → ErrorHandler on the first failure
//! ```
//!
//! # Design Decisions
//! - RelayConfig is built once per rule and shared read-only via Arc
//! - One ForwardingContext per request, moved through every phase
//! - No retries, no caching, no inspection of the response body
//! - Host and path are joined by plain concatenation

pub mod body;
pub mod compose;
pub mod config;
pub mod context;
pub mod curl;
pub mod forward;
pub mod resolve;
pub mod setting;
pub mod transport;

pub use body::RelayBody;
pub use compose::OutboundRequest;
pub use config::RelayConfig;
pub use context::{ForwardingContext, InboundRequest};
pub use curl::CURL_COMMAND_HEADER;
pub use forward::Forwarder;
pub use setting::{Setting, TargetHost};
pub use transport::{HyperTransport, Transport, TransportBody, TransportOptions};
