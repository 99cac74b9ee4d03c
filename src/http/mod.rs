//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, one mount per rule)
//!     → request.rs (request ID, read and decode the JSON body)
//!     → relay::Forwarder (resolve, compose, send, stream)
//!     → response.rs (strip hop-by-hop headers, render errors)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{read_inbound, BodyRejection, MakeRequestUuid, X_REQUEST_ID};
pub use response::DefaultErrorHandler;
pub use server::{mount, HttpServer};
