//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay phases produce:
//!     → hooks.rs (start / end / error events per request)
//!     → logging.rs (RelayLogger capability, tracing subscriber)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Relay events are only emitted when a rule has a logger
//! - Logging never fails a request
//! - Request ID is attached by the HTTP layer, not here

pub mod hooks;
pub mod logging;
pub mod metrics;

pub use hooks::Hooks;
pub use logging::{LogEvent, RelayLogger, TracingLogger};
