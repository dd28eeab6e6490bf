//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Limiter, contexts and governor produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (admission counters, token gauges, context outcomes)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Operation id is attached to every context log event
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
