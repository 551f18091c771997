//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Runner phases, resource init, job exits, teardown:
//!     → logging.rs (structured log events)
//!     → metrics.rs (gauges, counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
