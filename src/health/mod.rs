//! Health endpoint subsystem.
//!
//! # Data Flow
//! ```text
//! Kubelet / load balancer probe
//!     → http.rs (GET /liveness, GET /readiness)
//!     → lifecycle::State (alive / ready flags)
//!     → 200 or 400
//! ```
//!
//! # Design Decisions
//! - Probes only read state; the runner is the only writer
//! - Served as an ordinary Job, so it starts after resources and stops first

pub mod http;

pub use http::HealthJob;
