//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Runner (runner.rs):
//!     Init resources → Launch jobs → Ready → Wait for trigger → Shutdown
//!
//! Triggers:
//!     first job exit | SIGHUP/SIGINT/SIGTERM/SIGQUIT (signals.rs) | token cancelled
//!
//! Shutdown:
//!     Shutdown jobs → Release resources → Stopped
//! ```
//!
//! # Design Decisions
//! - Ordered startup: resources one at a time, in registration order
//! - Jobs start only after every resource is initialized
//! - Startup and shutdown have independent budgets (context.rs)
//! - Liveness/readiness flags live in state.rs, written only by the runner

pub mod context;
pub mod job;
pub mod resource;
pub mod runner;
pub mod signals;
pub mod state;

pub use context::Context;
pub use job::Job;
pub use resource::Resource;
pub use runner::Runner;
pub use state::{Phase, Probe, State};
