//! Process lifecycle runner library.
//!
//! Brings resources online in order, runs jobs concurrently, and tears
//! everything down on job failure, termination signal, or natural completion.

pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::AppConfig;
pub use error::{aggregate, BoxError, Error, MultiError, SharedError};
pub use lifecycle::{Context, Job, Phase, Probe, Resource, Runner, State};
