//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerResource::init  → bind TCP socket (bounded by init deadline)
//!     → Job takes the socket and serves on it
//! ListenerResource::release → close socket if still held
//! ```

pub mod listener;

pub use listener::{ListenerConfig, ListenerResource};
