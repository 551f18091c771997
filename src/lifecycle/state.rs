//! Process liveness/readiness state.
//!
//! # States
//! ```text
//! NotStarted → Initializing → Running → ShuttingDown → Stopped
//! Initializing → Stopped            (resource init failed)
//! ```
//!
//! # Design Decisions
//! - Owned by the runner, shared with probes via `Arc<State>`
//! - Only the runner mutates it; setters are crate-private
//! - Atomics instead of a lock: flags are read on every probe request

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::observability::metrics;

/// Coordinator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    NotStarted = 0,
    Initializing = 1,
    Running = 2,
    ShuttingDown = 3,
    Stopped = 4,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::NotStarted,
            1 => Phase::Initializing,
            2 => Phase::Running,
            3 => Phase::ShuttingDown,
            _ => Phase::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NotStarted => "not_started",
            Phase::Initializing => "initializing",
            Phase::Running => "running",
            Phase::ShuttingDown => "shutting_down",
            Phase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read side of the lifecycle flags, as seen by health endpoints.
pub trait Probe: Send + Sync {
    fn alive(&self) -> bool;
    fn ready(&self) -> bool;
}

/// Liveness and readiness flags plus the current phase.
#[derive(Debug)]
pub struct State {
    alive: AtomicBool,
    ready: AtomicBool,
    phase: AtomicU8,
}

impl State {
    /// Alive, not ready, not started.
    pub fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
            ready: AtomicBool::new(false),
            phase: AtomicU8::new(Phase::NotStarted as u8),
        }
    }

    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub(crate) fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
        metrics::record_alive(alive);
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
        metrics::record_ready(ready);
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        let previous = Phase::from_u8(self.phase.swap(phase as u8, Ordering::SeqCst));
        if previous != phase {
            tracing::debug!(from = %previous, to = %phase, "Runner phase changed");
            metrics::record_phase(phase);
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for State {
    fn alive(&self) -> bool {
        State::alive(self)
    }

    fn ready(&self) -> bool {
        State::ready(self)
    }
}
