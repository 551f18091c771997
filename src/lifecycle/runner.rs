//! The runner: resource acquisition, job execution and graceful teardown.
//!
//! # Data Flow
//! ```text
//! start():
//!     install signal handlers
//!     → init resources (sequential, initialization budget)
//!     → spawn every job, mark ready
//!     → wait: first job exit | termination signal | token cancelled
//!     → shutdown()
//!
//! shutdown():
//!     close the gate, cancel the top-level context
//!     → wait for an in-flight init to return
//!     → shutdown launched jobs (in order) → release initialized resources
//!     all within the termination budget
//! ```
//!
//! # Design Decisions
//! - Budgets race a timer against a spawned task; when the timer wins the
//!   context handed to collaborators is cancelled, the task is not aborted
//! - Teardown collects failures instead of stopping at the first one
//! - Only resources whose `init` was invoked are released
//! - A gate shared by init, job launch and teardown closes once teardown
//!   begins; nothing starts after that point
//! - Every `shutdown` caller awaits the one teardown and gets its outcome

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures_util::future::join_all;
use futures_util::FutureExt;
use tokio::sync::{mpsc, OnceCell};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::{LifecycleConfig, ReleaseOrder};
use crate::error::{aggregate, Error};
use crate::lifecycle::context::Context;
use crate::lifecycle::job::Job;
use crate::lifecycle::resource::Resource;
use crate::lifecycle::signals::{TerminationSignal, TerminationSignals};
use crate::lifecycle::state::{Phase, State};
use crate::observability::metrics;

/// Completion events posted by job tasks.
enum JobEvent {
    /// A job returned an error or panicked.
    Failed(Error),
    /// Every job returned without error.
    Finished,
}

/// What has been started, and whether teardown has closed the runner.
#[derive(Debug, Default)]
struct Gate {
    /// Number of resources whose `init` has been invoked.
    initialized: usize,
    jobs_launched: bool,
    closed: bool,
}

fn lock_gate(gate: &Mutex<Gate>) -> MutexGuard<'_, Gate> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process lifecycle coordinator.
pub struct Runner {
    resources: Arc<[Arc<dyn Resource>]>,
    jobs: Arc<[Arc<dyn Job>]>,
    config: LifecycleConfig,
    state: Arc<State>,
    root: Context,
    started: AtomicBool,
    gate: Arc<Mutex<Gate>>,
    /// Cancelled once the initialization task has returned.
    init_settled: CancellationToken,
    teardown_outcome: OnceCell<Result<(), Error>>,
}

impl Runner {
    /// Create a runner. Resources initialize and jobs are listed in the given order.
    pub fn new(
        config: LifecycleConfig,
        resources: Vec<Arc<dyn Resource>>,
        jobs: Vec<Arc<dyn Job>>,
    ) -> Self {
        Self::with_state(config, Arc::new(State::new()), resources, jobs)
    }

    /// Create a runner around an existing state, so jobs built before the
    /// runner (health endpoints) can observe it.
    pub fn with_state(
        config: LifecycleConfig,
        state: Arc<State>,
        resources: Vec<Arc<dyn Resource>>,
        jobs: Vec<Arc<dyn Job>>,
    ) -> Self {
        Self {
            resources: Arc::from(resources),
            jobs: Arc::from(jobs),
            config,
            state,
            root: Context::background(),
            started: AtomicBool::new(false),
            gate: Arc::new(Mutex::new(Gate::default())),
            init_settled: CancellationToken::new(),
            teardown_outcome: OnceCell::new(),
        }
    }

    /// Shared liveness/readiness state.
    pub fn state(&self) -> Arc<State> {
        Arc::clone(&self.state)
    }

    /// Token for the top-level context. Cancelling it makes `start` shut down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.root.token().clone()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Run the whole lifecycle. Returns once everything has been torn down.
    ///
    /// Resource init failures are returned unchanged. Otherwise the result
    /// aggregates the first job failure (if any) with the shutdown outcome.
    /// If `shutdown` is called while resources are initializing, no job is
    /// launched and the teardown outcome is returned.
    pub async fn start(&self) -> Result<(), Error> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }
        let _alive = AliveGuard { state: &self.state };

        let mut signals = if self.config.handle_signals {
            let signals = TerminationSignals::install().map_err(|e| Error::Signal(Arc::new(e)))?;
            Some(signals)
        } else {
            None
        };

        if !self.begin_initialization() {
            tracing::info!("Shutdown requested before start");
            return self.shutdown().await;
        }
        if let Err(err) = self.init().await {
            if self.is_closed() {
                tracing::info!("Shutdown requested during initialization");
                return self.shutdown().await;
            }
            tracing::error!(error = %err, "Resource initialization failed");
            if self.config.release_on_init_failure {
                if let Err(release_err) = self.shutdown().await {
                    tracing::warn!(error = %release_err, "Release after failed initialization reported errors");
                }
            }
            return Err(err);
        }

        let Some(mut completions) = self.launch_jobs() else {
            tracing::info!("Shutdown requested during initialization");
            return self.shutdown().await;
        };
        tracing::info!(
            resources = self.resources.len(),
            jobs = self.jobs.len(),
            "Runner ready"
        );

        let job_result = tokio::select! {
            event = completions.recv() => match event {
                Some(JobEvent::Failed(err)) => {
                    tracing::error!(error = %err, "Job failed, shutting down");
                    Err(err)
                }
                Some(JobEvent::Finished) | None => {
                    tracing::info!("All jobs finished");
                    Ok(())
                }
            },
            signal = wait_for_signal(&mut signals) => {
                tracing::info!(signal = %signal, "Termination signal received");
                Ok(())
            }
            _ = self.root.token().cancelled() => {
                tracing::info!("Runner cancelled");
                Ok(())
            }
        };

        let shutdown_result = self.shutdown().await;
        aggregate([job_result, shutdown_result])
    }

    /// Shut down launched jobs, then release initialized resources.
    ///
    /// Only the first call tears anything down. Concurrent and later calls
    /// wait for that teardown and return its outcome.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.teardown_outcome
            .get_or_init(|| self.teardown())
            .await
            .clone()
    }

    async fn teardown(&self) -> Result<(), Error> {
        let (jobs, resources) = {
            let mut gate = lock_gate(&self.gate);
            gate.closed = true;
            self.state.set_phase(Phase::ShuttingDown);

            let jobs: Vec<Arc<dyn Job>> = if gate.jobs_launched {
                self.jobs.to_vec()
            } else {
                Vec::new()
            };
            let initialized = gate.initialized.min(self.resources.len());
            let mut resources = self.resources[..initialized].to_vec();
            if self.config.release_order == ReleaseOrder::Reverse {
                resources.reverse();
            }
            (jobs, resources)
        };
        // Stops an in-flight initialization and wakes `start`.
        self.root.cancel();

        let timeout = self.config.termination_timeout();
        let ctx = Context::background().with_timeout(timeout);

        tracing::info!(
            jobs = jobs.len(),
            resources = resources.len(),
            timeout_ms = self.config.termination_timeout_ms,
            "Graceful shutdown started"
        );

        let started = Instant::now();
        let task_ctx = ctx.clone();
        let init_settled = self.init_settled.clone();
        let task = tokio::spawn(async move {
            // Resources are not released while their `init` may still be running.
            if !resources.is_empty() {
                init_settled.cancelled().await;
            }
            release_all(&task_ctx, &jobs, &resources).await
        });

        let result = match time::timeout(timeout, task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(_))) if ctx.deadline_exceeded() => Err(Error::ShutdownDeadline),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(join_err)) => Err(Error::Task(join_err.to_string())),
            Err(_) => {
                ctx.cancel();
                Err(Error::ShutdownDeadline)
            }
        };

        metrics::record_shutdown(started.elapsed(), result.is_ok());
        match &result {
            Ok(()) => tracing::info!(elapsed = ?started.elapsed(), "Shutdown complete"),
            Err(err) => tracing::warn!(error = %err, "Shutdown finished with errors"),
        }
        self.state.set_phase(Phase::Stopped);
        result
    }

    fn is_closed(&self) -> bool {
        lock_gate(&self.gate).closed
    }

    /// Enter `Initializing` unless teardown already closed the runner.
    fn begin_initialization(&self) -> bool {
        let gate = lock_gate(&self.gate);
        if gate.closed {
            return false;
        }
        self.state.set_phase(Phase::Initializing);
        true
    }

    async fn init(&self) -> Result<(), Error> {
        let timeout = self.config.initialization_timeout();
        let ctx = self.root.with_timeout(timeout);

        let resources = Arc::clone(&self.resources);
        let gate = Arc::clone(&self.gate);
        let settled = self.init_settled.clone();
        let task_ctx = ctx.clone();
        let task = tokio::spawn(async move {
            let _settled = settled.drop_guard();
            for (index, resource) in resources.iter().enumerate() {
                if let Some(err) = task_ctx.err() {
                    return Err(err);
                }
                {
                    let mut gate = lock_gate(&gate);
                    if gate.closed {
                        return Err(Error::Cancelled);
                    }
                    gate.initialized = index + 1;
                }

                let started = Instant::now();
                resource.init(&task_ctx).await.map_err(Error::resource)?;
                metrics::record_resource_init(resource.name(), started.elapsed());
                tracing::debug!(resource = resource.name(), "Resource initialized");
            }
            Ok(())
        });

        match time::timeout(timeout, task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(_))) if ctx.deadline_exceeded() => Err(Error::InitializationDeadline),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(join_err)) => Err(Error::Task(join_err.to_string())),
            Err(_) => {
                ctx.cancel();
                tracing::warn!(
                    timeout_ms = self.config.initialization_timeout_ms,
                    "Initialization budget elapsed"
                );
                Err(Error::InitializationDeadline)
            }
        }
    }

    /// Spawn every job and mark the runner ready.
    ///
    /// Returns `None` without launching anything if teardown has begun.
    fn launch_jobs(&self) -> Option<mpsc::UnboundedReceiver<JobEvent>> {
        let mut gate = lock_gate(&self.gate);
        if gate.closed {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let failed = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(self.jobs.len());
        for job in self.jobs.iter() {
            tracing::debug!(job = job.name(), "Job launched");
            let job = Arc::clone(job);
            let tx = tx.clone();
            let failed = Arc::clone(&failed);
            handles.push(tokio::spawn(async move {
                let err = match AssertUnwindSafe(job.run()).catch_unwind().await {
                    Ok(Ok(())) => {
                        tracing::debug!(job = job.name(), "Job finished");
                        metrics::record_job_exit("ok");
                        return;
                    }
                    Ok(Err(e)) => Error::job(e),
                    Err(panic) => Error::JobPanicked {
                        message: panic_message(panic.as_ref()),
                    },
                };
                tracing::warn!(job = job.name(), error = %err, "Job exited with error");
                metrics::record_job_exit("error");
                failed.store(true, Ordering::SeqCst);
                let _ = tx.send(JobEvent::Failed(err));
            }));
        }
        gate.jobs_launched = true;
        self.state.set_ready(true);
        self.state.set_phase(Phase::Running);
        drop(gate);

        tokio::spawn(async move {
            join_all(handles).await;
            if !failed.load(Ordering::SeqCst) {
                let _ = tx.send(JobEvent::Finished);
            }
        });

        Some(rx)
    }
}

/// Marks the process not alive when `start` returns, on every path.
struct AliveGuard<'a> {
    state: &'a State,
}

impl Drop for AliveGuard<'_> {
    fn drop(&mut self) {
        self.state.set_alive(false);
        self.state.set_phase(Phase::Stopped);
    }
}

async fn wait_for_signal(signals: &mut Option<TerminationSignals>) -> TerminationSignal {
    match signals {
        Some(signals) => signals.recv().await,
        None => std::future::pending().await,
    }
}

async fn release_all(
    ctx: &Context,
    jobs: &[Arc<dyn Job>],
    resources: &[Arc<dyn Resource>],
) -> Result<(), Error> {
    let mut results = Vec::with_capacity(jobs.len() + resources.len());

    for job in jobs {
        let result = job.shutdown(ctx).await.map_err(Error::job);
        if let Err(err) = &result {
            tracing::warn!(job = job.name(), error = %err, "Job shutdown failed");
        }
        results.push(result);
    }

    for resource in resources {
        let result = resource.release(ctx).await.map_err(Error::resource);
        match &result {
            Ok(()) => tracing::debug!(resource = resource.name(), "Resource released"),
            Err(err) => tracing::warn!(resource = resource.name(), error = %err, "Resource release failed"),
        }
        results.push(result);
    }

    aggregate(results)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
