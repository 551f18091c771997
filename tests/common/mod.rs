//! Shared fixtures for runner integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lifecycle_runner::config::LifecycleConfig;
use lifecycle_runner::{BoxError, Context, Error, Job, Resource};
use tokio_util::sync::CancellationToken;

/// Ordered record of collaborator calls, e.g. `init:db`, `release:db`.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

/// Runner config for tests: signals off, millisecond budgets.
pub fn config(initialization_ms: u64, termination_ms: u64) -> LifecycleConfig {
    LifecycleConfig {
        initialization_timeout_ms: initialization_ms,
        termination_timeout_ms: termination_ms,
        handle_signals: false,
        ..LifecycleConfig::default()
    }
}

/// Resource with scripted delays and failures.
pub struct TestResource {
    name: &'static str,
    log: EventLog,
    init_delay: Duration,
    init_error: Option<&'static str>,
    release_delay: Duration,
    release_error: Option<&'static str>,
}

impl TestResource {
    pub fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            log: log.clone(),
            init_delay: Duration::ZERO,
            init_error: None,
            release_delay: Duration::ZERO,
            release_error: None,
        }
    }

    pub fn init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn fail_init(mut self, message: &'static str) -> Self {
        self.init_error = Some(message);
        self
    }

    pub fn release_delay(mut self, delay: Duration) -> Self {
        self.release_delay = delay;
        self
    }

    pub fn fail_release(mut self, message: &'static str) -> Self {
        self.release_error = Some(message);
        self
    }

    pub fn arc(self) -> Arc<dyn Resource> {
        Arc::new(self)
    }
}

#[async_trait]
impl Resource for TestResource {
    async fn init(&self, ctx: &Context) -> Result<(), BoxError> {
        self.log.push(format!("init:{}", self.name));
        if let Err(err) = ctx.run(tokio::time::sleep(self.init_delay)).await {
            self.log.push(format!("init-aborted:{}", self.name));
            return Err(err.into());
        }
        match self.init_error {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }

    async fn release(&self, ctx: &Context) -> Result<(), BoxError> {
        self.log.push(format!("release:{}", self.name));
        ctx.run(tokio::time::sleep(self.release_delay)).await?;
        match self.release_error {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// How a `TestJob` behaves while running.
#[derive(Clone, Copy)]
pub enum Work {
    /// Run until shut down.
    Forever,
    /// Return `Ok(())` after the delay.
    Finish(Duration),
    /// Return an error after the delay.
    Fail(Duration, &'static str),
    /// Panic after the delay.
    Panic(Duration),
}

/// Job with scripted run/shutdown behaviour.
pub struct TestJob {
    name: &'static str,
    log: EventLog,
    work: Work,
    shutdown_delay: Duration,
    shutdown_error: Option<&'static str>,
    stop: CancellationToken,
}

impl TestJob {
    pub fn new(name: &'static str, log: &EventLog, work: Work) -> Self {
        Self {
            name,
            log: log.clone(),
            work,
            shutdown_delay: Duration::ZERO,
            shutdown_error: None,
            stop: CancellationToken::new(),
        }
    }

    pub fn shutdown_delay(mut self, delay: Duration) -> Self {
        self.shutdown_delay = delay;
        self
    }

    pub fn fail_shutdown(mut self, message: &'static str) -> Self {
        self.shutdown_error = Some(message);
        self
    }

    pub fn arc(self) -> Arc<dyn Job> {
        Arc::new(self)
    }
}

#[async_trait]
impl Job for TestJob {
    async fn run(&self) -> Result<(), BoxError> {
        self.log.push(format!("run:{}", self.name));
        let result: Result<(), BoxError> = match self.work {
            Work::Forever => {
                self.stop.cancelled().await;
                Ok(())
            }
            Work::Finish(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(()),
                    _ = self.stop.cancelled() => Ok(()),
                }
            }
            Work::Fail(delay, message) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Err(message.into()),
                    _ = self.stop.cancelled() => Ok(()),
                }
            }
            Work::Panic(delay) => {
                tokio::time::sleep(delay).await;
                panic!("{} exploded", self.name);
            }
        };
        self.log.push(format!("exit:{}", self.name));
        result
    }

    async fn shutdown(&self, ctx: &Context) -> Result<(), BoxError> {
        self.log.push(format!("shutdown:{}", self.name));
        let waited = ctx.run(tokio::time::sleep(self.shutdown_delay)).await;
        self.stop.cancel();
        if waited.is_err() {
            return Err(Error::DeadlineExceeded.into());
        }
        match self.shutdown_error {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}
