//! Process lifecycle runner (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────┐
//!   │                         RUNNER                           │
//!   │                                                          │
//!   │  resources (in order)        jobs (concurrent)           │
//!   │  ┌──────────────┐            ┌──────────────────┐        │
//!   │  │   listener   │──socket──▶ │   health-http    │        │
//!   │  └──────────────┘            │ /liveness        │        │
//!   │                              │ /readiness       │        │
//!   │                              └────────┬─────────┘        │
//!   │                                       │ reads            │
//!   │                              ┌────────▼─────────┐        │
//!   │  signals ──▶ shutdown ──▶    │  alive / ready   │        │
//!   │                              └──────────────────┘        │
//!   └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use lifecycle_runner::config::loader::{apply_overrides, load_config};
use lifecycle_runner::config::variables::EnvironmentProvider;
use lifecycle_runner::health::HealthJob;
use lifecycle_runner::lifecycle::{Job, Resource, Runner, State};
use lifecycle_runner::net::{ListenerConfig, ListenerResource};
use lifecycle_runner::observability::{logging, metrics};
use lifecycle_runner::AppConfig;

#[derive(Parser)]
#[command(name = "lifecycle-runner")]
#[command(about = "Runs resources and jobs with graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        println!("Configuration OK");
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Error: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Runner stopped with error");
            ExitCode::FAILURE
        }
    }
}

fn load(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    Ok(apply_overrides(config, &EnvironmentProvider::new())?)
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("lifecycle-runner v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let mut resources: Vec<Arc<dyn Resource>> = Vec::new();
    let mut pending: Option<Arc<ListenerResource>> = None;
    if config.health.enabled {
        let listener = Arc::new(ListenerResource::new(ListenerConfig::new(
            config.health.bind_address.clone(),
            config.health.need_close,
        )));
        resources.push(listener.clone());
        pending = Some(listener);
    }

    tracing::info!(
        initialization_timeout_ms = config.lifecycle.initialization_timeout_ms,
        termination_timeout_ms = config.lifecycle.termination_timeout_ms,
        release_order = ?config.lifecycle.release_order,
        "Configuration loaded"
    );

    let state = Arc::new(State::new());
    let mut jobs: Vec<Arc<dyn Job>> = Vec::new();
    if let Some(listener) = pending {
        jobs.push(Arc::new(HealthJob::new(listener, state.clone())));
    }

    let runner = Runner::with_state(config.lifecycle, state, resources, jobs);
    runner.start().await?;
    Ok(())
}
