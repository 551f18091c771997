//! Liveness/readiness HTTP endpoints.
//!
//! # Responsibilities
//! - Serve `GET /liveness` and `GET /readiness` from a `Probe`
//! - Run as a `Job` on the socket bound by a `ListenerResource`
//!
//! # Design Decisions
//! - 200 when the flag is set, 400 otherwise
//! - `shutdown` uses axum graceful shutdown and waits for `run` to return

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::error::{BoxError, Error};
use crate::lifecycle::{Context, Job, Probe};
use crate::net::listener::{ListenerError, ListenerResource};

pub const LIVENESS_PATH: &str = "/liveness";
pub const READINESS_PATH: &str = "/readiness";

/// Error type for the health server.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("health server failed: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Debug, Serialize)]
pub struct ProbeStatus {
    pub probe: &'static str,
    pub ok: bool,
}

/// Build the probe router.
pub fn router(probe: Arc<dyn Probe>) -> Router {
    Router::new()
        .route(LIVENESS_PATH, get(liveness))
        .route(READINESS_PATH, get(readiness))
        .with_state(probe)
        .layer(TraceLayer::new_for_http())
}

async fn liveness(State(probe): State<Arc<dyn Probe>>) -> (StatusCode, Json<ProbeStatus>) {
    respond("liveness", probe.alive())
}

async fn readiness(State(probe): State<Arc<dyn Probe>>) -> (StatusCode, Json<ProbeStatus>) {
    respond("readiness", probe.ready())
}

fn respond(probe: &'static str, ok: bool) -> (StatusCode, Json<ProbeStatus>) {
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(ProbeStatus { probe, ok }))
}

/// Job serving the probe endpoints.
pub struct HealthJob {
    listener: Arc<ListenerResource>,
    probe: Arc<dyn Probe>,
    stop: CancellationToken,
    finished_tx: watch::Sender<bool>,
    finished_rx: watch::Receiver<bool>,
}

impl HealthJob {
    pub fn new(listener: Arc<ListenerResource>, probe: Arc<dyn Probe>) -> Self {
        let (finished_tx, finished_rx) = watch::channel(false);
        Self {
            listener,
            probe,
            stop: CancellationToken::new(),
            finished_tx,
            finished_rx,
        }
    }
}

#[async_trait]
impl Job for HealthJob {
    async fn run(&self) -> Result<(), BoxError> {
        let result = self.serve().await;
        let _ = self.finished_tx.send(true);
        result.map_err(Into::into)
    }

    async fn shutdown(&self, ctx: &Context) -> Result<(), BoxError> {
        self.stop.cancel();

        let mut finished = self.finished_rx.clone();
        let wait = async move { finished.wait_for(|done| *done).await.is_ok() };
        match ctx.run(wait).await {
            Ok(_) => Ok(()),
            Err(Error::Cancelled) | Err(Error::DeadlineExceeded) => Err(Error::DeadlineExceeded.into()),
            Err(err) => Err(err.into()),
        }
    }

    fn name(&self) -> &str {
        "health-http"
    }
}

impl HealthJob {
    async fn serve(&self) -> Result<(), HealthServerError> {
        if self.stop.is_cancelled() {
            return Ok(());
        }
        let listener = self.listener.take()?;
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Health endpoints serving");
        }

        let stop = self.stop.clone();
        axum::serve(listener, router(Arc::clone(&self.probe)))
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
            .map_err(HealthServerError::Serve)?;

        tracing::info!("Health endpoints stopped");
        Ok(())
    }
}
