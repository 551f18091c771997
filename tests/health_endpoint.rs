//! Liveness/readiness endpoint tests over real sockets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lifecycle_runner::health::http::{router, LIVENESS_PATH, READINESS_PATH};
use lifecycle_runner::health::HealthJob;
use lifecycle_runner::net::{ListenerConfig, ListenerResource};
use lifecycle_runner::{Job, Probe, Resource, Runner, State};

mod common;
use common::{config, EventLog, TestResource};

struct FixedProbe {
    alive: AtomicBool,
    ready: AtomicBool,
}

impl Probe for FixedProbe {
    fn alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_probe_status_codes() {
    let probe = Arc::new(FixedProbe {
        alive: AtomicBool::new(true),
        ready: AtomicBool::new(false),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(probe.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = client();
    let live = client
        .get(format!("http://{}{}", addr, LIVENESS_PATH))
        .send()
        .await
        .unwrap();
    assert_eq!(live.status(), 200);
    let body: serde_json::Value = live.json().await.unwrap();
    assert_eq!(body["ok"], true);

    let ready = client
        .get(format!("http://{}{}", addr, READINESS_PATH))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), 400);

    probe.ready.store(true, Ordering::SeqCst);
    let ready = client
        .get(format!("http://{}{}", addr, READINESS_PATH))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), 200);
}

#[tokio::test]
async fn test_health_job_under_runner() {
    let log = EventLog::default();
    let state = Arc::new(State::new());
    let listener = Arc::new(ListenerResource::new(ListenerConfig::new("127.0.0.1:0", true)));

    let resources: Vec<Arc<dyn Resource>> = vec![
        TestResource::new("db", &log).arc(),
        listener.clone(),
    ];
    let jobs: Vec<Arc<dyn Job>> = vec![Arc::new(HealthJob::new(listener.clone(), state.clone()))];
    let runner = Arc::new(Runner::with_state(config(5000, 5000), state.clone(), resources, jobs));

    let handle = tokio::spawn({
        let runner = runner.clone();
        async move { runner.start().await }
    });

    while !state.ready() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let addr = listener.local_addr().unwrap();

    // The server task may still be starting; retry briefly.
    let client = client();
    let mut status = None;
    for _ in 0..50 {
        if let Ok(res) = client
            .get(format!("http://{}{}", addr, READINESS_PATH))
            .send()
            .await
        {
            status = Some(res.status());
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status.unwrap(), 200);

    let live = client
        .get(format!("http://{}{}", addr, LIVENESS_PATH))
        .send()
        .await
        .unwrap();
    assert_eq!(live.status(), 200);

    runner.cancellation_token().cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("runner did not stop")
        .unwrap();
    assert!(result.is_ok(), "unexpected error: {:?}", result);
    assert!(!state.alive());
    assert!(log.contains("release:db"));

    assert!(client
        .get(format!("http://{}{}", addr, LIVENESS_PATH))
        .send()
        .await
        .is_err());
}
