//! Stress Testing Suite for the load driver
//!
//! Verifies the driver itself holds up when pushed well past the default
//! schedule:
//! - Hundreds of concurrent VUs against a live HTTP endpoint
//! - Minimal (1ms) think-time hot loops
//! - Rapid ramp up / ramp down churn
//!
//! Key Requirements:
//! - No check failures or transport errors against a healthy endpoint
//! - Order ids stay unique across every VU and iteration
//! - The run drains to zero VUs and returns within the schedule plus slack

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use payment_load_driver::client::{HttpTransactionClient, TransactionClient, TransportError};
use payment_load_driver::domain::{ResponseOutcome, Schedule, Stage, TransactionRequest};
use payment_load_driver::driver::{DriverConfig, LoadDriver};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Answers instantly, counting requests.
#[derive(Default)]
struct CountingClient {
    sent: AtomicU64,
}

#[async_trait]
impl TransactionClient for CountingClient {
    async fn submit(&self, _request: &TransactionRequest) -> Result<ResponseOutcome, TransportError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(ResponseOutcome::new(200, "{}", Duration::ZERO))
    }
}

/// Test: 200 VUs hammering a live endpoint with the minimum think time
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Ignore by default as this is a slow test
async fn test_many_vus_against_http_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/middleware/v1/transaction"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true}))
                .set_delay(Duration::from_millis(5)),
        )
        .mount(&server)
        .await;

    let client = Arc::new(
        HttpTransactionClient::new(
            format!("{}/api/middleware/v1/transaction", server.uri()),
            "stress",
            Duration::from_secs(10),
        )
        .unwrap(),
    );
    let config = DriverConfig {
        schedule: Schedule::new(vec![
            Stage::new(Duration::from_secs(1), 200),
            Stage::new(Duration::from_secs(3), 200),
            Stage::new(Duration::from_secs(1), 0),
        ])
        .unwrap(),
        think_time: Duration::from_millis(1),
        ramp_tick: Duration::from_millis(50),
        ..DriverConfig::default()
    };

    let started = Instant::now();
    let summary = LoadDriver::new(config, client)
        .unwrap()
        .run(CancellationToken::new())
        .await;
    let wall = started.elapsed();

    println!(
        "iterations: {}, p95: {:.1}ms, wall: {:?}",
        summary.iterations, summary.latency.p95_ms, wall
    );

    assert!(summary.iterations > 1_000, "only {} iterations", summary.iterations);
    assert_eq!(summary.status_check().fails, 0);
    assert_eq!(summary.transport_errors, 0);
    assert_eq!(summary.peak_vus, 200);
    assert!(wall < Duration::from_secs(15), "run took {wall:?}");

    let received = server.received_requests().await.unwrap();
    let ids: HashSet<String> = received
        .iter()
        .map(|r| serde_json::from_slice::<TransactionRequest>(&r.body).unwrap().internal_order_id)
        .collect();
    assert_eq!(ids.len(), received.len());
}

/// Test: saw-tooth schedule churning VUs up and down
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Ignore by default as this is a slow test
async fn test_ramp_churn_drains_cleanly() {
    let client = Arc::new(CountingClient::default());
    let stages = (0..10)
        .map(|i| {
            let target = if i % 2 == 0 { 500 } else { 0 };
            Stage::new(Duration::from_millis(300), target)
        })
        .collect();
    let config = DriverConfig {
        schedule: Schedule::new(stages).unwrap(),
        think_time: Duration::from_millis(10),
        ramp_tick: Duration::from_millis(10),
        ..DriverConfig::default()
    };

    let summary = LoadDriver::new(config, client.clone())
        .unwrap()
        .run(CancellationToken::new())
        .await;

    assert_eq!(summary.iterations, client.sent.load(Ordering::Relaxed));
    assert_eq!(summary.status_check().passes, summary.iterations);
    assert_eq!(summary.vu_timeline.last().unwrap().active, 0);
    assert!(summary.peak_vus > 400);
}
