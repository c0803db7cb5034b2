use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::checks::{CheckRegistry, CheckTally};
use crate::domain::STATUS_CHECK;

/// Highest trackable latency in microseconds (60s); slower responses clamp here.
const LATENCY_MAX_US: u64 = 60_000_000;
const LATENCY_SIGFIG: u8 = 3;

/// Active VU count observed by the ramp controller at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VuSample {
    pub elapsed: Duration,
    pub target: u32,
    pub active: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub samples: u64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.is_empty() {
            return Self::default();
        }
        let ms = |us: u64| us as f64 / 1000.0;
        Self {
            samples: hist.len(),
            p50_ms: ms(hist.value_at_quantile(0.50)),
            p95_ms: ms(hist.value_at_quantile(0.95)),
            max_ms: ms(hist.max()),
        }
    }
}

#[derive(Debug)]
struct StatsInner {
    iterations: u64,
    statuses: BTreeMap<u16, u64>,
    transport_errors: u64,
    /// Response latencies in microseconds
    latencies: Histogram<u64>,
}

/// Counters shared by all VUs of one run.
#[derive(Debug)]
pub struct RunStats {
    inner: Mutex<StatsInner>,
}

impl RunStats {
    pub fn new() -> Result<Self> {
        let latencies = Histogram::new_with_bounds(1, LATENCY_MAX_US, LATENCY_SIGFIG)
            .context("failed to create latency histogram")?;
        Ok(Self {
            inner: Mutex::new(StatsInner {
                iterations: 0,
                statuses: BTreeMap::new(),
                transport_errors: 0,
                latencies,
            }),
        })
    }

    pub fn record_response(&self, status: u16, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        let mut inner = self.inner.lock();
        *inner.statuses.entry(status).or_insert(0) += 1;
        inner.latencies.saturating_record(micros);
    }

    pub fn record_transport_error(&self) {
        self.inner.lock().transport_errors += 1;
    }

    pub fn record_iteration(&self) {
        self.inner.lock().iterations += 1;
    }

    pub fn iterations(&self) -> u64 {
        self.inner.lock().iterations
    }

    pub fn summarize(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        checks: &CheckRegistry,
        vu_timeline: Vec<VuSample>,
    ) -> RunSummary {
        let (iterations, statuses, transport_errors, latency) = {
            let inner = self.inner.lock();
            (
                inner.iterations,
                inner.statuses.clone(),
                inner.transport_errors,
                LatencySummary::from_histogram(&inner.latencies),
            )
        };
        let peak_vus = vu_timeline.iter().map(|s| s.active).max().unwrap_or(0);
        RunSummary {
            run_id,
            started_at,
            elapsed,
            iterations,
            checks: checks.snapshot(),
            statuses,
            transport_errors,
            latency,
            peak_vus,
            vu_timeline,
        }
    }
}

/// End-of-run report returned by [`super::LoadDriver::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub iterations: u64,
    pub checks: BTreeMap<String, CheckTally>,
    pub statuses: BTreeMap<u16, u64>,
    pub transport_errors: u64,
    pub latency: LatencySummary,
    pub peak_vus: u32,
    pub vu_timeline: Vec<VuSample>,
}

impl RunSummary {
    pub fn status_check(&self) -> CheckTally {
        self.checks.get(STATUS_CHECK).copied().unwrap_or_default()
    }

    pub fn log(&self) {
        let status = self.status_check();
        info!(
            run_id = %self.run_id,
            elapsed_s = self.elapsed.as_secs_f64(),
            iterations = self.iterations,
            peak_vus = self.peak_vus,
            checks_passed = status.passes,
            checks_failed = status.fails,
            pass_rate = status.pass_rate(),
            transport_errors = self.transport_errors,
            p50_ms = self.latency.p50_ms,
            p95_ms = self.latency.p95_ms,
            max_ms = self.latency.max_ms,
            "load run summary"
        );
        for (name, tally) in &self.checks {
            info!(check = %name, passes = tally.passes, fails = tally.fails, pass_rate = tally.pass_rate(), "check");
        }
        for (code, count) in &self.statuses {
            info!(status = code, count, "responses by status");
        }
    }
}
