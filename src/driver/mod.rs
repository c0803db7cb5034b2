//! # Load Driver
//!
//! Interprets a [`Schedule`] as a virtual-user count over time and keeps that
//! many [`VirtualUser`] tasks alive, each running the transaction iteration
//! in a loop with think-time in between.
//!
//! ## Ramp control
//!
//! Every `ramp_tick` the driver compares the schedule's target with the
//! number of live VUs:
//! - **below target**: spawn new VUs with fresh ids (ids are never reused)
//! - **above target**: signal the most recently spawned VUs to stop
//!
//! A stopped VU finishes its in-flight iteration and starts no new one. When
//! the schedule ends or the run token is cancelled, every VU is signalled and
//! awaited before the [`RunSummary`] is built.

pub mod checks;
pub mod iteration;
pub mod stats;
pub mod vu;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use checks::{CheckRegistry, CheckTally};
pub use iteration::{run_iteration, IterationReport};
pub use stats::{LatencySummary, RunStats, RunSummary, VuSample};
pub use vu::VirtualUser;

use crate::client::TransactionClient;
use crate::config::Config;
use crate::domain::{PayloadTemplate, Schedule};

/// Immutable run configuration handed to the driver at start.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub schedule: Schedule,
    pub template: PayloadTemplate,
    pub think_time: Duration,
    pub ramp_tick: Duration,
    /// Base seed for per-VU rngs (None = entropy)
    pub random_seed: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            schedule: Schedule::default(),
            template: PayloadTemplate::default(),
            think_time: Duration::from_secs(1),
            ramp_tick: Duration::from_millis(250),
            random_seed: None,
        }
    }
}

impl TryFrom<&Config> for DriverConfig {
    type Error = anyhow::Error;

    fn try_from(cfg: &Config) -> Result<Self> {
        let schedule = Schedule::from_specs(&cfg.run.stages)?;
        Ok(Self {
            schedule,
            template: PayloadTemplate {
                order_prefix: cfg.payload.order_prefix.clone(),
                amount: cfg.payload.amount_min..=cfg.payload.amount_max,
                currencies: cfg.payload.currencies.clone(),
                service_type: cfg.payload.service_type.clone(),
            },
            think_time: Duration::from_millis(cfg.run.think_time_ms),
            ramp_tick: Duration::from_millis(cfg.run.ramp_tick_ms.max(1)),
            random_seed: cfg.run.random_seed,
        })
    }
}

struct Worker {
    id: u32,
    stop: CancellationToken,
    handle: JoinHandle<u64>,
}

pub struct LoadDriver {
    config: Arc<DriverConfig>,
    client: Arc<dyn TransactionClient>,
    checks: Arc<CheckRegistry>,
    stats: Arc<RunStats>,
}

impl LoadDriver {
    pub fn new(config: DriverConfig, client: Arc<dyn TransactionClient>) -> Result<Self> {
        Ok(Self {
            config: Arc::new(config),
            client,
            checks: Arc::new(CheckRegistry::new()),
            stats: Arc::new(RunStats::new()?),
        })
    }

    /// Consume the schedule once, start to end, and report what happened.
    pub async fn run(self, cancel: CancellationToken) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let schedule = &self.config.schedule;

        info!(
            %run_id,
            stages = schedule.stages().len(),
            total_s = schedule.total_duration().as_secs_f64(),
            peak_target = schedule.peak_target(),
            "load run starting"
        );

        let mut workers: Vec<Worker> = Vec::new();
        let mut retired: Vec<JoinHandle<u64>> = Vec::new();
        let mut timeline: Vec<VuSample> = Vec::new();
        let mut next_vu_id = 1u32;
        let mut current_stage = None;

        let mut ticker = interval(self.config.ramp_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(%run_id, "load run cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let elapsed = start.elapsed();
            let Some(stage) = schedule.stage_index_at(elapsed) else {
                break;
            };
            let target = schedule.target_at(elapsed);
            if current_stage != Some(stage) {
                current_stage = Some(stage);
                info!(%run_id, stage, target = schedule.stages()[stage].target, "entering stage");
            }

            while workers.len() < target as usize {
                workers.push(self.spawn_vu(next_vu_id, &cancel));
                next_vu_id += 1;
            }
            while workers.len() > target as usize {
                if let Some(worker) = workers.pop() {
                    debug!(vu = worker.id, "retiring virtual user");
                    worker.stop.cancel();
                    retired.push(worker.handle);
                }
            }

            timeline.push(VuSample {
                elapsed,
                target,
                active: workers.len() as u32,
            });
        }

        for worker in workers.drain(..) {
            worker.stop.cancel();
            retired.push(worker.handle);
        }
        for result in join_all(retired).await {
            if let Err(e) = result {
                error!(%run_id, error = %e, "virtual user task failed");
            }
        }

        let elapsed = start.elapsed();
        timeline.push(VuSample {
            elapsed,
            target: schedule.target_at(elapsed),
            active: 0,
        });

        self.stats
            .summarize(run_id, started_at, elapsed, &self.checks, timeline)
    }

    fn spawn_vu(&self, id: u32, cancel: &CancellationToken) -> Worker {
        let stop = cancel.child_token();
        let vu = VirtualUser::new(
            id,
            self.config.clone(),
            self.client.clone(),
            self.checks.clone(),
            self.stats.clone(),
        );
        let handle = tokio::spawn(vu.run(stop.clone()));
        Worker { id, stop, handle }
    }
}
