use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::checks::CheckRegistry;
use super::iteration::run_iteration;
use super::stats::RunStats;
use super::DriverConfig;
use crate::client::TransactionClient;
use crate::domain::IterationContext;

/// One simulated client running the iteration loop until told to stop.
pub struct VirtualUser {
    id: u32,
    iteration: u64,
    rng: StdRng,
    config: Arc<DriverConfig>,
    client: Arc<dyn TransactionClient>,
    checks: Arc<CheckRegistry>,
    stats: Arc<RunStats>,
}

impl VirtualUser {
    pub fn new(
        id: u32,
        config: Arc<DriverConfig>,
        client: Arc<dyn TransactionClient>,
        checks: Arc<CheckRegistry>,
        stats: Arc<RunStats>,
    ) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(u64::from(id))),
            None => StdRng::from_entropy(),
        };
        Self {
            id,
            iteration: 0,
            rng,
            config,
            client,
            checks,
            stats,
        }
    }

    /// Run iterations until `stop` fires, returning how many completed.
    ///
    /// A stop request never interrupts an in-flight iteration; it only cuts
    /// the think-time pause short.
    pub async fn run(mut self, stop: CancellationToken) -> u64 {
        debug!(vu = self.id, "virtual user started");
        while !stop.is_cancelled() {
            let ctx = IterationContext::new(self.id, self.iteration);
            run_iteration(
                &ctx,
                &mut self.rng,
                self.client.as_ref(),
                &self.config.template,
                &self.checks,
                &self.stats,
            )
            .await;
            self.iteration += 1;

            tokio::select! {
                _ = stop.cancelled() => break,
                _ = sleep(self.config.think_time) => {}
            }
        }
        debug!(vu = self.id, iterations = self.iteration, "virtual user stopped");
        self.iteration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TransportError;
    use crate::domain::{ResponseOutcome, Schedule, Stage, TransactionRequest};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Records when each request was sent.
    #[derive(Default)]
    struct RecordingClient {
        sent: Mutex<Vec<(Instant, TransactionRequest)>>,
    }

    #[async_trait]
    impl TransactionClient for RecordingClient {
        async fn submit(&self, request: &TransactionRequest) -> Result<ResponseOutcome, TransportError> {
            self.sent.lock().push((Instant::now(), request.clone()));
            Ok(ResponseOutcome::new(200, "{}", Duration::ZERO))
        }
    }

    fn config(think_time: Duration, seed: Option<u64>) -> Arc<DriverConfig> {
        Arc::new(DriverConfig {
            schedule: Schedule::new(vec![Stage::new(Duration::from_secs(1), 1)]).unwrap(),
            think_time,
            random_seed: seed,
            ..DriverConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_think_time_between_iterations() {
        let client = Arc::new(RecordingClient::default());
        let vu = VirtualUser::new(
            1,
            config(Duration::from_secs(1), Some(5)),
            client.clone(),
            Arc::new(CheckRegistry::new()),
            Arc::new(RunStats::new().unwrap()),
        );
        let stop = CancellationToken::new();
        let handle = tokio::spawn(vu.run(stop.clone()));

        sleep(Duration::from_millis(4_500)).await;
        stop.cancel();
        let iterations = handle.await.unwrap();

        let sent = client.sent.lock();
        assert_eq!(iterations, 5);
        assert_eq!(sent.len(), 5);
        for pair in sent.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= Duration::from_secs(1));
        }
        let iters: Vec<String> = sent.iter().map(|(_, r)| r.internal_order_id.clone()).collect();
        for (i, id) in iters.iter().enumerate() {
            assert!(id.ends_with(&format!("-1-{i}")), "{id}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_vu_starts_no_iteration() {
        let client = Arc::new(RecordingClient::default());
        let vu = VirtualUser::new(
            2,
            config(Duration::from_secs(1), None),
            client.clone(),
            Arc::new(CheckRegistry::new()),
            Arc::new(RunStats::new().unwrap()),
        );
        let stop = CancellationToken::new();
        stop.cancel();
        assert_eq!(vu.run(stop).await, 0);
        assert!(client.sent.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_vus_are_reproducible() {
        async fn amounts(seed: u64) -> Vec<u32> {
            let client = Arc::new(RecordingClient::default());
            let vu = VirtualUser::new(
                3,
                config(Duration::from_millis(10), Some(seed)),
                client.clone(),
                Arc::new(CheckRegistry::new()),
                Arc::new(RunStats::new().unwrap()),
            );
            let stop = CancellationToken::new();
            let handle = tokio::spawn(vu.run(stop.clone()));
            sleep(Duration::from_millis(95)).await;
            stop.cancel();
            handle.await.unwrap();
            let sent = client.sent.lock();
            let amounts: Vec<u32> = sent.iter().map(|(_, r)| r.amount).collect();
            amounts
        }

        let first = amounts(11).await;
        assert_eq!(first.len(), 10);
        assert_eq!(first, amounts(11).await);
    }
}
