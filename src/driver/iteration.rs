use rand::Rng;
use tracing::{debug, warn};

use super::checks::CheckRegistry;
use super::stats::RunStats;
use crate::client::TransactionClient;
use crate::domain::{IterationContext, PayloadTemplate, STATUS_CHECK};

/// Result of one iteration, as seen by the VU that ran it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    pub order_id: String,
    pub passed: bool,
    pub diagnostic: Option<String>,
}

/// Build one transaction, send it and record the status check.
///
/// Transport failures and unexpected statuses are logged and counted as a
/// failed check; neither is propagated.
pub async fn run_iteration<R: Rng + Send + ?Sized>(
    ctx: &IterationContext,
    rng: &mut R,
    client: &dyn TransactionClient,
    template: &PayloadTemplate,
    checks: &CheckRegistry,
    stats: &RunStats,
) -> IterationReport {
    let request = template.build(ctx, rng);

    let (passed, diagnostic) = match client.submit(&request).await {
        Ok(outcome) => {
            stats.record_response(outcome.status, outcome.latency);
            match outcome.diagnostic() {
                Some(diag) => {
                    warn!(
                        vu = ctx.vu_id,
                        iteration = ctx.iteration,
                        order_id = %request.internal_order_id,
                        status = outcome.status,
                        body = %outcome.body,
                        "unexpected response status"
                    );
                    (false, Some(diag))
                }
                None => {
                    let reference = outcome.reply().and_then(|r| r.internal_reference_id);
                    debug!(
                        vu = ctx.vu_id,
                        iteration = ctx.iteration,
                        order_id = %request.internal_order_id,
                        reference = reference.as_deref().unwrap_or("-"),
                        latency_ms = outcome.latency.as_millis() as u64,
                        "transaction accepted"
                    );
                    (true, None)
                }
            }
        }
        Err(e) => {
            stats.record_transport_error();
            warn!(
                vu = ctx.vu_id,
                iteration = ctx.iteration,
                order_id = %request.internal_order_id,
                error = %e,
                "transaction request failed"
            );
            (false, Some(format!("transport failure: {e}")))
        }
    };

    checks.record(STATUS_CHECK, passed);
    stats.record_iteration();

    IterationReport {
        order_id: request.internal_order_id,
        passed,
        diagnostic,
    }
}
