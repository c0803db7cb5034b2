use std::future::Future;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Driver logs at info, the HTTP stack only when something goes wrong.
pub const DEFAULT_FILTER: &str = "info,payment_load_driver=info,hyper=warn,reqwest=warn";

/// `RUST_LOG` when set and valid, [`DEFAULT_FILTER`] otherwise.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! { _ = ctrl_c => {}, _ = terminate => {}, }
}

/// Cancel the run token on Ctrl+C / SIGTERM.
///
/// The listener task ends on its own once the token is cancelled by anyone
/// else, e.g. the run finishing.
pub fn cancel_on_shutdown(run: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(cancel_when(shutdown_signal(), run))
}

async fn cancel_when<F>(signal: F, run: CancellationToken)
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = signal => {
            warn!("shutdown signal received, draining virtual users");
            run.cancel();
        }
        _ = run.cancelled() => {
            info!("run finished, shutdown listener stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[tokio::test]
    async fn signal_cancels_run_token() {
        let run = CancellationToken::new();
        let (tx, rx) = oneshot::channel::<()>();
        let listener = tokio::spawn(cancel_when(
            async move {
                let _ = rx.await;
            },
            run.clone(),
        ));

        assert!(!run.is_cancelled());
        tx.send(()).unwrap();
        listener.await.unwrap();
        assert!(run.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn listener_stops_when_run_ends() {
        let run = CancellationToken::new();
        let listener = tokio::spawn(cancel_when(std::future::pending(), run.clone()));

        run.cancel();
        tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .expect("listener should exit after the run token is cancelled")
            .unwrap();
    }
}
