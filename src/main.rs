use anyhow::Result;
use payment_load_driver::client::HttpTransactionClient;
use payment_load_driver::config::Config;
use payment_load_driver::driver::{DriverConfig, LoadDriver};
use payment_load_driver::telemetry::{self, init_tracing};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let driver_cfg = DriverConfig::try_from(&cfg)?;

    if cfg.target.api_key == "moje-tajne-heslo-12345" {
        warn!("using the built-in development API key; set LOADGEN__TARGET__API_KEY for shared environments");
    }

    let client = Arc::new(HttpTransactionClient::new(
        cfg.target.url.clone(),
        &cfg.target.api_key,
        cfg.target.timeout(),
    )?);

    info!(
        url = %client.url(),
        think_time_ms = cfg.run.think_time_ms,
        seed = ?cfg.run.random_seed,
        "starting payment load driver"
    );

    let cancel = CancellationToken::new();
    let listener = telemetry::cancel_on_shutdown(cancel.clone());

    let summary = LoadDriver::new(driver_cfg, client)?.run(cancel.clone()).await;
    cancel.cancel();
    if let Err(e) = listener.await {
        warn!(error = %e, "shutdown listener task failed");
    }
    summary.log();

    Ok(())
}
