#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use chrono_tz::Tz;
    use tracing::{info, warn};
    use week_sync::{
        Clock, ConfigError, MondayClient, Reconciler, SyncConfig, http_api, logging, scheduler,
    };

    logging::init_tracing();

    let config = SyncConfig::from_env()?;
    let store =
        MondayClient::from_config(&config.store).ok_or(ConfigError::Missing("MONDAY_API_TOKEN"))?;
    if config.engine.board_ids.is_empty() {
        warn!("MONDAY_BOARD_IDS is empty, sweeps will have nothing to do");
    }

    let reconciler = Arc::new(
        Reconciler::new(store, config.engine.clone()).with_clock(Clock::for_timezone(config.timezone)),
    );

    match &config.sweep_cron {
        Some(expr) => {
            let schedule = scheduler::parse_cron(expr)?;
            let tz = config.timezone.unwrap_or(Tz::UTC);
            info!(cron = %expr, timezone = %tz, "scheduled sweeps enabled");
            tokio::spawn(scheduler::run_scheduled_sweeps(reconciler.clone(), schedule, tz));
        }
        None => info!("scheduled sweeps disabled"),
    }

    http_api::serve(config.http_addr, reconciler).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
