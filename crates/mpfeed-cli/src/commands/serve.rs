use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{error, info};

use mpfeed_core::{scheduler::SchedulerService, storage::Database, AppConfig, WebServer};

use super::build_state;

/// Run the web server and the scheduler until Ctrl+C
pub async fn run(db: Database, config: Arc<AppConfig>) -> Result<()> {
    let state = build_state(db, config.clone())?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = signal_tx.send(true);
    });

    let server = WebServer::new(state.clone())?;
    let scheduler = SchedulerService::new(state);

    println!("mpfeed listening on http://{}", server.addr());
    println!("  Public origin: {}", config.origin());
    println!("  Refresh interval: {} seconds", config.sync.refresh_interval_secs);

    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let served = server.run(shutdown_rx).await;
    if let Err(e) = &served {
        error!("Web server failed: {}", e);
    }

    // The scheduler outlives a failed server otherwise
    let _ = shutdown_tx.send(true);

    scheduler_handle.await.ok();
    println!("mpfeed stopped.");

    Ok(served?)
}
