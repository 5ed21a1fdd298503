use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::state::AppState;
use crate::sync::{refresh_all, RefreshSummary};
use crate::{Error, Result};

/// Events emitted by the scheduler
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// Enabled feeds have been refreshed
    FeedsRefreshed { feeds: u32, new_articles: u32 },
    /// A tick was skipped because a manual refresh was still running
    RefreshSkipped,
    /// An error occurred during a background task
    Error { task: String, message: String },
}

/// Background scheduler that refreshes enabled feeds periodically
pub struct SchedulerService {
    state: Arc<AppState>,
    event_tx: Option<mpsc::UnboundedSender<SchedulerEvent>>,
}

impl SchedulerService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            event_tx: None,
        }
    }

    /// Set the event sender for listeners
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, event: SchedulerEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).is_err() {
                warn!("Failed to send scheduler event: receiver dropped");
            }
        }
    }

    /// Run until the shutdown signal flips to `true`
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let refresh_secs = self.state.config.sync.refresh_interval_secs;

        // Skip if refresh is disabled (0)
        if refresh_secs == 0 {
            info!("Background scheduler disabled (refresh_interval_secs = 0)");
            // Still wait for shutdown
            let _ = shutdown.changed().await;
            return;
        }

        info!("Scheduler started: refresh={}s", refresh_secs);

        let mut refresh_interval = tokio::time::interval(Duration::from_secs(refresh_secs));

        // Skip the first tick (fires immediately)
        refresh_interval.tick().await;

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("Scheduler received shutdown signal");
                        break;
                    }
                }

                _ = refresh_interval.tick() => {
                    debug!("Running scheduled feed refresh");
                    let _ = self.refresh_now().await;
                }
            }
        }

        info!("Scheduler stopped");
    }

    /// Run a single refresh immediately
    pub async fn refresh_now(&self) -> Result<RefreshSummary> {
        match refresh_all(&self.state).await {
            Ok(summary) => {
                if summary.new_articles > 0 {
                    info!("Scheduled refresh: {} new articles", summary.new_articles);
                }
                self.send_event(SchedulerEvent::FeedsRefreshed {
                    feeds: summary.feeds,
                    new_articles: summary.new_articles,
                });
                Ok(summary)
            }
            Err(Error::Busy(message)) => {
                info!("Scheduled refresh skipped: {}", message);
                self.send_event(SchedulerEvent::RefreshSkipped);
                Err(Error::Busy(message))
            }
            Err(e) => {
                error!("Scheduled refresh failed: {}", e);
                self.send_event(SchedulerEvent::Error {
                    task: "refresh".to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
