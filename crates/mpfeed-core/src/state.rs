use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::platform::Platform;
use crate::storage::Database;
use crate::sync::{HistoryTracker, RefreshGuard};

/// State shared by the HTTP server, the RPC handler and the scheduler
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub platform: Arc<dyn Platform>,
    pub refresh: RefreshGuard,
    pub history: HistoryTracker,
    started_at: Instant,
}

impl AppState {
    pub fn new(db: Database, config: Arc<AppConfig>, platform: Arc<dyn Platform>) -> Arc<Self> {
        Arc::new(Self {
            db,
            config,
            platform,
            refresh: RefreshGuard::new(),
            history: HistoryTracker::new(),
            started_at: Instant::now(),
        })
    }

    /// Seconds since the state was created
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
