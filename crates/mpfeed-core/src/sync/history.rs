//! Paginated fetch of a feed's older articles.
//!
//! At most one feed is tracked at a time. Starting another feed takes over
//! the tracker; the previous loop sees it no longer owns the tracker before
//! fetching its next page and exits.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::refresh_feed;
use crate::state::AppState;
use crate::storage::{ArticleRepository, FeedRepository};
use crate::Result;

/// Articles the platform returns per page
pub const ARTICLES_PER_PAGE: u32 = 20;

/// Feed and page currently being fetched; `id` is empty when idle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryProgress {
    pub id: String,
    pub page: u32,
}

impl HistoryProgress {
    pub fn is_idle(&self) -> bool {
        self.id.is_empty()
    }
}

/// What a start request did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStart {
    Started,
    AlreadyRunning,
    NoHistory,
    Stopped,
}

#[derive(Debug, Default)]
struct TrackerState {
    progress: HistoryProgress,
    /// Bumped on every claim and stop; a loop only acts while it holds the current value
    generation: u64,
}

#[derive(Debug, Default)]
pub struct HistoryTracker {
    state: Mutex<TrackerState>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        // The guarded value is plain data, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> HistoryProgress {
        self.lock().progress.clone()
    }

    /// Clear the tracker; a running loop exits before its next page
    pub fn stop(&self) {
        let mut state = self.lock();
        state.progress = HistoryProgress::default();
        state.generation += 1;
    }

    /// Take the tracker for `mp_id` and return the ownership token;
    /// `None` if it already runs that feed
    fn claim(&self, mp_id: &str, page: u32) -> Option<u64> {
        let mut state = self.lock();
        if state.progress.id == mp_id {
            return None;
        }
        state.generation += 1;
        state.progress = HistoryProgress {
            id: mp_id.to_string(),
            page,
        };
        Some(state.generation)
    }

    fn owns(state: &TrackerState, mp_id: &str, token: u64) -> bool {
        state.generation == token && state.progress.id == mp_id
    }

    /// Record the page about to be fetched; `false` once the token lost the tracker
    fn advance(&self, mp_id: &str, token: u64, page: u32) -> bool {
        let mut state = self.lock();
        if !Self::owns(&state, mp_id, token) {
            return false;
        }
        state.progress.page = page;
        true
    }

    /// Return to idle, unless the tracker was claimed again since
    fn release(&self, mp_id: &str, token: u64) {
        let mut state = self.lock();
        if Self::owns(&state, mp_id, token) {
            state.progress = HistoryProgress::default();
        }
    }
}

/// Start fetching the history of `mp_id` in the background.
///
/// An empty id stops whatever is running.
pub async fn start_history(state: &Arc<AppState>, mp_id: &str) -> Result<HistoryStart> {
    let mp_id = mp_id.trim();
    if mp_id.is_empty() {
        state.history.stop();
        tracing::info!("History fetch stopped");
        return Ok(HistoryStart::Stopped);
    }

    if state.history.snapshot().id == mp_id {
        return Ok(HistoryStart::AlreadyRunning);
    }

    let feed = FeedRepository::new(&state.db).get(mp_id).await?;
    if !feed.has_more_history() {
        tracing::info!("Feed '{}' has no more history", feed.mp_name);
        return Ok(HistoryStart::NoHistory);
    }

    let count = ArticleRepository::new(&state.db).count_by_feed(mp_id).await?;
    let first_page = (count / ARTICLES_PER_PAGE).max(1);

    let Some(token) = state.history.claim(mp_id, first_page) else {
        return Ok(HistoryStart::AlreadyRunning);
    };

    tracing::info!(
        "Fetching history of '{}' from page {}",
        feed.mp_name,
        first_page
    );

    let state = state.clone();
    let mp_id = mp_id.to_string();
    tokio::spawn(async move {
        run_history(&state, &mp_id, token, first_page).await;
    });

    Ok(HistoryStart::Started)
}

async fn run_history(state: &AppState, mp_id: &str, token: u64, first_page: u32) {
    let delay = Duration::from_secs(state.config.sync.history_page_delay_secs);
    let mut page = first_page;

    loop {
        if !state.history.advance(mp_id, token, page) {
            tracing::info!("History fetch of {} superseded at page {}", mp_id, page);
            break;
        }

        match refresh_feed(state, mp_id, page).await {
            Ok(outcome) if outcome.fetched == 0 => {
                tracing::info!("History of {} complete at page {}", mp_id, page);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("History fetch of {} failed at page {}: {}", mp_id, page, e);
                break;
            }
        }

        page += 1;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    state.history.release(mp_id, token);
}
