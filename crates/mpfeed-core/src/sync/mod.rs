mod guard;
mod history;
mod tasks;

pub use guard::{RefreshGuard, RefreshPermit};
pub use history::{start_history, HistoryProgress, HistoryStart, HistoryTracker, ARTICLES_PER_PAGE};
pub use tasks::{
    refresh_all, refresh_all_with, refresh_feed, spawn_refresh_all, subscribe_links,
    RefreshOutcome, RefreshSummary, SubscribeOutcome,
};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::feed::NewFeed;
    use crate::platform::testing::FakePlatform;
    use crate::state::AppState;
    use crate::storage::{Database, FeedRepository};

    /// State over an in-memory database with no sync delays
    pub async fn state_with(platform: FakePlatform) -> (Arc<AppState>, Arc<FakePlatform>) {
        let mut config = AppConfig::default();
        config.sync.update_delay_secs = 0;
        config.sync.history_page_delay_secs = 0;
        state_with_config(platform, config).await
    }

    pub async fn state_with_config(
        platform: FakePlatform,
        config: AppConfig,
    ) -> (Arc<AppState>, Arc<FakePlatform>) {
        let db = Database::new_in_memory().await.unwrap();
        let platform = Arc::new(platform);
        let state = AppState::new(db, Arc::new(config), platform.clone());
        (state, platform)
    }

    pub async fn add_feed(state: &AppState, id: &str) {
        FeedRepository::new(&state.db)
            .upsert(&NewFeed {
                id: id.to_string(),
                mp_name: format!("Feed {}", id),
                mp_cover: String::new(),
                mp_intro: String::new(),
                update_time: 0,
                status: 1,
                folder_id: None,
            })
            .await
            .unwrap();
    }
}
