use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::RefreshPermit;
use crate::feed::{target_folder, Feed, NewArticle};
use crate::platform::validate_share_link;
use crate::state::AppState;
use crate::storage::{ArticleRepository, FeedRepository, FolderRepository};
use crate::{Error, Result};

/// Result of fetching one page of a feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub new_articles: u32,
    pub fetched: u32,
    pub has_history: bool,
}

/// Result of a refresh-all run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub feeds: u32,
    pub failed: u32,
    pub new_articles: u32,
}

/// Result of subscribing one pasted link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeOutcome {
    pub link: String,
    pub feed: Option<Feed>,
    pub new_articles: u32,
    pub error: Option<String>,
}

impl SubscribeOutcome {
    pub fn is_success(&self) -> bool {
        self.feed.is_some()
    }

    fn failed(link: &str, error: impl ToString) -> Self {
        Self {
            link: link.to_string(),
            feed: None,
            new_articles: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Fetch one page (1-based) of a feed and store the new articles.
///
/// An empty page past the first marks the feed's history as exhausted.
pub async fn refresh_feed(state: &AppState, mp_id: &str, page: u32) -> Result<RefreshOutcome> {
    let feed_repo = FeedRepository::new(&state.db);
    let article_repo = ArticleRepository::new(&state.db);

    let feed = feed_repo.get(mp_id).await?;
    let page = page.max(1);

    let items = state.platform.get_mp_articles(mp_id, page).await?;
    let fetched = items.len() as u32;

    let articles: Vec<NewArticle> = items
        .into_iter()
        .map(|item| item.into_new_article(mp_id))
        .collect();
    let new_articles = article_repo.insert_many(&articles).await?;

    let exhausted = page > 1 && fetched == 0;
    let has_history = if exhausted { Some(0) } else { None };
    feed_repo
        .touch_sync(mp_id, Utc::now().timestamp(), has_history)
        .await?;

    tracing::info!(
        "Feed '{}' page {}: {} fetched, {} new",
        feed.mp_name,
        page,
        fetched,
        new_articles
    );

    Ok(RefreshOutcome {
        new_articles,
        fetched,
        has_history: !exhausted && feed.has_more_history(),
    })
}

/// Refresh every enabled feed, one after another
pub async fn refresh_all(state: &AppState) -> Result<RefreshSummary> {
    let permit = state
        .refresh
        .try_acquire()
        .ok_or_else(|| Error::Busy("a refresh of all feeds is already running".to_string()))?;

    refresh_all_with(state, permit).await
}

/// Refresh every enabled feed under an already acquired permit
pub async fn refresh_all_with(state: &AppState, _permit: RefreshPermit) -> Result<RefreshSummary> {
    let feeds = FeedRepository::new(&state.db).list_enabled().await?;
    let delay = Duration::from_secs(state.config.sync.update_delay_secs);
    let mut summary = RefreshSummary::default();

    tracing::info!("Refreshing {} feeds", feeds.len());

    for (i, feed) in feeds.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        summary.feeds += 1;
        match refresh_feed(state, &feed.id, 1).await {
            Ok(outcome) => summary.new_articles += outcome.new_articles,
            Err(e) => {
                summary.failed += 1;
                tracing::error!("Failed to refresh feed '{}': {}", feed.mp_name, e);
            }
        }
    }

    tracing::info!(
        "Refresh finished: {} feeds, {} failed, {} new articles",
        summary.feeds,
        summary.failed,
        summary.new_articles
    );

    Ok(summary)
}

/// Start refresh-all in the background; `false` when one is already running
pub fn spawn_refresh_all(state: Arc<AppState>) -> bool {
    let Some(permit) = state.refresh.try_acquire() else {
        return false;
    };

    tokio::spawn(async move {
        if let Err(e) = refresh_all_with(&state, permit).await {
            tracing::error!("Background refresh failed: {}", e);
        }
    });

    true
}

/// Subscribe to every share link in `text` (one per line), in order
pub async fn subscribe_links(
    state: &AppState,
    text: &str,
    folder_id: Option<&str>,
) -> Result<Vec<SubscribeOutcome>> {
    let feed_repo = FeedRepository::new(&state.db);
    let folder = target_folder(folder_id);
    if let Some(id) = &folder {
        FolderRepository::new(&state.db).get(id).await?;
    }
    let mut outcomes = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let link = match validate_share_link(line) {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!("Skipping link {}: {}", line, e);
                outcomes.push(SubscribeOutcome::failed(line, e));
                continue;
            }
        };

        let info = match state.platform.get_mp_info(link).await {
            Ok(infos) => infos.into_iter().next(),
            Err(e) => {
                tracing::warn!("Failed to resolve {}: {}", link, e);
                outcomes.push(SubscribeOutcome::failed(link, e));
                continue;
            }
        };

        let Some(info) = info else {
            tracing::warn!("No public account found for {}", link);
            outcomes.push(SubscribeOutcome::failed(link, "no public account found for link"));
            continue;
        };

        let feed = match feed_repo.upsert(&info.to_new_feed(folder.clone())).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::error!("Failed to store feed for {}: {}", link, e);
                outcomes.push(SubscribeOutcome::failed(link, e));
                continue;
            }
        };

        let new_articles = match refresh_feed(state, &feed.id, 1).await {
            Ok(outcome) => outcome.new_articles,
            Err(e) => {
                tracing::warn!("Subscribed to '{}' but refresh failed: {}", feed.mp_name, e);
                0
            }
        };

        tracing::info!("Subscribed to '{}'", feed.mp_name);
        let feed = feed_repo.find_by_id(&feed.id).await.ok().flatten().unwrap_or(feed);
        outcomes.push(SubscribeOutcome {
            link: link.to_string(),
            feed: Some(feed),
            new_articles,
            error: None,
        });
    }

    Ok(outcomes)
}
