//! Feed documents: `/feeds/<id>.<ext>` and `/feeds/all.<ext>`

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use crate::feed::{render, FeedFormat, FeedItem, FeedMeta, FolderFilter};
use crate::state::AppState;
use crate::storage::{ArticleRepository, FeedRepository, TitleFilter};
use crate::sync::refresh_feed;
use crate::web::error::ApiError;

/// Id that selects every subscription
const AGGREGATE_ID: &str = "all";

/// Query parameters of a feed document request.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub title_include: Option<String>,
    pub title_exclude: Option<String>,
    pub update: Option<String>,
}

impl FeedQuery {
    fn wants_update(&self) -> bool {
        matches!(self.update.as_deref(), Some("true" | "1"))
    }
}

/// GET /feeds/:file
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, ApiError> {
    let (id, format) = FeedFormat::split_file_name(&file).ok_or_else(|| {
        ApiError::bad_request(format!("Unsupported feed file: {}", file))
    })?;

    let limit = state.config.clamp_limit(query.limit);
    let offset = query.page.unwrap_or(1).saturating_sub(1).saturating_mul(limit);
    let filter = TitleFilter::from_params(
        query.title_include.as_deref(),
        query.title_exclude.as_deref(),
    );

    let feed_repo = FeedRepository::new(&state.db);
    let article_repo = ArticleRepository::new(&state.db);

    let (meta, items) = if id == AGGREGATE_ID {
        let names: HashMap<String, String> = feed_repo
            .list(&FolderFilter::All)
            .await?
            .into_iter()
            .map(|f| (f.id, f.mp_name))
            .collect();

        let articles = article_repo
            .list_for_feed_output(None, limit, offset, &filter)
            .await?;
        let updated = articles
            .first()
            .map(|a| a.published_at())
            .unwrap_or_else(Utc::now);

        let items: Vec<FeedItem> = articles
            .into_iter()
            .map(|article| FeedItem {
                author: names.get(&article.mp_id).cloned(),
                article,
            })
            .collect();

        (FeedMeta::aggregate(&state.config, format, updated), items)
    } else {
        let mut feed = feed_repo.get(id).await?;

        if query.wants_update() {
            match refresh_feed(&state, id, 1).await {
                Ok(_) => feed = feed_repo.get(id).await?,
                Err(e) => tracing::warn!("Update of feed '{}' failed: {}", feed.mp_name, e),
            }
        }

        let items: Vec<FeedItem> = article_repo
            .list_for_feed_output(Some(id), limit, offset, &filter)
            .await?
            .into_iter()
            .map(|article| FeedItem {
                article,
                author: Some(feed.mp_name.clone()),
            })
            .collect();

        (FeedMeta::for_feed(&feed, &state.config, format), items)
    };

    let body = render(&meta, &items, format)?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}
