use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::feed::{export_opml, FolderFilter, OPML_FILE_NAME};
use crate::state::AppState;
use crate::storage::FeedRepository;
use crate::web::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpmlQuery {
    /// Limit the export to one folder (`uncategorized` for feeds without one)
    pub folder_id: Option<String>,
}

/// GET /opml - subscriptions as an OPML attachment
pub async fn get_opml(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OpmlQuery>,
) -> Result<Response, ApiError> {
    let filter = FolderFilter::from_param(query.folder_id.as_deref());
    let feeds = FeedRepository::new(&state.db).list(&filter).await?;
    let content = export_opml(&feeds, &state.config)?;

    let disposition = format!("attachment; filename=\"{}\"", OPML_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/x-opml; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}
