use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::protocol::*;
use crate::feed::{export_opml, target_folder, FolderFilter, NewFeed, OPML_FILE_NAME};
use crate::platform::validate_share_link;
use crate::state::AppState;
use crate::storage::{AccountRepository, ArticleRepository, FeedRepository, FolderRepository};
use crate::sync::{refresh_feed, spawn_refresh_all, start_history, subscribe_links};
use crate::Error;

/// Default and maximum page size of `article.list`
const ARTICLE_PAGE_DEFAULT: u32 = 20;
const ARTICLE_PAGE_MAX: u32 = 100;

type RpcResult = std::result::Result<Value, RpcError>;

/// Decode method params; absent params decode like an empty object
fn params<T: DeserializeOwned>(value: Value) -> std::result::Result<T, RpcError> {
    let value = if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn json<T: Serialize>(value: T) -> RpcResult {
    serde_json::to_value(value).map_err(|e| RpcError::new(ERR_INTERNAL, e.to_string()))
}

/// Dispatch one request against the shared state
pub async fn handle_request(request: Request, state: &Arc<AppState>) -> Response {
    let id = request.id;
    debug!("Received request: {} (id: {})", request.method, id);

    let result = match request.method.as_str() {
        methods::PING => json(PingResponse { ok: true }),
        methods::STATUS => json(StatusResponse {
            running: true,
            uptime_secs: state.uptime_secs(),
            refresh_running: state.refresh.is_running(),
            history: state.history.snapshot(),
        }),

        methods::FEED_LIST => feed_list(state, request.params).await,
        methods::FEED_ADD => feed_add(state, request.params).await,
        methods::FEED_EDIT => feed_edit(state, request.params).await,
        methods::FEED_DELETE => feed_delete(state, request.params).await,
        methods::FEED_REFRESH_ARTICLES => feed_refresh(state, request.params).await,
        methods::FEED_IS_REFRESH_ALL_RUNNING => json(state.refresh.is_running()),
        methods::FEED_GET_HISTORY_ARTICLES => feed_history(state, request.params).await,
        methods::FEED_GET_IN_PROGRESS_HISTORY => json(state.history.snapshot()),
        methods::FEED_SUBSCRIBE => feed_subscribe(state, request.params).await,
        methods::FEED_EXPORT_OPML => feed_export_opml(state, request.params).await,

        methods::FOLDER_LIST => folder_list(state).await,
        methods::FOLDER_ADD => folder_add(state, request.params).await,
        methods::FOLDER_EDIT => folder_edit(state, request.params).await,
        methods::FOLDER_DELETE => folder_delete(state, request.params).await,
        methods::FOLDER_MOVE_FEEDS => folder_move_feeds(state, request.params).await,

        methods::ARTICLE_LIST => article_list(state, request.params).await,
        methods::ARTICLE_BY_ID => article_by_id(state, request.params).await,
        methods::ARTICLE_DELETE => article_delete(state, request.params).await,

        methods::PLATFORM_GET_MP_INFO => platform_mp_info(state, request.params).await,

        methods::ACCOUNT_LIST => account_list(state).await,
        methods::ACCOUNT_ADD => account_add(state, request.params).await,
        methods::ACCOUNT_EDIT => account_edit(state, request.params).await,
        methods::ACCOUNT_DELETE => account_delete(state, request.params).await,

        other => Err(RpcError::new(
            ERR_METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        )),
    };

    match result {
        Ok(value) => Response::success(id, value),
        Err(e) => {
            warn!("Request {} failed: {} ({})", request.method, e.message, e.code);
            Response::error(id, e.code, e.message)
        }
    }
}

async fn feed_list(state: &AppState, value: Value) -> RpcResult {
    let p: FeedListParams = params(value)?;
    let filter = FolderFilter::from_param(p.folder_id.as_deref());
    let items = FeedRepository::new(&state.db).list(&filter).await?;
    json(ItemsResponse { items })
}

async fn feed_add(state: &AppState, value: Value) -> RpcResult {
    let mut new_feed: NewFeed = params(value)?;
    if new_feed.id.trim().is_empty() {
        return Err(RpcError::invalid_params("feed id must not be empty"));
    }
    new_feed.folder_id = target_folder(new_feed.folder_id.as_deref());
    if let Some(folder_id) = &new_feed.folder_id {
        FolderRepository::new(&state.db).get(folder_id).await?;
    }

    let feed = FeedRepository::new(&state.db).upsert(&new_feed).await?;
    json(feed)
}

async fn feed_edit(state: &AppState, value: Value) -> RpcResult {
    let p: FeedEditParams = params(value)?;
    let feed = FeedRepository::new(&state.db).update(&p.id, &p.data).await?;
    json(feed)
}

async fn feed_delete(state: &AppState, value: Value) -> RpcResult {
    let p: IdParams = params(value)?;
    if state.history.snapshot().id == p.id {
        state.history.stop();
    }
    let deleted = FeedRepository::new(&state.db).delete(&p.id).await?;
    json(DeletedResponse { deleted })
}

async fn feed_refresh(state: &Arc<AppState>, value: Value) -> RpcResult {
    let p: RefreshArticlesParams = params(value)?;
    match p.mp_id.as_deref().filter(|id| !id.is_empty()) {
        Some(mp_id) => json(refresh_feed(state, mp_id, 1).await?),
        None => json(RefreshStartedResponse {
            started: spawn_refresh_all(state.clone()),
        }),
    }
}

async fn feed_history(state: &Arc<AppState>, value: Value) -> RpcResult {
    let p: HistoryParams = params(value)?;
    json(start_history(state, &p.mp_id).await?)
}

async fn feed_subscribe(state: &AppState, value: Value) -> RpcResult {
    let p: SubscribeParams = params(value)?;
    let items = subscribe_links(state, &p.links, p.folder_id.as_deref()).await?;
    json(ItemsResponse { items })
}

async fn feed_export_opml(state: &AppState, value: Value) -> RpcResult {
    let p: FeedListParams = params(value)?;
    let filter = FolderFilter::from_param(p.folder_id.as_deref());
    let feeds = FeedRepository::new(&state.db).list(&filter).await?;
    let content = export_opml(&feeds, &state.config)?;
    json(OpmlResponse {
        content,
        filename: OPML_FILE_NAME.to_string(),
    })
}

async fn folder_list(state: &AppState) -> RpcResult {
    let items = FolderRepository::new(&state.db).list().await?;
    json(ItemsResponse { items })
}

async fn folder_add(state: &AppState, value: Value) -> RpcResult {
    let p: FolderAddParams = params(value)?;
    json(FolderRepository::new(&state.db).create(&p.name, p.order).await?)
}

async fn folder_edit(state: &AppState, value: Value) -> RpcResult {
    let p: FolderEditParams = params(value)?;
    json(FolderRepository::new(&state.db).update(&p.id, &p.data).await?)
}

async fn folder_delete(state: &AppState, value: Value) -> RpcResult {
    let p: IdParams = params(value)?;
    let deleted = FolderRepository::new(&state.db).delete(&p.id).await?;
    json(DeletedResponse { deleted })
}

async fn folder_move_feeds(state: &AppState, value: Value) -> RpcResult {
    let p: MoveFeedsParams = params(value)?;
    let folder = target_folder(p.folder_id.as_deref());
    if let Some(folder_id) = &folder {
        FolderRepository::new(&state.db).get(folder_id).await?;
    }

    let moved = FeedRepository::new(&state.db)
        .move_to_folder(&p.feed_ids, folder.as_deref())
        .await?;
    json(MovedResponse { moved })
}

async fn article_list(state: &AppState, value: Value) -> RpcResult {
    let p: ArticleListParams = params(value)?;
    let limit = p
        .limit
        .unwrap_or(ARTICLE_PAGE_DEFAULT)
        .clamp(1, ARTICLE_PAGE_MAX);
    let mp_id = p.mp_id.as_deref().filter(|id| !id.is_empty());

    let page = ArticleRepository::new(&state.db)
        .list_page(mp_id, limit, p.cursor.as_deref())
        .await?;
    json(page)
}

async fn article_by_id(state: &AppState, value: Value) -> RpcResult {
    let p: IdParams = params(value)?;
    let article = ArticleRepository::new(&state.db)
        .find_by_id(&p.id)
        .await?
        .ok_or_else(|| Error::ArticleNotFound(p.id.clone()))?;
    json(article)
}

async fn article_delete(state: &AppState, value: Value) -> RpcResult {
    let p: IdParams = params(value)?;
    let deleted = ArticleRepository::new(&state.db).delete(&p.id).await?;
    json(DeletedResponse { deleted })
}

async fn platform_mp_info(state: &AppState, value: Value) -> RpcResult {
    let p: MpInfoParams = params(value)?;
    let link = validate_share_link(&p.wxs_link)?;
    json(state.platform.get_mp_info(link).await?)
}

async fn account_list(state: &AppState) -> RpcResult {
    let items = AccountRepository::new(&state.db).list_summaries().await?;
    json(ItemsResponse { items })
}

async fn account_add(state: &AppState, value: Value) -> RpcResult {
    let p: AccountAddParams = params(value)?;
    json(
        AccountRepository::new(&state.db)
            .upsert(&p.id, &p.name, &p.token)
            .await?,
    )
}

async fn account_edit(state: &AppState, value: Value) -> RpcResult {
    let p: AccountEditParams = params(value)?;
    let repo = AccountRepository::new(&state.db);
    repo.set_status(&p.id, p.status).await?;
    let account = repo
        .find_by_id(&p.id)
        .await?
        .ok_or_else(|| Error::AccountNotFound(p.id.clone()))?;
    json(crate::feed::AccountSummary::from(account))
}

async fn account_delete(state: &AppState, value: Value) -> RpcResult {
    let p: IdParams = params(value)?;
    let deleted = AccountRepository::new(&state.db).delete(&p.id).await?;
    json(DeletedResponse { deleted })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::platform::testing::FakePlatform;
    use crate::sync::test_support::{add_feed, state_with};

    async fn call(state: &Arc<AppState>, method: &str, params: Value) -> Response {
        handle_request(Request::new(method).with_params(params), state).await
    }

    async fn result(state: &Arc<AppState>, method: &str, params: Value) -> Value {
        let response = call(state, method, params).await;
        assert!(response.is_success(), "{:?}", response.error);
        response.result.unwrap()
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_params() {
        let (state, _) = state_with(FakePlatform::new()).await;

        let response = call(&state, "feed.nope", Value::Null).await;
        assert_eq!(response.error.unwrap().code, ERR_METHOD_NOT_FOUND);

        let response = call(&state, methods::FOLDER_ADD, json!({"order": 1})).await;
        assert_eq!(response.error.unwrap().code, ERR_INVALID_PARAMS);

        let response = call(&state, methods::FOLDER_ADD, json!({"name": "  "})).await;
        assert_eq!(response.error.unwrap().code, ERR_INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_folder_selection_filters_feed_list() {
        let (state, _) = state_with(FakePlatform::new()).await;

        let folder = result(&state, methods::FOLDER_ADD, json!({"name": "Tech", "order": 1})).await;
        let folder_id = folder["id"].as_str().unwrap().to_string();

        result(
            &state,
            methods::FEED_ADD,
            json!({"id": "MP_1", "mpName": "One", "folderId": folder_id}),
        )
        .await;
        result(
            &state,
            methods::FEED_ADD,
            json!({"id": "MP_2", "mpName": "Two", "folderId": "uncategorized"}),
        )
        .await;

        let all = result(&state, methods::FEED_LIST, json!({})).await;
        assert_eq!(all["items"].as_array().unwrap().len(), 2);

        let in_folder = result(&state, methods::FEED_LIST, json!({"folderId": folder_id})).await;
        assert_eq!(in_folder["items"][0]["id"], "MP_1");
        assert_eq!(in_folder["items"].as_array().unwrap().len(), 1);

        let uncategorized =
            result(&state, methods::FEED_LIST, json!({"folderId": "uncategorized"})).await;
        assert_eq!(uncategorized["items"][0]["id"], "MP_2");

        let folders = result(&state, methods::FOLDER_LIST, Value::Null).await;
        assert_eq!(folders["items"][0]["feedCount"], 1);
    }

    #[tokio::test]
    async fn test_move_feeds_and_delete_folder() {
        let (state, _) = state_with(FakePlatform::new()).await;
        add_feed(&state, "MP_1").await;
        add_feed(&state, "MP_2").await;

        let folder = result(&state, methods::FOLDER_ADD, json!({"name": "Later"})).await;
        let folder_id = folder["id"].as_str().unwrap().to_string();

        let moved = result(
            &state,
            methods::FOLDER_MOVE_FEEDS,
            json!({"feedIds": ["MP_1", "MP_2"], "folderId": folder_id}),
        )
        .await;
        assert_eq!(moved["moved"], 2);

        let moved = result(
            &state,
            methods::FOLDER_MOVE_FEEDS,
            json!({"feedIds": ["MP_2"], "folderId": "uncategorized"}),
        )
        .await;
        assert_eq!(moved["moved"], 1);

        let response = call(
            &state,
            methods::FOLDER_MOVE_FEEDS,
            json!({"feedIds": ["MP_2"], "folderId": "missing"}),
        )
        .await;
        assert_eq!(response.error.unwrap().code, ERR_NOT_FOUND);

        result(&state, methods::FOLDER_DELETE, json!({"id": folder_id})).await;
        let uncategorized =
            result(&state, methods::FEED_LIST, json!({"folderId": "uncategorized"})).await;
        assert_eq!(uncategorized["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_article_list_follows_cursor() {
        let (state, _) = state_with(FakePlatform::new().with_pages("MP_1", 1, 5)).await;
        add_feed(&state, "MP_1").await;
        result(&state, methods::FEED_REFRESH_ARTICLES, json!({"mpId": "MP_1"})).await;

        let first = result(&state, methods::ARTICLE_LIST, json!({"limit": 3, "mpId": "MP_1"})).await;
        assert_eq!(first["items"].as_array().unwrap().len(), 3);
        let cursor = first["nextCursor"].as_str().unwrap().to_string();

        let second = result(
            &state,
            methods::ARTICLE_LIST,
            json!({"limit": 3, "mpId": "MP_1", "cursor": cursor}),
        )
        .await;
        assert_eq!(second["items"].as_array().unwrap().len(), 2);
        assert!(second["nextCursor"].is_null());

        let id = first["items"][0]["id"].as_str().unwrap().to_string();
        let article = result(&state, methods::ARTICLE_BY_ID, json!({"id": id})).await;
        assert_eq!(article["mpId"], "MP_1");

        result(&state, methods::ARTICLE_DELETE, json!({"id": id})).await;
        let response = call(&state, methods::ARTICLE_BY_ID, json!({"id": id})).await;
        assert_eq!(response.error.unwrap().code, ERR_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_history_and_refresh_status() {
        let (state, _) = state_with(FakePlatform::new().with_pages("MP_1", 1, 2)).await;
        add_feed(&state, "MP_1").await;

        let idle = result(&state, methods::FEED_GET_IN_PROGRESS_HISTORY, Value::Null).await;
        assert_eq!(idle["id"], "");

        let running = result(&state, methods::FEED_IS_REFRESH_ALL_RUNNING, Value::Null).await;
        assert_eq!(running, json!(false));

        let stopped = result(&state, methods::FEED_GET_HISTORY_ARTICLES, json!({"mpId": ""})).await;
        assert_eq!(stopped, json!("stopped"));

        let response = call(&state, methods::FEED_GET_HISTORY_ARTICLES, json!({"mpId": "nope"})).await;
        assert_eq!(response.error.unwrap().code, ERR_NOT_FOUND);

        let status = result(&state, methods::STATUS, Value::Null).await;
        assert_eq!(status["running"], true);
        assert_eq!(status["refreshRunning"], false);
    }

    #[tokio::test]
    async fn test_export_opml_and_accounts() {
        let (state, _) = state_with(FakePlatform::new()).await;

        let response = call(&state, methods::FEED_EXPORT_OPML, Value::Null).await;
        assert_eq!(response.error.unwrap().code, ERR_INVALID_PARAMS);

        add_feed(&state, "MP_1").await;
        let opml = result(&state, methods::FEED_EXPORT_OPML, Value::Null).await;
        assert_eq!(opml["filename"], "MpFeed-All.opml");
        assert!(opml["content"].as_str().unwrap().contains("/feeds/MP_1.atom"));

        result(
            &state,
            methods::ACCOUNT_ADD,
            json!({"id": "acc", "name": "me", "token": "secret"}),
        )
        .await;
        let edited = result(&state, methods::ACCOUNT_EDIT, json!({"id": "acc", "status": 2})).await;
        assert_eq!(edited["status"], 2);

        let accounts = result(&state, methods::ACCOUNT_LIST, Value::Null).await;
        let account = accounts["items"][0].as_object().unwrap();
        assert!(!account.contains_key("token"));
    }

    #[tokio::test]
    async fn test_export_opml_of_selected_folder() {
        let (state, _) = state_with(FakePlatform::new()).await;
        add_feed(&state, "MP_1").await;
        add_feed(&state, "MP_2").await;
        let folder = result(&state, methods::FOLDER_ADD, json!({"name": "Tech"})).await;
        let folder_id = folder["id"].as_str().unwrap().to_string();
        result(
            &state,
            methods::FOLDER_MOVE_FEEDS,
            json!({"feedIds": ["MP_2"], "folderId": folder_id}),
        )
        .await;

        let opml = result(&state, methods::FEED_EXPORT_OPML, json!({"folderId": folder_id})).await;
        let content = opml["content"].as_str().unwrap();
        assert!(content.contains("/feeds/MP_2.atom"));
        assert!(!content.contains("/feeds/MP_1.atom"));

        let uncategorized =
            result(&state, methods::FEED_EXPORT_OPML, json!({"folderId": "uncategorized"})).await;
        assert!(!uncategorized["content"].as_str().unwrap().contains("MP_2"));
    }

    #[tokio::test]
    async fn test_subscribe_into_unknown_folder() {
        let platform = FakePlatform::new()
            .with_info("https://mp.weixin.qq.com/s/one", "MP_1", "One")
            .with_pages("MP_1", 1, 1);
        let (state, _) = state_with(platform).await;

        let response = call(
            &state,
            methods::FEED_SUBSCRIBE,
            json!({"links": "https://mp.weixin.qq.com/s/one", "folderId": "missing"}),
        )
        .await;
        assert_eq!(response.error.unwrap().code, ERR_NOT_FOUND);

        let feeds = result(&state, methods::FEED_LIST, json!({})).await;
        assert!(feeds["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_bare_id() {
        let (state, _) = state_with(FakePlatform::new()).await;
        add_feed(&state, "MP_1").await;
        let folder = result(&state, methods::FOLDER_ADD, json!({"name": "Tech"})).await;

        let deleted = result(&state, methods::FEED_DELETE, json!("MP_1")).await;
        assert_eq!(deleted["deleted"], true);
        let deleted = result(&state, methods::FOLDER_DELETE, folder["id"].clone()).await;
        assert_eq!(deleted["deleted"], true);
    }

    #[tokio::test]
    async fn test_get_mp_info_validates_link() {
        let platform =
            FakePlatform::new().with_info("https://mp.weixin.qq.com/s/abc", "MP_1", "One");
        let (state, _) = state_with(platform).await;

        let infos = result(
            &state,
            methods::PLATFORM_GET_MP_INFO,
            json!({"wxsLink": "https://mp.weixin.qq.com/s/abc"}),
        )
        .await;
        assert_eq!(infos[0]["name"], "One");

        let response = call(
            &state,
            methods::PLATFORM_GET_MP_INFO,
            json!({"wxsLink": "https://example.com"}),
        )
        .await;
        assert_eq!(response.error.unwrap().code, ERR_INVALID_PARAMS);
    }
}
