//! RPC protocol definitions
//!
//! JSON-RPC style request/response bodies exchanged over `POST /rpc`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::feed::{AccountStatus, FeedUpdate, FolderUpdate};
use crate::sync::HistoryProgress;
use crate::Error;

/// JSON-RPC style request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "Uuid::nil")]
    pub id: Uuid,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.into(),
            params: serde_json::Value::Null,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

/// JSON-RPC style response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Uuid, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Uuid, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn ok(id: Uuid) -> Self {
        Self::success(id, serde_json::json!({"ok": true}))
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// RPC error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ERR_INVALID_PARAMS, message)
    }
}

impl From<Error> for RpcError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::Validation(_) | Error::UrlParse(_) => ERR_INVALID_PARAMS,
            e if e.is_not_found() => ERR_NOT_FOUND,
            Error::Busy(_) => ERR_BUSY,
            Error::Platform(_) | Error::Http(_) => ERR_PLATFORM,
            _ => ERR_INTERNAL,
        };
        Self::new(code, err.to_string())
    }
}

// Error codes
pub const ERR_PARSE: i32 = -32700;
pub const ERR_INVALID_REQUEST: i32 = -32600;
pub const ERR_METHOD_NOT_FOUND: i32 = -32601;
pub const ERR_INVALID_PARAMS: i32 = -32602;
pub const ERR_INTERNAL: i32 = -32603;
pub const ERR_NOT_FOUND: i32 = -32004;
pub const ERR_BUSY: i32 = -32005;
pub const ERR_PLATFORM: i32 = -32010;

// Method names
pub mod methods {
    pub const PING: &str = "ping";
    pub const STATUS: &str = "status";

    // Feed methods
    pub const FEED_LIST: &str = "feed.list";
    pub const FEED_ADD: &str = "feed.add";
    pub const FEED_EDIT: &str = "feed.edit";
    pub const FEED_DELETE: &str = "feed.delete";
    pub const FEED_REFRESH_ARTICLES: &str = "feed.refreshArticles";
    pub const FEED_IS_REFRESH_ALL_RUNNING: &str = "feed.isRefreshAllMpArticlesRunning";
    pub const FEED_GET_HISTORY_ARTICLES: &str = "feed.getHistoryArticles";
    pub const FEED_GET_IN_PROGRESS_HISTORY: &str = "feed.getInProgressHistoryMp";
    pub const FEED_SUBSCRIBE: &str = "feed.subscribe";
    pub const FEED_EXPORT_OPML: &str = "feed.exportOpml";

    // Folder methods
    pub const FOLDER_LIST: &str = "folder.list";
    pub const FOLDER_ADD: &str = "folder.add";
    pub const FOLDER_EDIT: &str = "folder.edit";
    pub const FOLDER_DELETE: &str = "folder.delete";
    pub const FOLDER_MOVE_FEEDS: &str = "folder.moveFeedsToFolder";

    // Article methods
    pub const ARTICLE_LIST: &str = "article.list";
    pub const ARTICLE_BY_ID: &str = "article.byId";
    pub const ARTICLE_DELETE: &str = "article.delete";

    // Platform methods
    pub const PLATFORM_GET_MP_INFO: &str = "platform.getMpInfo";

    // Account methods
    pub const ACCOUNT_LIST: &str = "account.list";
    pub const ACCOUNT_ADD: &str = "account.add";
    pub const ACCOUNT_EDIT: &str = "account.edit";
    pub const ACCOUNT_DELETE: &str = "account.delete";
}

// Parameter structures

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedListParams {
    pub folder_id: Option<String>,
}

/// `{ "id": ... }` or a bare id string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "IdParamsRepr")]
pub struct IdParams {
    pub id: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdParamsRepr {
    Bare(String),
    Object { id: String },
}

impl From<IdParamsRepr> for IdParams {
    fn from(repr: IdParamsRepr) -> Self {
        match repr {
            IdParamsRepr::Bare(id) | IdParamsRepr::Object { id } => Self { id },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEditParams {
    pub id: String,
    pub data: FeedUpdate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshArticlesParams {
    pub mp_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    /// Empty stops the running fetch
    #[serde(default)]
    pub mp_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeParams {
    /// Share links, one per line
    pub links: String,
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderAddParams {
    pub name: String,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderEditParams {
    pub id: String,
    pub data: FolderUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFeedsParams {
    pub feed_ids: Vec<String>,
    /// `null` or `"uncategorized"` clears the folder
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListParams {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub mp_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MpInfoParams {
    pub wxs_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountAddParams {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEditParams {
    pub id: String,
    pub status: AccountStatus,
}

// Response structures

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub running: bool,
    pub uptime_secs: u64,
    pub refresh_running: bool,
    pub history: HistoryProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovedResponse {
    pub moved: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshStartedResponse {
    pub started: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpmlResponse {
    pub content: String,
    pub filename: String,
}
