use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Feed `status` value: included in scheduled refreshes
pub const FEED_STATUS_ENABLED: i32 = 1;
/// Feed `status` value: skipped by scheduled refreshes
pub const FEED_STATUS_DISABLED: i32 = 0;

/// Reserved folder id selecting feeds without a folder
pub const UNCATEGORIZED: &str = "uncategorized";

/// A subscribed public account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: String,
    pub mp_name: String,
    pub mp_cover: String,
    pub mp_intro: String,
    pub status: i32,
    /// Unix seconds of the last article sync
    pub sync_time: i64,
    /// Unix seconds reported by the platform
    pub update_time: i64,
    pub has_history: i32,
    pub folder_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feed {
    pub fn is_enabled(&self) -> bool {
        self.status == FEED_STATUS_ENABLED
    }

    pub fn has_more_history(&self) -> bool {
        self.has_history == 1
    }
}

/// Data required to create (or replace) a feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeed {
    pub id: String,
    pub mp_name: String,
    #[serde(default)]
    pub mp_cover: String,
    #[serde(default)]
    pub mp_intro: String,
    #[serde(default)]
    pub update_time: i64,
    #[serde(default = "default_status")]
    pub status: i32,
    #[serde(default)]
    pub folder_id: Option<String>,
}

fn default_status() -> i32 {
    FEED_STATUS_ENABLED
}

/// Partial feed edit; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedUpdate {
    pub mp_name: Option<String>,
    pub mp_cover: Option<String>,
    pub mp_intro: Option<String>,
    pub status: Option<i32>,
    pub update_time: Option<i64>,
    pub has_history: Option<i32>,
}

/// An article belonging to a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub mp_id: String,
    pub title: String,
    pub pic_url: String,
    /// Unix seconds
    pub publish_time: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Public link to the article on the content platform
    pub fn link(&self) -> String {
        article_link(&self.id)
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        from_unix(self.publish_time)
    }
}

/// Data required to create a new article
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub id: String,
    pub mp_id: String,
    pub title: String,
    #[serde(default)]
    pub pic_url: String,
    pub publish_time: i64,
}

/// A user-defined grouping of feeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Computed field (not stored in DB)
    #[serde(default)]
    pub feed_count: u32,
}

/// Partial folder edit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderUpdate {
    pub name: Option<String>,
    pub order: Option<i64>,
}

/// Which feeds a listing covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderFilter {
    All,
    Uncategorized,
    Folder(String),
}

impl FolderFilter {
    /// Interpret the wire value: absent = all, `"uncategorized"` = no folder
    pub fn from_param(folder_id: Option<&str>) -> Self {
        match folder_id {
            None | Some("") => FolderFilter::All,
            Some(UNCATEGORIZED) => FolderFilter::Uncategorized,
            Some(id) => FolderFilter::Folder(id.to_string()),
        }
    }
}

/// Target folder for new or moved feeds; `None` and `"uncategorized"` both mean no folder
pub fn target_folder(folder_id: Option<&str>) -> Option<String> {
    match folder_id {
        None | Some("") | Some(UNCATEGORIZED) => None,
        Some(id) => Some(id.to_string()),
    }
}

/// Account status on the content platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum AccountStatus {
    Invalid,
    Enabled,
    Disabled,
}

impl From<AccountStatus> for i32 {
    fn from(status: AccountStatus) -> Self {
        match status {
            AccountStatus::Invalid => 0,
            AccountStatus::Enabled => 1,
            AccountStatus::Disabled => 2,
        }
    }
}

impl TryFrom<i32> for AccountStatus {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(AccountStatus::Invalid),
            1 => Ok(AccountStatus::Enabled),
            2 => Ok(AccountStatus::Disabled),
            other => Err(Error::Validation(format!("unknown account status {}", other))),
        }
    }
}

/// Platform account including its credential; never serialized
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub token: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account projection safe to show or export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            status: account.status,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Output format of a feed document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Atom,
    Rss,
    Json,
}

impl FeedFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FeedFormat::Atom => "atom",
            FeedFormat::Rss => "rss",
            FeedFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FeedFormat::Atom => "application/atom+xml; charset=utf-8",
            FeedFormat::Rss => "application/rss+xml; charset=utf-8",
            FeedFormat::Json => "application/feed+json; charset=utf-8",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "atom" => Some(FeedFormat::Atom),
            "rss" | "xml" => Some(FeedFormat::Rss),
            "json" => Some(FeedFormat::Json),
            _ => None,
        }
    }

    /// Split `"<id>.<ext>"` into the feed id and format
    pub fn split_file_name(file: &str) -> Option<(&str, Self)> {
        let (id, ext) = file.rsplit_once('.')?;
        if id.is_empty() {
            return None;
        }
        Self::from_extension(ext).map(|format| (id, format))
    }
}

/// Public link to an article on the content platform
pub fn article_link(id: &str) -> String {
    format!("https://mp.weixin.qq.com/s/{}", id)
}

/// Convert unix seconds to a timestamp, clamping invalid values to the epoch
pub fn from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
