//! Access to the upstream content platform.
//!
//! The rest of the crate only sees the [`Platform`] trait; [`HttpPlatform`]
//! is the production implementation backed by stored accounts.

mod client;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::feed::{NewArticle, NewFeed, FEED_STATUS_ENABLED};
use crate::{Error, Result};

pub use client::HttpPlatform;

/// Prefix every shareable article link starts with
pub const SHARE_LINK_PREFIX: &str = "https://mp.weixin.qq.com/s/";

/// Public account metadata resolved from a share link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MpInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub update_time: i64,
}

impl MpInfo {
    /// Feed record for this account, placed in `folder_id`
    pub fn to_new_feed(&self, folder_id: Option<String>) -> NewFeed {
        NewFeed {
            id: self.id.clone(),
            mp_name: self.name.clone(),
            mp_cover: self.cover.clone(),
            mp_intro: self.intro.clone(),
            update_time: self.update_time,
            status: FEED_STATUS_ENABLED,
            folder_id,
        }
    }
}

/// Article entry of a platform page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MpArticle {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub pic_url: String,
    pub publish_time: i64,
}

impl MpArticle {
    pub fn into_new_article(self, mp_id: &str) -> NewArticle {
        NewArticle {
            id: self.id,
            mp_id: mp_id.to_string(),
            title: self.title,
            pic_url: self.pic_url,
            publish_time: self.publish_time,
        }
    }
}

/// Upstream content platform
#[async_trait]
pub trait Platform: Send + Sync {
    /// Resolve the public account(s) behind a share link
    async fn get_mp_info(&self, link: &str) -> Result<Vec<MpInfo>>;

    /// Fetch one page (1-based) of a public account's articles, newest first
    async fn get_mp_articles(&self, mp_id: &str, page: u32) -> Result<Vec<MpArticle>>;
}

/// Trim a pasted share link and check it points at an article
pub fn validate_share_link(link: &str) -> Result<&str> {
    let link = link.trim();
    Url::parse(link)?;
    if !link.starts_with(SHARE_LINK_PREFIX) || link.len() == SHARE_LINK_PREFIX.len() {
        return Err(Error::Validation(format!(
            "share link must start with {}: {}",
            SHARE_LINK_PREFIX, link
        )));
    }
    Ok(link)
}
