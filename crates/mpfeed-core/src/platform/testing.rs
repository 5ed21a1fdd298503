use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{MpArticle, MpInfo, Platform};
use crate::{Error, Result};

/// In-memory platform for tests
#[derive(Default)]
pub struct FakePlatform {
    infos: Mutex<HashMap<String, MpInfo>>,
    pages: Mutex<HashMap<String, Vec<Vec<MpArticle>>>>,
    requested: Mutex<Vec<(String, u32)>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the account a share link resolves to
    pub fn with_info(self, link: &str, id: &str, name: &str) -> Self {
        self.infos.lock().unwrap().insert(
            link.to_string(),
            MpInfo {
                id: id.to_string(),
                name: name.to_string(),
                cover: String::new(),
                intro: String::new(),
                update_time: 1_700_000_000,
            },
        );
        self
    }

    /// Register `pages` pages of `per_page` articles for an account
    pub fn with_pages(self, mp_id: &str, pages: u32, per_page: u32) -> Self {
        let mut all = Vec::new();
        let mut time = 2_000_000_000i64;
        for page in 1..=pages {
            let mut items = Vec::new();
            for n in 0..per_page {
                items.push(MpArticle {
                    id: format!("{}-p{}-{}", mp_id, page, n),
                    title: format!("Article {} of page {}", n, page),
                    pic_url: String::new(),
                    publish_time: time,
                });
                time -= 60;
            }
            all.push(items);
        }
        self.pages.lock().unwrap().insert(mp_id.to_string(), all);
        self
    }

    /// Pages requested so far, in order
    pub fn requested(&self) -> Vec<(String, u32)> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn get_mp_info(&self, link: &str) -> Result<Vec<MpInfo>> {
        Ok(self
            .infos
            .lock()
            .unwrap()
            .get(link)
            .cloned()
            .into_iter()
            .collect())
    }

    async fn get_mp_articles(&self, mp_id: &str, page: u32) -> Result<Vec<MpArticle>> {
        self.requested
            .lock()
            .unwrap()
            .push((mp_id.to_string(), page));

        let pages = self.pages.lock().unwrap();
        let feed_pages = pages
            .get(mp_id)
            .ok_or_else(|| Error::Platform(format!("unknown account {}", mp_id)))?;

        Ok(feed_pages
            .get(page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_default())
    }
}
