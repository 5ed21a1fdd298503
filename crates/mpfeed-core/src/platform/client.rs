use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{MpArticle, MpInfo, Platform};
use crate::config::AppConfig;
use crate::feed::AccountStatus;
use crate::storage::{AccountRepository, Database};
use crate::{Error, Result};

/// Error body returned by the platform
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Platform client authenticating with the stored accounts
pub struct HttpPlatform {
    client: Client,
    base_url: String,
    db: Database,
}

impl HttpPlatform {
    pub fn new(config: &AppConfig, db: Database) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.platform.request_timeout_secs))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.platform.base_url.trim_end_matches('/').to_string(),
            db,
        })
    }

    /// Platform API URL with each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid platform base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v2", "platform"])
            .extend(segments);
        Ok(url)
    }

    /// Send a request with the first account the platform accepts.
    ///
    /// A 401 marks the account invalid and moves on to the next enabled one.
    async fn send<T, F>(&self, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let accounts = AccountRepository::new(&self.db);
        let enabled = accounts.list_enabled().await?;

        if enabled.is_empty() {
            return Err(Error::Platform("no enabled account available".to_string()));
        }

        for account in enabled {
            let response = build(&self.client)
                .bearer_auth(&account.token)
                .header("xid", &account.id)
                .send()
                .await?;

            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                tracing::warn!("Account {} rejected by platform, marking invalid", account.id);
                accounts.set_status(&account.id, AccountStatus::Invalid).await?;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.message)
                    .unwrap_or(body);
                return Err(Error::Platform(format!("HTTP {}: {}", status, message)));
            }

            return Ok(response.json::<T>().await?);
        }

        Err(Error::Platform("all accounts were rejected".to_string()))
    }
}

#[async_trait]
impl Platform for HttpPlatform {
    async fn get_mp_info(&self, link: &str) -> Result<Vec<MpInfo>> {
        let url = self.url(&["wxs2mp"])?;
        let body = serde_json::json!({ "url": link });

        tracing::debug!("Resolving share link {}", link);
        self.send(|client| client.post(url.clone()).json(&body)).await
    }

    async fn get_mp_articles(&self, mp_id: &str, page: u32) -> Result<Vec<MpArticle>> {
        let url = self.url(&["mps", mp_id, "articles"])?;

        tracing::debug!("Fetching page {} of {}", page, mp_id);
        self.send(|client| client.get(url.clone()).query(&[("page", page)]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    use super::*;

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer good")
            && headers.get("xid").and_then(|v| v.to_str().ok()) == Some("2")
    }

    async fn spawn_platform() -> String {
        let app = Router::new()
            .route(
                "/api/v2/platform/wxs2mp",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    if !authorized(&headers) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!([{
                        "id": "MP_WXS_1",
                        "name": "Daily",
                        "cover": "c.jpg",
                        "intro": body["url"],
                        "updateTime": 1
                    }])))
                }),
            )
            .route(
                "/api/v2/platform/mps/:id/articles",
                get(
                    |headers: HeaderMap,
                     Path(id): Path<String>,
                     Query(query): Query<HashMap<String, String>>| async move {
                        if !authorized(&headers) {
                            return Err(StatusCode::UNAUTHORIZED);
                        }
                        let page = query.get("page").cloned().unwrap_or_default();
                        Ok(Json(json!([{
                            "id": format!("{}-{}", id, page),
                            "title": "t",
                            "picUrl": "",
                            "publishTime": 5
                        }])))
                    },
                ),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn platform_with_accounts(base_url: String) -> (HttpPlatform, Database) {
        let db = Database::new_in_memory().await.unwrap();
        let accounts = AccountRepository::new(&db);
        accounts.upsert("1", "stale", "bad").await.unwrap();
        accounts.upsert("2", "fresh", "good").await.unwrap();

        let mut config = AppConfig::default();
        config.platform.base_url = base_url;
        (HttpPlatform::new(&config, db.clone()).unwrap(), db)
    }

    #[tokio::test]
    async fn test_mp_id_is_escaped_in_path() {
        let (platform, _db) = platform_with_accounts("http://platform.local/base/".to_string()).await;
        let url = platform.url(&["mps", "a/b?c", "articles"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://platform.local/base/api/v2/platform/mps/a%2Fb%3Fc/articles"
        );
    }

    #[tokio::test]
    async fn test_rejected_account_falls_through() {
        let base_url = spawn_platform().await;
        let (platform, db) = platform_with_accounts(base_url).await;

        let info = platform
            .get_mp_info("https://mp.weixin.qq.com/s/abc")
            .await
            .unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].intro, "https://mp.weixin.qq.com/s/abc");

        let stale = AccountRepository::new(&db).find_by_id("1").await.unwrap().unwrap();
        assert_eq!(stale.status, AccountStatus::Invalid);

        let articles = platform.get_mp_articles("MP_WXS_1", 3).await.unwrap();
        assert_eq!(articles[0].id, "MP_WXS_1-3");
    }

    #[tokio::test]
    async fn test_no_account_is_platform_error() {
        let db = Database::new_in_memory().await.unwrap();
        let platform = HttpPlatform::new(&AppConfig::default(), db).unwrap();

        assert!(matches!(
            platform.get_mp_articles("MP_WXS_1", 1).await,
            Err(Error::Platform(_))
        ));
    }
}
