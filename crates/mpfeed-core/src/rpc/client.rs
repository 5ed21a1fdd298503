use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use super::protocol::*;
use crate::sync::{HistoryProgress, HistoryStart, RefreshOutcome};
use crate::{Error, Result};

/// Client for a running server's RPC endpoint
pub struct RpcClient {
    client: Client,
    endpoint: String,
}

impl RpcClient {
    /// `base_url` is the server origin, e.g. `http://localhost:4000`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/rpc", base_url.trim_end_matches('/')),
        })
    }

    /// Check if the server is alive
    pub async fn ping(&self) -> Result<bool> {
        let response: PingResponse = self.call(methods::PING, serde_json::Value::Null).await?;
        Ok(response.ok)
    }

    /// Get server status
    pub async fn status(&self) -> Result<StatusResponse> {
        self.call(methods::STATUS, serde_json::Value::Null).await
    }

    /// Refresh one feed and wait for the outcome
    pub async fn refresh_feed(&self, mp_id: &str) -> Result<RefreshOutcome> {
        let params = serde_json::json!({ "mpId": mp_id });
        self.call(methods::FEED_REFRESH_ARTICLES, params).await
    }

    /// Start refreshing every feed in the background
    pub async fn refresh_all(&self) -> Result<bool> {
        let response: RefreshStartedResponse = self
            .call(methods::FEED_REFRESH_ARTICLES, serde_json::json!({}))
            .await?;
        Ok(response.started)
    }

    pub async fn is_refresh_running(&self) -> Result<bool> {
        self.call(methods::FEED_IS_REFRESH_ALL_RUNNING, serde_json::Value::Null)
            .await
    }

    /// Start the history fetch of a feed
    pub async fn start_history(&self, mp_id: &str) -> Result<HistoryStart> {
        let params = serde_json::json!({ "mpId": mp_id });
        self.call(methods::FEED_GET_HISTORY_ARTICLES, params).await
    }

    /// Stop the running history fetch
    pub async fn stop_history(&self) -> Result<HistoryStart> {
        self.start_history("").await
    }

    pub async fn history_progress(&self) -> Result<HistoryProgress> {
        self.call(methods::FEED_GET_IN_PROGRESS_HISTORY, serde_json::Value::Null)
            .await
    }

    /// Send a request and decode the result
    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request = Request::new(method).with_params(params);

        let response: Response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::Other(format!(
                    "Failed to reach server at {}: {}. Is `mpfeed serve` running?",
                    self.endpoint, e
                ))
            })?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(Error::Other(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        let result = response
            .result
            .ok_or_else(|| Error::Other("Empty response".to_string()))?;
        Ok(serde_json::from_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::FakePlatform;
    use crate::sync::test_support::{add_feed, state_with};
    use crate::web::create_router;

    async fn spawn_server() -> (RpcClient, std::sync::Arc<crate::state::AppState>) {
        let (state, _) = state_with(FakePlatform::new().with_pages("MP_1", 1, 3)).await;
        add_feed(&state, "MP_1").await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (RpcClient::new(&format!("http://{}", addr)).unwrap(), state)
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let (client, _state) = spawn_server().await;

        assert!(client.ping().await.unwrap());
        assert!(!client.is_refresh_running().await.unwrap());

        let outcome = client.refresh_feed("MP_1").await.unwrap();
        assert_eq!(outcome.new_articles, 3);

        let progress = client.history_progress().await.unwrap();
        assert!(progress.is_idle());
        assert_eq!(client.stop_history().await.unwrap(), HistoryStart::Stopped);

        let status = client.status().await.unwrap();
        assert!(status.running);
    }

    #[tokio::test]
    async fn test_client_surfaces_rpc_errors() {
        let (client, _state) = spawn_server().await;

        let err = client.refresh_feed("unknown").await.unwrap_err();
        assert!(err.to_string().contains("-32004"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = RpcClient::new("http://127.0.0.1:9").unwrap();
        assert!(client.ping().await.is_err());
    }
}
