pub mod account;
pub mod article;
pub mod backup;
pub mod feed;
pub mod folder;
pub mod history;
pub mod opml;
pub mod refresh;
pub mod serve;

use std::sync::Arc;

use anyhow::Result;

use mpfeed_core::{platform::HttpPlatform, storage::Database, AppConfig, AppState, RpcClient};

/// Shared state for commands that reach the content platform directly
pub fn build_state(db: Database, config: Arc<AppConfig>) -> Result<Arc<AppState>> {
    let platform = HttpPlatform::new(&config, db.clone())?;
    Ok(AppState::new(db, config, Arc::new(platform)))
}

/// Client for the local server, if one answers
pub async fn running_server(config: &AppConfig) -> Option<RpcClient> {
    let client = RpcClient::new(&config.local_url()).ok()?;
    match client.ping().await {
        Ok(true) => Some(client),
        _ => None,
    }
}
