use std::sync::Arc;

use anyhow::Result;

use mpfeed_core::{
    storage::Database,
    sync::{refresh_all, refresh_feed},
    AppConfig,
};

use super::{build_state, running_server};

/// Refresh through the running server when there is one, otherwise in-process
pub async fn run(db: Database, config: Arc<AppConfig>, feed: Option<&str>) -> Result<()> {
    if let Some(client) = running_server(&config).await {
        match feed {
            Some(id) => {
                let outcome = client.refresh_feed(id).await?;
                println!("Refreshed {}: {} new articles", id, outcome.new_articles);
            }
            None => {
                if client.refresh_all().await? {
                    println!("Refresh of all feeds started on the server.");
                } else {
                    println!("A refresh of all feeds is already running.");
                }
            }
        }
        return Ok(());
    }

    let state = build_state(db, config)?;
    match feed {
        Some(id) => {
            let outcome = refresh_feed(&state, id, 1).await?;
            println!("Refreshed {}: {} new articles", id, outcome.new_articles);
        }
        None => {
            println!("Refreshing all feeds...\n");
            let summary = refresh_all(&state).await?;
            println!(
                "\nRefresh complete. {} feeds, {} failed, {} new articles.",
                summary.feeds, summary.failed, summary.new_articles
            );
        }
    }
    Ok(())
}
