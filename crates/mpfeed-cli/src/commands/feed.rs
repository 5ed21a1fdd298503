use std::sync::Arc;

use anyhow::Result;

use mpfeed_core::{
    feed::{
        from_unix, target_folder, FeedUpdate, FolderFilter, FEED_STATUS_DISABLED,
        FEED_STATUS_ENABLED, UNCATEGORIZED,
    },
    storage::{Database, FeedRepository, FolderRepository},
    sync::subscribe_links,
    AppConfig,
};

use super::build_state;

pub async fn list(db: &Database, folder: Option<&str>) -> Result<()> {
    let feeds = FeedRepository::new(db)
        .list(&FolderFilter::from_param(folder))
        .await?;

    if feeds.is_empty() {
        println!("No subscriptions yet.");
        println!("\nTo subscribe, paste a share link:");
        println!("  mpfeed feed add https://mp.weixin.qq.com/s/<article>");
        return Ok(());
    }

    println!("Subscriptions ({}):\n", feeds.len());

    for feed in &feeds {
        let disabled = if feed.is_enabled() { "" } else { " [disabled]" };
        println!("  {} - {}{}", feed.id, feed.mp_name, disabled);
        if let Some(folder) = &feed.folder_id {
            println!("    Folder: {}", folder);
        }
        if feed.sync_time > 0 {
            let synced = from_unix(feed.sync_time);
            println!("    Last synced: {}", synced.format("%Y-%m-%d %H:%M"));
        }
    }

    Ok(())
}

pub async fn add(
    db: Database,
    config: Arc<AppConfig>,
    links: &[String],
    folder: Option<&str>,
) -> Result<()> {
    let state = build_state(db, config)?;
    let outcomes = subscribe_links(&state, &links.join("\n"), folder).await?;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.feed {
            Some(feed) => println!(
                "Subscribed: {} ({}), {} articles fetched",
                feed.mp_name, feed.id, outcome.new_articles
            ),
            None => {
                failed += 1;
                println!(
                    "Failed: {} - {}",
                    outcome.link,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    println!(
        "\n{} subscribed, {} failed",
        outcomes.len() - failed,
        failed
    );
    Ok(())
}

pub async fn remove(db: &Database, id: &str) -> Result<()> {
    if FeedRepository::new(db).delete(id).await? {
        println!("Unsubscribed from {}. Its articles are kept.", id);
    } else {
        println!("Feed '{}' not found.", id);
    }
    Ok(())
}

pub async fn set_enabled(db: &Database, id: &str, enabled: bool) -> Result<()> {
    let status = if enabled {
        FEED_STATUS_ENABLED
    } else {
        FEED_STATUS_DISABLED
    };

    let feed = FeedRepository::new(db)
        .update(
            id,
            &FeedUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await?;

    let verb = if enabled { "enabled" } else { "disabled" };
    println!("Scheduled refresh {} for '{}'", verb, feed.mp_name);
    Ok(())
}

pub async fn move_to(db: &Database, ids: &[String], folder: &str) -> Result<()> {
    let target = target_folder(Some(folder));
    if let Some(folder_id) = &target {
        FolderRepository::new(db).get(folder_id).await?;
    }

    let moved = FeedRepository::new(db)
        .move_to_folder(ids, target.as_deref())
        .await?;

    let name = target.as_deref().unwrap_or(UNCATEGORIZED);
    println!("Moved {} feeds to {}", moved, name);
    Ok(())
}
