use anyhow::Result;

use mpfeed_core::{
    feed::FolderUpdate,
    storage::{Database, FolderRepository},
};

pub async fn list(db: &Database) -> Result<()> {
    let folders = FolderRepository::new(db).list().await?;

    if folders.is_empty() {
        println!("No folders.");
        return Ok(());
    }

    for folder in &folders {
        println!(
            "  {} - {} ({} feeds)",
            folder.id, folder.name, folder.feed_count
        );
    }
    Ok(())
}

pub async fn add(db: &Database, name: &str, order: i64) -> Result<()> {
    let folder = FolderRepository::new(db).create(name, order).await?;
    println!("Created folder '{}' ({})", folder.name, folder.id);
    Ok(())
}

pub async fn rename(db: &Database, id: &str, name: &str) -> Result<()> {
    let folder = FolderRepository::new(db)
        .update(
            id,
            &FolderUpdate {
                name: Some(name.to_string()),
                order: None,
            },
        )
        .await?;
    println!("Renamed folder to '{}'", folder.name);
    Ok(())
}

pub async fn remove(db: &Database, id: &str) -> Result<()> {
    if FolderRepository::new(db).delete(id).await? {
        println!("Deleted folder {}. Its feeds are now uncategorized.", id);
    } else {
        println!("Folder '{}' not found.", id);
    }
    Ok(())
}
