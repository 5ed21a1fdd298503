use std::path::{Path, PathBuf};

use anyhow::Result;

use mpfeed_core::{
    feed::{export_opml, parse_opml, FolderFilter, OPML_FILE_NAME},
    storage::{Database, FeedRepository},
    AppConfig,
};

pub async fn export(
    db: &Database,
    config: &AppConfig,
    output: Option<PathBuf>,
    folder: Option<&str>,
) -> Result<()> {
    let feeds = FeedRepository::new(db)
        .list(&FolderFilter::from_param(folder))
        .await?;
    let content = export_opml(&feeds, config)?;

    let path = output.unwrap_or_else(|| PathBuf::from(OPML_FILE_NAME));
    tokio::fs::write(&path, content).await?;

    println!("Exported {} feeds to {}", feeds.len(), path.display());
    Ok(())
}

pub async fn inspect(file: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file).await?;
    let outlines = parse_opml(&content)?;

    println!("Found {} feeds in {}\n", outlines.len(), file.display());
    for outline in &outlines {
        println!("  {}", outline.text);
        println!("    {}", outline.xml_url);
    }
    Ok(())
}
