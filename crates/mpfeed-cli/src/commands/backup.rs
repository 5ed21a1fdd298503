use std::path::PathBuf;

use anyhow::Result;

use mpfeed_core::{backup::backup_feeds, storage::Database, AppConfig};

pub async fn run(db: &Database, config: &AppConfig, output: Option<PathBuf>) -> Result<()> {
    let dir = output.unwrap_or_else(|| config.backup_dir());
    let report = backup_feeds(db, &dir).await?;

    println!("Backup written to {}", report.path.display());
    println!(
        "  {} feeds, {} articles, {} accounts",
        report.summary.feeds_count, report.summary.articles_count, report.summary.accounts_count
    );
    Ok(())
}
