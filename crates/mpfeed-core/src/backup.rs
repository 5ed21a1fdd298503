use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::feed::{AccountSummary, Article, Feed, FolderFilter};
use crate::storage::{AccountRepository, ArticleRepository, Database, FeedRepository};
use crate::Result;

pub const BACKUP_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackupFile {
    version: &'static str,
    export_time: String,
    data: BackupData,
    summary: BackupSummary,
}

#[derive(Debug, Serialize)]
struct BackupData {
    feeds: Vec<Feed>,
    articles: Vec<Article>,
    accounts: Vec<AccountSummary>,
}

/// Record counts written to a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    pub feeds_count: usize,
    pub articles_count: usize,
    pub accounts_count: usize,
}

/// Where a backup was written and what it holds
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub path: PathBuf,
    pub summary: BackupSummary,
}

/// `mpfeed-backup-2024-01-02T03-04-05-678Z.json` for the given instant
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    let timestamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("mpfeed-backup-{}.json", timestamp)
}

/// Export feeds, articles and accounts (without tokens) as one JSON file in `dir`
pub async fn backup_feeds(db: &Database, dir: &Path) -> Result<BackupReport> {
    tracing::info!("Exporting subscription data...");

    let result = write_backup(db, dir).await;
    match &result {
        Ok(report) => {
            tracing::info!("Backup written to {}", report.path.display());
            tracing::info!(
                "Backup contains {} feeds, {} articles, {} accounts",
                report.summary.feeds_count,
                report.summary.articles_count,
                report.summary.accounts_count
            );
        }
        Err(e) => tracing::error!("Backup failed: {}", e),
    }

    result
}

async fn write_backup(db: &Database, dir: &Path) -> Result<BackupReport> {
    let feeds = FeedRepository::new(db).list(&FolderFilter::All).await?;
    let articles = ArticleRepository::new(db).list_all().await?;
    let accounts = AccountRepository::new(db).list_summaries().await?;

    let now = Utc::now();
    let summary = BackupSummary {
        feeds_count: feeds.len(),
        articles_count: articles.len(),
        accounts_count: accounts.len(),
    };

    let backup = BackupFile {
        version: BACKUP_VERSION,
        export_time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        data: BackupData {
            feeds,
            articles,
            accounts,
        },
        summary,
    };

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(backup_file_name(now));
    let content = serde_json::to_string_pretty(&backup)?;
    tokio::fs::write(&path, content).await?;

    Ok(BackupReport { path, summary })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::Value;

    use super::*;
    use crate::feed::{NewArticle, NewFeed};

    #[test]
    fn test_backup_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            backup_file_name(at),
            "mpfeed-backup-2024-01-02T03-04-05-000Z.json"
        );
    }

    #[tokio::test]
    async fn test_backup_envelope_without_tokens() {
        let db = Database::new_in_memory().await.unwrap();
        FeedRepository::new(&db)
            .upsert(&NewFeed {
                id: "MP_1".to_string(),
                mp_name: "One".to_string(),
                mp_cover: String::new(),
                mp_intro: String::new(),
                update_time: 0,
                status: 1,
                folder_id: None,
            })
            .await
            .unwrap();
        ArticleRepository::new(&db)
            .insert_many(&[
                NewArticle {
                    id: "old".to_string(),
                    mp_id: "MP_1".to_string(),
                    title: "Old".to_string(),
                    pic_url: String::new(),
                    publish_time: 1,
                },
                NewArticle {
                    id: "new".to_string(),
                    mp_id: "MP_1".to_string(),
                    title: "New".to_string(),
                    pic_url: String::new(),
                    publish_time: 2,
                },
            ])
            .await
            .unwrap();
        AccountRepository::new(&db)
            .upsert("acc", "reader", "secret-token")
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("backup");
        let report = backup_feeds(&db, &target).await.unwrap();

        assert!(report.path.starts_with(&target));
        assert_eq!(
            report.summary,
            BackupSummary {
                feeds_count: 1,
                articles_count: 2,
                accounts_count: 1
            }
        );

        let content = std::fs::read_to_string(&report.path).unwrap();
        assert!(!content.contains("secret-token"));

        let json: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["version"], "1.0");
        assert!(json["exportTime"].as_str().unwrap().ends_with('Z'));
        assert_eq!(json["data"]["feeds"][0]["mpName"], "One");
        assert_eq!(json["data"]["articles"][0]["id"], "new");
        assert_eq!(json["summary"]["articlesCount"], 2);

        let account = json["data"]["accounts"][0].as_object().unwrap();
        assert_eq!(account["name"], "reader");
        assert!(!account.contains_key("token"));
    }
}
