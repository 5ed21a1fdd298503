use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::Database;
use crate::feed::{Feed, FeedUpdate, FolderFilter, NewFeed, FEED_STATUS_ENABLED};
use crate::{Error, Result};

/// Repository for feed CRUD operations
pub struct FeedRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct FeedRow {
    id: String,
    mp_name: String,
    mp_cover: String,
    mp_intro: String,
    status: i32,
    sync_time: i64,
    update_time: i64,
    has_history: i32,
    folder_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            mp_name: row.mp_name,
            mp_cover: row.mp_cover,
            mp_intro: row.mp_intro,
            status: row.status,
            sync_time: row.sync_time,
            update_time: row.update_time,
            has_history: row.has_history,
            folder_id: row.folder_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const FEED_COLUMNS: &str = "id, mp_name, mp_cover, mp_intro, status, sync_time, update_time, \
                            has_history, folder_id, created_at, updated_at";

impl<'a> FeedRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a feed, or refresh the platform metadata of an existing one.
    ///
    /// An existing feed keeps its sync state; its folder only changes when
    /// `new_feed.folder_id` is set.
    pub async fn upsert(&self, new_feed: &NewFeed) -> Result<Feed> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO feeds (id, mp_name, mp_cover, mp_intro, status, update_time, folder_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                mp_name = excluded.mp_name,
                mp_cover = excluded.mp_cover,
                mp_intro = excluded.mp_intro,
                status = excluded.status,
                update_time = excluded.update_time,
                folder_id = COALESCE(excluded.folder_id, feeds.folder_id),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&new_feed.id)
        .bind(&new_feed.mp_name)
        .bind(&new_feed.mp_cover)
        .bind(&new_feed.mp_intro)
        .bind(new_feed.status)
        .bind(new_feed.update_time)
        .bind(&new_feed.folder_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        self.get(&new_feed.id).await
    }

    /// Find a feed by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Feed>> {
        let row: Option<FeedRow> =
            sqlx::query_as(&format!("SELECT {} FROM feeds WHERE id = ?", FEED_COLUMNS))
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row.map(Feed::from))
    }

    /// Find a feed by ID or fail with `FeedNotFound`
    pub async fn get(&self, id: &str) -> Result<Feed> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| Error::FeedNotFound(id.to_string()))
    }

    /// List feeds in subscription order
    pub async fn list(&self, filter: &FolderFilter) -> Result<Vec<Feed>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM feeds", FEED_COLUMNS));

        match filter {
            FolderFilter::All => {}
            FolderFilter::Uncategorized => {
                query.push(" WHERE folder_id IS NULL");
            }
            FolderFilter::Folder(folder_id) => {
                query.push(" WHERE folder_id = ").push_bind(folder_id);
            }
        }
        query.push(" ORDER BY created_at ASC, id ASC");

        let rows: Vec<FeedRow> = query.build_query_as().fetch_all(self.db.pool()).await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// Feeds included in scheduled refreshes
    pub async fn list_enabled(&self) -> Result<Vec<Feed>> {
        let rows: Vec<FeedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM feeds WHERE status = ? ORDER BY created_at ASC, id ASC",
            FEED_COLUMNS
        ))
        .bind(FEED_STATUS_ENABLED)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// Apply a partial edit
    pub async fn update(&self, id: &str, update: &FeedUpdate) -> Result<Feed> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET mp_name = COALESCE(?, mp_name),
                mp_cover = COALESCE(?, mp_cover),
                mp_intro = COALESCE(?, mp_intro),
                status = COALESCE(?, status),
                update_time = COALESCE(?, update_time),
                has_history = COALESCE(?, has_history),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.mp_name)
        .bind(&update.mp_cover)
        .bind(&update.mp_intro)
        .bind(update.status)
        .bind(update.update_time)
        .bind(update.has_history)
        .bind(now)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::FeedNotFound(id.to_string()));
        }

        self.get(id).await
    }

    /// Record a sync; `has_history` is left alone when `None`
    pub async fn touch_sync(&self, id: &str, sync_time: i64, has_history: Option<i32>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feeds
            SET sync_time = ?,
                has_history = COALESCE(?, has_history),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(sync_time)
        .bind(has_history)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Move feeds into a folder (`None` = uncategorized), returning how many moved
    pub async fn move_to_folder(&self, ids: &[String], folder_id: Option<&str>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE feeds SET folder_id = ");
        query.push_bind(folder_id);
        query.push(", updated_at = ").push_bind(Utc::now());
        query.push(" WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let result = query.build().execute(self.db.pool()).await?;

        Ok(result.rows_affected())
    }

    /// Delete a feed; its articles are kept
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feeds WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get total feed count
    pub async fn count(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FolderRepository;

    fn new_feed(id: &str, name: &str) -> NewFeed {
        NewFeed {
            id: id.to_string(),
            mp_name: name.to_string(),
            mp_cover: "https://mmbiz.qpic.cn/cover.jpg".to_string(),
            mp_intro: String::new(),
            update_time: 1_700_000_000,
            status: FEED_STATUS_ENABLED,
            folder_id: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_preserves_sync_state() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        repo.upsert(&new_feed("MP_WXS_1", "Before")).await.unwrap();
        repo.touch_sync("MP_WXS_1", 1_700_000_500, Some(0)).await.unwrap();

        let feed = repo.upsert(&new_feed("MP_WXS_1", "After")).await.unwrap();
        assert_eq!(feed.mp_name, "After");
        assert_eq!(feed.sync_time, 1_700_000_500);
        assert_eq!(feed.has_history, 0);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_by_folder_filter() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);
        let folder = FolderRepository::new(&db).create("Tech", 0).await.unwrap();

        repo.upsert(&new_feed("MP_WXS_1", "One")).await.unwrap();
        repo.upsert(&new_feed("MP_WXS_2", "Two")).await.unwrap();
        let moved = repo
            .move_to_folder(&["MP_WXS_2".to_string()], Some(&folder.id))
            .await
            .unwrap();
        assert_eq!(moved, 1);

        let all = repo.list(&FolderFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);

        let in_folder = repo
            .list(&FolderFilter::Folder(folder.id.clone()))
            .await
            .unwrap();
        assert_eq!(in_folder.len(), 1);
        assert_eq!(in_folder[0].id, "MP_WXS_2");

        let uncategorized = repo.list(&FolderFilter::Uncategorized).await.unwrap();
        assert_eq!(uncategorized.len(), 1);
        assert_eq!(uncategorized[0].id, "MP_WXS_1");
    }

    #[tokio::test]
    async fn test_update_and_enabled_list() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        repo.upsert(&new_feed("MP_WXS_1", "One")).await.unwrap();
        repo.upsert(&new_feed("MP_WXS_2", "Two")).await.unwrap();

        let update = FeedUpdate {
            status: Some(0),
            ..Default::default()
        };
        let feed = repo.update("MP_WXS_1", &update).await.unwrap();
        assert!(!feed.is_enabled());
        assert_eq!(feed.mp_name, "One");

        let enabled = repo.list_enabled().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, "MP_WXS_2");

        assert!(matches!(
            repo.update("missing", &update).await,
            Err(Error::FeedNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_feed() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        repo.upsert(&new_feed("MP_WXS_1", "One")).await.unwrap();
        assert!(repo.delete("MP_WXS_1").await.unwrap());
        assert!(!repo.delete("MP_WXS_1").await.unwrap());
        assert!(repo.find_by_id("MP_WXS_1").await.unwrap().is_none());
    }
}
