use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::Database;
use crate::feed::{Folder, FolderUpdate};
use crate::{Error, Result};

/// Repository for folder CRUD operations
pub struct FolderRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct FolderRow {
    id: String,
    name: String,
    sort_order: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    feed_count: i64,
}

impl From<FolderRow> for Folder {
    fn from(row: FolderRow) -> Self {
        Folder {
            id: row.id,
            name: row.name,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
            feed_count: row.feed_count as u32,
        }
    }
}

const FOLDER_SELECT: &str = r#"
    SELECT f.id, f.name, f.sort_order, f.created_at, f.updated_at,
           (SELECT COUNT(*) FROM feeds WHERE feeds.folder_id = f.id) AS feed_count
    FROM folders f
"#;

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("folder name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

impl<'a> FolderRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a folder; the name is trimmed and must not be empty
    pub async fn create(&self, name: &str, order: i64) -> Result<Folder> {
        let name = validate_name(name)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO folders (id, name, sort_order, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&name)
        .bind(order)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        self.get(&id).await
    }

    /// All folders with their feed counts
    pub async fn list(&self) -> Result<Vec<Folder>> {
        let rows: Vec<FolderRow> = sqlx::query_as(&format!(
            "{} ORDER BY f.sort_order ASC, f.created_at ASC",
            FOLDER_SELECT
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Folder::from).collect())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Folder>> {
        let row: Option<FolderRow> =
            sqlx::query_as(&format!("{} WHERE f.id = ?", FOLDER_SELECT))
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row.map(Folder::from))
    }

    /// Find a folder by ID or fail with `FolderNotFound`
    pub async fn get(&self, id: &str) -> Result<Folder> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| Error::FolderNotFound(id.to_string()))
    }

    /// Rename and/or reorder a folder
    pub async fn update(&self, id: &str, update: &FolderUpdate) -> Result<Folder> {
        let name = update.name.as_deref().map(validate_name).transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE folders
            SET name = COALESCE(?, name),
                sort_order = COALESCE(?, sort_order),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(update.order)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::FolderNotFound(id.to_string()));
        }

        self.get(id).await
    }

    /// Delete a folder; its feeds become uncategorized
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("UPDATE feeds SET folder_id = NULL, updated_at = ? WHERE folder_id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
