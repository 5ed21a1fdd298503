use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::Database;
use crate::feed::{Article, NewArticle};
use crate::{Error, Result};

/// Repository for article CRUD operations
pub struct ArticleRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct ArticleRow {
    id: String,
    mp_id: String,
    title: String,
    pic_url: String,
    publish_time: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            mp_id: row.mp_id,
            title: row.title,
            pic_url: row.pic_url,
            publish_time: row.publish_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// One page of articles and the cursor of the next one
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePage {
    pub items: Vec<Article>,
    pub next_cursor: Option<String>,
}

/// Title substring filters applied to feed output
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    /// Keep articles whose title contains any of these
    pub include: Vec<String>,
    /// Drop articles whose title contains any of these
    pub exclude: Vec<String>,
}

impl TitleFilter {
    /// Build from `|`-separated query values
    pub fn from_params(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: split_terms(include),
            exclude: split_terms(exclude),
        }
    }
}

fn split_terms(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split('|')
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Keyset position: `<publish_time>:<id>`
fn encode_cursor(article: &Article) -> String {
    format!("{}:{}", article.publish_time, article.id)
}

fn decode_cursor(cursor: &str) -> Result<(i64, &str)> {
    let (time, id) = cursor
        .split_once(':')
        .ok_or_else(|| Error::Validation(format!("invalid cursor: {}", cursor)))?;
    let time = time
        .parse::<i64>()
        .map_err(|_| Error::Validation(format!("invalid cursor: {}", cursor)))?;
    Ok((time, id))
}

/// Escape LIKE wildcards so terms match literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

const ARTICLE_COLUMNS: &str = "id, mp_id, title, pic_url, publish_time, created_at, updated_at";

impl<'a> ArticleRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert articles, skipping ids already stored; returns how many were new
    pub async fn insert_many(&self, articles: &[NewArticle]) -> Result<u32> {
        let now = Utc::now();
        let mut inserted = 0;

        let mut tx = self.db.pool().begin().await?;
        for article in articles {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO articles (id, mp_id, title, pic_url, publish_time, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&article.id)
            .bind(&article.mp_id)
            .bind(&article.title)
            .bind(&article.pic_url)
            .bind(article.publish_time)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected() as u32;
        }
        tx.commit().await?;

        Ok(inserted)
    }

    /// Find an article by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Article>> {
        let row: Option<ArticleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM articles WHERE id = ?",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Article::from))
    }

    /// Cursor-paginated listing, newest first
    pub async fn list_page(
        &self,
        mp_id: Option<&str>,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ArticlePage> {
        let limit = limit.max(1);
        let position = cursor.map(decode_cursor).transpose()?;

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM articles WHERE 1 = 1", ARTICLE_COLUMNS));

        if let Some(mp_id) = mp_id {
            query.push(" AND mp_id = ").push_bind(mp_id);
        }
        if let Some((time, id)) = position {
            query
                .push(" AND (publish_time < ")
                .push_bind(time)
                .push(" OR (publish_time = ")
                .push_bind(time)
                .push(" AND id < ")
                .push_bind(id)
                .push("))");
        }
        // One extra row tells whether another page exists
        query
            .push(" ORDER BY publish_time DESC, id DESC LIMIT ")
            .push_bind(limit as i64 + 1);

        let rows: Vec<ArticleRow> = query.build_query_as().fetch_all(self.db.pool()).await?;
        let mut items: Vec<Article> = rows.into_iter().map(Article::from).collect();

        let next_cursor = if items.len() > limit as usize {
            items.truncate(limit as usize);
            items.last().map(encode_cursor)
        } else {
            None
        };

        Ok(ArticlePage { items, next_cursor })
    }

    /// Articles for a rendered feed document (`mp_id = None` covers every feed)
    pub async fn list_for_feed_output(
        &self,
        mp_id: Option<&str>,
        limit: u32,
        offset: u32,
        filter: &TitleFilter,
    ) -> Result<Vec<Article>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM articles WHERE 1 = 1", ARTICLE_COLUMNS));

        if let Some(mp_id) = mp_id {
            query.push(" AND mp_id = ").push_bind(mp_id);
        }

        if !filter.include.is_empty() {
            query.push(" AND (");
            for (i, term) in filter.include.iter().enumerate() {
                if i > 0 {
                    query.push(" OR ");
                }
                query
                    .push("title LIKE ")
                    .push_bind(like_pattern(term))
                    .push(" ESCAPE '\\'");
            }
            query.push(")");
        }

        for term in &filter.exclude {
            query
                .push(" AND title NOT LIKE ")
                .push_bind(like_pattern(term))
                .push(" ESCAPE '\\'");
        }

        query
            .push(" ORDER BY publish_time DESC, id DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let rows: Vec<ArticleRow> = query.build_query_as().fetch_all(self.db.pool()).await?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Number of stored articles of one feed
    pub async fn count_by_feed(&self, mp_id: &str) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles WHERE mp_id = ?")
            .bind(mp_id)
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }

    /// Every article, newest first
    pub async fn list_all(&self) -> Result<Vec<Article>> {
        let rows: Vec<ArticleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM articles ORDER BY publish_time DESC, id DESC",
            ARTICLE_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
