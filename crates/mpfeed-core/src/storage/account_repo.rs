use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::Database;
use crate::feed::{Account, AccountStatus, AccountSummary};
use crate::{Error, Result};

/// Repository for platform accounts
pub struct AccountRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct AccountRow {
    id: String,
    name: String,
    token: String,
    status: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            name: row.name,
            token: row.token,
            // Unknown stored values are treated as unusable
            status: AccountStatus::try_from(row.status).unwrap_or(AccountStatus::Invalid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl<'a> AccountRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert an account or replace its name and token; the status resets to enabled
    pub async fn upsert(&self, id: &str, name: &str, token: &str) -> Result<AccountSummary> {
        if id.trim().is_empty() || token.trim().is_empty() {
            return Err(Error::Validation(
                "account id and token must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, token, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                token = excluded.token,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(token)
        .bind(i32::from(AccountStatus::Enabled))
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        self.find_by_id(id)
            .await?
            .map(AccountSummary::from)
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, name, token, status, created_at, updated_at FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Account::from))
    }

    /// Enabled accounts with their tokens, oldest first
    pub async fn list_enabled(&self) -> Result<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, name, token, status, created_at, updated_at
            FROM accounts
            WHERE status = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(i32::from(AccountStatus::Enabled))
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    /// All accounts without their tokens, oldest first
    pub async fn list_summaries(&self) -> Result<Vec<AccountSummary>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, name, token, status, created_at, updated_at
            FROM accounts
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AccountSummary::from(Account::from(row)))
            .collect())
    }

    pub async fn set_status(&self, id: &str, status: AccountStatus) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(i32::from(status))
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::AccountNotFound(id.to_string()));
        }

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enabled_list_skips_invalid_and_disabled() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = AccountRepository::new(&db);

        repo.upsert("1", "a", "t1").await.unwrap();
        repo.upsert("2", "b", "t2").await.unwrap();
        repo.upsert("3", "c", "t3").await.unwrap();
        repo.set_status("1", AccountStatus::Invalid).await.unwrap();
        repo.set_status("3", AccountStatus::Disabled).await.unwrap();

        let enabled = repo.list_enabled().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, "2");
        assert_eq!(enabled[0].token, "t2");

        let summaries = repo.list_summaries().await.unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].status, AccountStatus::Invalid);
    }

    #[tokio::test]
    async fn test_upsert_reenables_account() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = AccountRepository::new(&db);

        repo.upsert("1", "a", "old").await.unwrap();
        repo.set_status("1", AccountStatus::Invalid).await.unwrap();
        let summary = repo.upsert("1", "a", "new").await.unwrap();
        assert_eq!(summary.status, AccountStatus::Enabled);

        let account = repo.find_by_id("1").await.unwrap().unwrap();
        assert_eq!(account.token, "new");

        assert!(matches!(repo.upsert("2", "b", " ").await, Err(Error::Validation(_))));
        assert!(matches!(
            repo.set_status("missing", AccountStatus::Enabled).await,
            Err(Error::AccountNotFound(_))
        ));
        assert!(repo.delete("1").await.unwrap());
    }
}
