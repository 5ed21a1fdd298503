use anyhow::Result;

use mpfeed_core::storage::{AccountRepository, Database};

pub async fn list(db: &Database) -> Result<()> {
    let accounts = AccountRepository::new(db).list_summaries().await?;

    if accounts.is_empty() {
        println!("No platform accounts. Add one with 'mpfeed account add <id> <token>'.");
        return Ok(());
    }

    for account in &accounts {
        println!("  {} - {} ({:?})", account.id, account.name, account.status);
    }
    Ok(())
}

pub async fn add(db: &Database, id: &str, name: &str, token: &str) -> Result<()> {
    let account = AccountRepository::new(db).upsert(id, name, token).await?;
    println!("Saved account {} ({:?})", account.id, account.status);
    Ok(())
}

pub async fn remove(db: &Database, id: &str) -> Result<()> {
    if AccountRepository::new(db).delete(id).await? {
        println!("Removed account {}", id);
    } else {
        println!("Account '{}' not found.", id);
    }
    Ok(())
}
