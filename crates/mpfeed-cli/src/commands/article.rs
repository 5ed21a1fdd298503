use anyhow::Result;

use mpfeed_core::storage::{ArticleRepository, Database};

pub async fn list(db: &Database, feed: Option<&str>, limit: u32, cursor: Option<&str>) -> Result<()> {
    let page = ArticleRepository::new(db).list_page(feed, limit, cursor).await?;

    if page.items.is_empty() {
        println!("No articles.");
        return Ok(());
    }

    for article in &page.items {
        println!(
            "  {}  {}",
            article.published_at().format("%Y-%m-%d %H:%M"),
            article.title
        );
        println!("    {}", article.link());
    }

    if let Some(next) = page.next_cursor {
        println!("\nMore articles: --cursor {}", next);
    }
    Ok(())
}
