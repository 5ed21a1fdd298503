mod account_repo;
mod article_repo;
mod database;
mod feed_repo;
mod folder_repo;

pub use account_repo::AccountRepository;
pub use article_repo::{ArticlePage, ArticleRepository, TitleFilter};
pub use database::Database;
pub use feed_repo::FeedRepository;
pub use folder_repo::FolderRepository;
