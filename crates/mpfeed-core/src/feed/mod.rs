mod models;
mod opml;
mod render;

pub use models::{
    article_link, from_unix, target_folder, Account, AccountStatus, AccountSummary, Article,
    Feed, FeedFormat, FeedUpdate, Folder, FolderFilter, FolderUpdate, NewArticle, NewFeed,
    FEED_STATUS_DISABLED, FEED_STATUS_ENABLED, UNCATEGORIZED,
};
pub use opml::{export_opml, feed_id_from_url, parse_opml, OpmlOutline, OPML_FILE_NAME};
pub use render::{render, FeedItem, FeedMeta};
