use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error names a missing entity
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::FeedNotFound(_)
                | Error::ArticleNotFound(_)
                | Error::FolderNotFound(_)
                | Error::AccountNotFound(_)
        )
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
