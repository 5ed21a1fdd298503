use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mpfeed_core::{storage::Database, AppConfig};

mod commands;

#[derive(Parser)]
#[command(name = "mpfeed")]
#[command(author, version, about = "Public-account feed aggregator serving RSS, Atom and JSON feeds")]
struct Cli {
    /// Configuration file (defaults to ~/.config/mpfeed/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server and the background refresh scheduler
    Serve,
    /// Manage subscribed feeds
    Feed {
        #[command(subcommand)]
        action: FeedAction,
    },
    /// Manage folders
    Folder {
        #[command(subcommand)]
        action: FolderAction,
    },
    /// Browse stored articles
    Article {
        #[command(subcommand)]
        action: ArticleAction,
    },
    /// Fetch the latest articles of one feed or of every enabled feed
    Refresh {
        /// Feed id; all enabled feeds when omitted
        #[arg(short, long)]
        feed: Option<String>,
    },
    /// Fetch older articles of a feed page by page (requires a running server)
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Export or inspect OPML
    Opml {
        #[command(subcommand)]
        action: OpmlAction,
    },
    /// Write a JSON backup of feeds, articles and accounts
    Backup {
        /// Target directory (defaults to backup.dir or <data_dir>/backup)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Manage platform accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
enum FeedAction {
    /// List feeds, optionally of one folder ("uncategorized" for none)
    List {
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Subscribe to the accounts behind one or more share links
    Add {
        #[arg(required = true)]
        links: Vec<String>,
        /// Folder for the new feeds
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Unsubscribe a feed (its articles are kept)
    Remove { id: String },
    /// Include a feed in scheduled refreshes
    Enable { id: String },
    /// Exclude a feed from scheduled refreshes
    Disable { id: String },
    /// Move feeds into a folder ("uncategorized" removes them from any folder)
    Move {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(short, long)]
        folder: String,
    },
}

#[derive(Subcommand)]
enum FolderAction {
    List,
    Add {
        name: String,
        #[arg(short, long, default_value_t = 0)]
        order: i64,
    },
    Rename { id: String, name: String },
    /// Delete a folder; its feeds become uncategorized
    Remove { id: String },
}

#[derive(Subcommand)]
enum ArticleAction {
    /// List articles, newest first
    List {
        #[arg(short, long)]
        feed: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
        /// Cursor printed by a previous page
        #[arg(short, long)]
        cursor: Option<String>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    Start { id: String },
    Stop,
    Status,
}

#[derive(Subcommand)]
enum OpmlAction {
    /// Write every subscription as OPML
    Export {
        /// Output file (defaults to MpFeed-All.opml in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only feeds of this folder ("uncategorized" for none)
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// List the outlines of an OPML file
    Inspect { file: PathBuf },
}

#[derive(Subcommand)]
enum AccountAction {
    List,
    Add {
        id: String,
        token: String,
        #[arg(short, long, default_value = "")]
        name: String,
    },
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Arc::new(config);

    // Initialize database
    let db = Database::new(&config).await?;

    let result = match cli.command {
        Commands::Serve => commands::serve::run(db.clone(), config).await,
        Commands::Feed { action } => match action {
            FeedAction::List { folder } => commands::feed::list(&db, folder.as_deref()).await,
            FeedAction::Add { links, folder } => {
                commands::feed::add(db.clone(), config, &links, folder.as_deref()).await
            }
            FeedAction::Remove { id } => commands::feed::remove(&db, &id).await,
            FeedAction::Enable { id } => commands::feed::set_enabled(&db, &id, true).await,
            FeedAction::Disable { id } => commands::feed::set_enabled(&db, &id, false).await,
            FeedAction::Move { ids, folder } => commands::feed::move_to(&db, &ids, &folder).await,
        },
        Commands::Folder { action } => match action {
            FolderAction::List => commands::folder::list(&db).await,
            FolderAction::Add { name, order } => commands::folder::add(&db, &name, order).await,
            FolderAction::Rename { id, name } => commands::folder::rename(&db, &id, &name).await,
            FolderAction::Remove { id } => commands::folder::remove(&db, &id).await,
        },
        Commands::Article {
            action: ArticleAction::List { feed, limit, cursor },
        } => commands::article::list(&db, feed.as_deref(), limit, cursor.as_deref()).await,
        Commands::Refresh { feed } => {
            commands::refresh::run(db.clone(), config, feed.as_deref()).await
        }
        Commands::Opml {
            action: OpmlAction::Export { output, folder },
        } => commands::opml::export(&db, &config, output, folder.as_deref()).await,
        Commands::Backup { output } => commands::backup::run(&db, &config, output).await,
        Commands::Account { action } => match action {
            AccountAction::List => commands::account::list(&db).await,
            AccountAction::Add { id, token, name } => {
                commands::account::add(&db, &id, &name, &token).await
            }
            AccountAction::Remove { id } => commands::account::remove(&db, &id).await,
        },
        Commands::History { action } => match action {
            HistoryAction::Start { id } => commands::history::start(&config, &id).await,
            HistoryAction::Stop => commands::history::stop(&config).await,
            HistoryAction::Status => commands::history::status(&config).await,
        },
        Commands::Opml {
            action: OpmlAction::Inspect { file },
        } => commands::opml::inspect(&file).await,
    };

    db.close().await;
    result
}
