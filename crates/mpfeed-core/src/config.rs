use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::feed::FeedFormat;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public origin used when building feed links (OPML, feed self links)
    #[serde(default = "default_origin_url")]
    pub origin_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            origin_url: default_origin_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the content platform API
    #[serde(default = "default_platform_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_platform_url(),
            request_timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Scheduled refresh interval in seconds (0 = disabled)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Pause between feeds while refreshing all of them
    #[serde(default = "default_update_delay")]
    pub update_delay_secs: u64,
    /// Pause between history pages
    #[serde(default = "default_history_page_delay")]
    pub history_page_delay_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            update_delay_secs: default_update_delay(),
            history_page_delay_secs: default_history_page_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Items per feed response when `limit` is absent
    #[serde(default = "default_feed_limit")]
    pub default_limit: u32,
    /// Upper bound for `limit`
    #[serde(default = "default_feed_max_limit")]
    pub max_limit: u32,
    /// Title of the aggregate feed and the OPML document
    #[serde(default = "default_feed_title")]
    pub title: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_feed_limit(),
            max_limit: default_feed_max_limit(),
            title: default_feed_title(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Backup directory (defaults to `<data_dir>/backup`)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mpfeed")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_origin_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_platform_url() -> String {
    "https://weread.111965.xyz".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    21600 // 6 hours
}

fn default_update_delay() -> u64 {
    60
}

fn default_history_page_delay() -> u64 {
    30
}

fn default_feed_limit() -> u32 {
    10
}

fn default_feed_max_limit() -> u32 {
    100
}

fn default_feed_title() -> String {
    "MpFeed".to_string()
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from the default location or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, falling back to defaults when missing
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/mpfeed/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("mpfeed")
            .join("config.toml")
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("mpfeed.db")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }

    /// Get the backup directory
    pub fn backup_dir(&self) -> PathBuf {
        match &self.backup.dir {
            Some(dir) => expand_tilde(dir),
            None => self.data_dir().join("backup"),
        }
    }

    /// Origin without trailing slash
    pub fn origin(&self) -> &str {
        self.server.origin_url.trim_end_matches('/')
    }

    /// Public URL of a feed document, e.g. `http://host/feeds/<id>.atom`
    pub fn feed_url(&self, id: &str, format: FeedFormat) -> String {
        format!("{}/feeds/{}.{}", self.origin(), id, format.extension())
    }

    /// URL a local client uses to reach the running server
    pub fn local_url(&self) -> String {
        let host = match self.server.host.as_str() {
            "0.0.0.0" | "" => "127.0.0.1",
            "::" => "[::1]",
            host => host,
        };
        format!("http://{}:{}", host, self.server.port)
    }

    /// Clamp a requested page size to the configured bounds
    pub fn clamp_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.feeds.default_limit)
            .clamp(1, self.feeds.max_limit.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.feeds.default_limit, 10);
        assert_eq!(config.sync.update_delay_secs, 60);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            origin_url = "https://rss.example.com/"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.origin(), "https://rss.example.com");
        assert_eq!(
            config.feed_url("MP_WXS_1", FeedFormat::Atom),
            "https://rss.example.com/feeds/MP_WXS_1.atom"
        );
    }

    #[test]
    fn test_backup_dir_defaults_under_data_dir() {
        let mut config = AppConfig::default();
        config.general.data_dir = PathBuf::from("/var/lib/mpfeed");
        assert_eq!(config.backup_dir(), PathBuf::from("/var/lib/mpfeed/backup"));

        config.backup.dir = Some(PathBuf::from("/srv/backup"));
        assert_eq!(config.backup_dir(), PathBuf::from("/srv/backup"));
    }

    #[test]
    fn test_local_url_for_wildcard_host() {
        let mut config = AppConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.server.port = 4100;
        assert_eq!(config.local_url(), "http://127.0.0.1:4100");

        config.server.host = "10.0.0.2".to_string();
        assert_eq!(config.local_url(), "http://10.0.0.2:4100");
    }

    #[test]
    fn test_clamp_limit() {
        let config = AppConfig::default();
        assert_eq!(config.clamp_limit(None), 10);
        assert_eq!(config.clamp_limit(Some(0)), 1);
        assert_eq!(config.clamp_limit(Some(500)), 100);
    }

    #[test]
    fn test_save_and_load_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.server.port = 8080;
        config.save(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.server.port, 8080);
    }
}
