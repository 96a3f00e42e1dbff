//! Configuration management for feedwatch.
//!
//! Configuration is read from `~/.config/feedwatch/config.toml` (or the path
//! given with `--config`), then overridden by environment variables. A `.env`
//! file in the working directory is loaded into the environment first.
//! Everything downstream receives the resulting [`Config`]; nothing else reads
//! the environment.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://linux.do/c/welfare/36.rss";

pub const ENV_FEED_URL: &str = "RSS_URL";
pub const ENV_COOKIE: &str = "RSS_COOKIE";
pub const ENV_STORAGE_DIR: &str = "RSS_STORAGE_DIR";
pub const ENV_WEBHOOK_URL: &str = "FEISHU_BOT_URL";
pub const ENV_WEBHOOK_SECRET: &str = "FEISHU_BOT_SECRET";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed to poll
    pub url: String,

    /// Raw `Cookie` header sent with both requests, e.g. a clearance cookie
    pub cookie: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            cookie: None,
        }
    }
}

/// Request session settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds (default: 15)
    pub timeout_secs: u64,

    /// Pause between the warm-up request and the feed request in milliseconds (default: 2000)
    pub warmup_delay_ms: u64,

    pub user_agent: String,

    pub accept_language: String,

    /// Skip TLS certificate validation (default: true)
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            warmup_delay_ms: 2000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
            accept_invalid_certs: true,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn warmup_delay(&self) -> Duration {
        Duration::from_millis(self.warmup_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the snapshot file
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = dirs::data_dir()
            .map(|d| d.join("feedwatch"))
            .unwrap_or_else(|| PathBuf::from("rss_monitor_data"));
        Self { dir }
    }
}

/// Feishu webhook settings. Notifications are off while `webhook_url` is unset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub secret: Option<String>,
    pub title: String,
    pub failure_title: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            secret: None,
            title: "RSS feed update".to_string(),
            failure_title: "RSS feed request failed".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// An explicit path must exist. A missing default file means defaults.
    /// Missing fields in the config file will use default values.
    /// Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::default_config_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Override settings from environment-style lookups. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_FEED_URL) {
            self.feed.url = url;
        }
        if let Some(cookie) = get(ENV_COOKIE) {
            self.feed.cookie = Some(cookie);
        }
        if let Some(dir) = get(ENV_STORAGE_DIR) {
            self.storage.dir = PathBuf::from(dir);
        }
        if let Some(url) = get(ENV_WEBHOOK_URL) {
            self.notify.webhook_url = Some(url);
        }
        if let Some(secret) = get(ENV_WEBHOOK_SECRET) {
            self.notify.secret = Some(secret);
        }
    }

    /// Get the default config file path: `~/.config/feedwatch/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedwatch").join("config.toml"))
    }

    /// Create a default config file with comments. Returns false if one already exists.
    pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(true)
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# feedwatch configuration
#
# Environment variables override these values:
#   RSS_URL, RSS_COOKIE, RSS_STORAGE_DIR, FEISHU_BOT_URL, FEISHU_BOT_SECRET

[feed]
url = "https://linux.do/c/welfare/36.rss"
# Cookie header sent with every request (e.g. a clearance cookie)
# cookie = "cf_clearance=..."

[fetch]
# Per-request timeout in seconds
timeout_secs = 15

# Pause between the warm-up request and the feed request (milliseconds)
warmup_delay_ms = 2000

user_agent = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
accept_language = "zh-CN,zh;q=0.9,en;q=0.8"

# Skip TLS certificate validation
accept_invalid_certs = true

[storage]
# Directory holding rss_feed_data.json
# dir = "/var/lib/feedwatch"

[notify]
# Feishu custom bot webhook; notifications are disabled while unset
# webhook_url = "https://open.feishu.cn/open-apis/bot/v2/hook/..."
# secret = "..."
title = "RSS feed update"
failure_title = "RSS feed request failed"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
