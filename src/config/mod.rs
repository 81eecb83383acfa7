//! Configuration management.
//!
//! Configuration is read from `~/.config/reelcrawl/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! Secrets and deployment knobs can be overridden from the environment.

pub mod interval;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::Language;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database path (default: `<data dir>/reelcrawl/reelcrawl.db`)
    pub database: Option<PathBuf>,
    pub site: SiteConfig,
    pub crawl: CrawlConfig,
    pub enrichment: EnrichmentConfig,
    pub server: ServerConfig,
}

/// Source site access.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    /// Page-fetch proxies, tried in shuffled order. Empty means direct requests.
    pub proxies: Vec<String>,
    /// Premium account, enables HD streams
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
    #[serde(deserialize_with = "interval::deserialize")]
    pub session_max_age: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://einthusan.tv".to_string(),
            proxies: Vec::new(),
            username: None,
            password: None,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            session_max_age: Duration::from_secs(6 * 3600),
        }
    }
}

impl SiteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_credentials(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Listing crawl behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub languages: Vec<Language>,
    /// Deepest listing page the catch-up crawl will visit
    pub max_pages: u32,
    /// Leading pages re-crawled by the periodic refresh
    pub refresh_pages: u32,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub rate_limit_cooldown_secs: u64,
    pub max_rate_limit_retries: u32,
    #[serde(deserialize_with = "interval::deserialize")]
    pub refresh_interval: Duration,
    #[serde(deserialize_with = "interval::deserialize")]
    pub catch_up_interval: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            languages: Language::ALL.to_vec(),
            max_pages: 500,
            refresh_pages: 2,
            delay_min_ms: 500,
            delay_max_ms: 2500,
            rate_limit_cooldown_secs: 60,
            max_rate_limit_retries: 3,
            refresh_interval: Duration::from_secs(3 * 3600),
            catch_up_interval: Duration::from_secs(24 * 3600),
        }
    }
}

impl CrawlConfig {
    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }
}

/// External id lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// TMDB API key; enrichment is disabled without one
    pub api_key: Option<String>,
    pub base_url: String,
    pub batch_size: usize,
    pub lookup_delay_ms: u64,
    pub catch_up_delay_secs: u64,
    #[serde(deserialize_with = "interval::deserialize")]
    pub interval: Duration,
    /// Region bias for the broad tier
    pub region: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.themoviedb.org/3".to_string(),
            batch_size: 25,
            lookup_delay_ms: 250,
            catch_up_delay_secs: 5,
            interval: Duration::from_secs(15 * 60),
            region: "IN".to_string(),
        }
    }
}

impl EnrichmentConfig {
    pub fn lookup_delay(&self) -> Duration {
        Duration::from_millis(self.lookup_delay_ms)
    }

    pub fn catch_up_delay(&self) -> Duration {
        Duration::from_secs(self.catch_up_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7000,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// If the default config file doesn't exist, creates one with comments.
    /// Missing fields use default values; environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
                path: config_path.clone(),
                source: e,
            })?;

            toml::from_str::<Config>(&content).map_err(|e| ConfigError::Parse {
                path: config_path,
                source: e,
            })?
        } else {
            if path.is_none() {
                Self::create_default_config(&config_path)?;
            }
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/reelcrawl/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("reelcrawl").join("config.toml"))
    }

    /// Apply environment-style overrides, looked up through `get`.
    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get("TMDB_API_KEY") {
            self.enrichment.api_key = Some(key);
        }
        if let Some(user) = get("EINTHUSAN_USERNAME") {
            self.site.username = Some(user);
        }
        if let Some(password) = get("EINTHUSAN_PASSWORD") {
            self.site.password = Some(password);
        }
        if let Some(proxies) = get("PROXY_URLS") {
            self.site.proxies = proxies
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(base_url) = get("BASE_URL") {
            self.site.base_url = base_url;
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(db) = get("DATABASE_PATH") {
            self.database = Some(PathBuf::from(db));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawl.languages.is_empty() {
            return Err(ConfigError::Invalid("crawl.languages must not be empty".into()));
        }
        if self.crawl.max_pages == 0 || self.crawl.refresh_pages == 0 {
            return Err(ConfigError::Invalid(
                "crawl.max_pages and crawl.refresh_pages must be at least 1".into(),
            ));
        }
        if self.crawl.delay_min_ms > self.crawl.delay_max_ms {
            return Err(ConfigError::Invalid(
                "crawl.delay_min_ms must not exceed crawl.delay_max_ms".into(),
            ));
        }
        if self.enrichment.batch_size == 0 {
            return Err(ConfigError::Invalid("enrichment.batch_size must be at least 1".into()));
        }
        url::Url::parse(&self.site.base_url)
            .map_err(|e| ConfigError::Invalid(format!("site.base_url: {}", e)))?;
        Ok(())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
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

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# reelcrawl configuration
#
# Intervals accept "30s", "15m", "3h", "1d" or a plain number of seconds.
# Environment overrides: TMDB_API_KEY, EINTHUSAN_USERNAME, EINTHUSAN_PASSWORD,
# PROXY_URLS (comma separated), BASE_URL, PORT, DATABASE_PATH.

# database = "/var/lib/reelcrawl/reelcrawl.db"

[site]
base_url = "https://einthusan.tv"
# Page-fetch proxies accepting POST {"pageURL": "..."}; tried in random order
proxies = []
timeout_secs = 30
# Premium session lifetime before a fresh login
session_max_age = "6h"

[crawl]
languages = ["tamil", "hindi", "telugu", "malayalam", "kannada", "bengali", "marathi", "punjabi"]
max_pages = 500
refresh_pages = 2
# Random politeness delay between listing pages
delay_min_ms = 500
delay_max_ms = 2500
# Pause after being rate limited, and how often to resume before deferring
rate_limit_cooldown_secs = 60
max_rate_limit_retries = 3
refresh_interval = "3h"
catch_up_interval = "24h"

[enrichment]
# api_key = "..."
base_url = "https://api.themoviedb.org/3"
batch_size = 25
lookup_delay_ms = 250
catch_up_delay_secs = 5
interval = "15m"
region = "IN"

[server]
host = "0.0.0.0"
port = 7000
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

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
