//! Watcher configuration.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables, which keeps the `.env` based deployment of the
//! watcher working without a settings file at all.

use crate::error::ConfigError;
use crate::types::{FeedOrder, FirstRunPolicy, KeywordSet, DEFAULT_NOTIFICATION_TITLE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const CONFIG_PATH_ENV: &str = "POSTWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "postwatch.toml";

pub const DEFAULT_FEED_URL: &str = "https://uhrforum.de/forums/-/index.rss";
pub const DEFAULT_PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";
pub const DEFAULT_STATE_PATH: &str = "postwatch-state.json";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub http: HttpConfig,
    pub browser: BrowserConfig,
    pub pushover: PushoverConfig,
    pub state: StateConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub order: FeedOrder,
    pub first_run: FirstRunPolicy,
    pub keywords: Vec<String>,
    pub category: Option<CategoryFilter>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            order: FeedOrder::default(),
            first_run: FirstRunPolicy::default(),
            keywords: Vec::new(),
            category: None,
        }
    }
}

/// Restricts the feed to items of one forum section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryFilter {
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub referer: Option<String>,
    pub platform: Option<String>,
    pub timeout_seconds: u64,
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: Some("https://uhrforum.de/".to_string()),
            platform: Some("macOS".to_string()),
            timeout_seconds: 30,
            accept_invalid_certs: false,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub enabled: bool,
    pub binary: Option<PathBuf>,
    pub timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: None,
            timeout_seconds: 60,
        }
    }
}

impl BrowserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushoverConfig {
    pub token: String,
    pub user: String,
    pub endpoint: String,
    pub title: String,
}

impl Default for PushoverConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            user: String::new(),
            endpoint: DEFAULT_PUSHOVER_ENDPOINT.to_string(),
            title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between runs. Unset or zero means a single run per invocation.
    pub interval_seconds: Option<u64>,
}

impl AppConfig {
    /// Loads the settings file named by `POSTWATCH_CONFIG` (or
    /// `postwatch.toml` when present) and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let contents = read_settings_file(&path, explicit.is_some())?;
        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(file_contents: Option<&str>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: AppConfig = match file_contents {
            Some(contents) => toml::from_str(contents)?,
            None => AppConfig::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env("FEED_URL") {
            self.feed.url = url;
        }
        if let Some(keywords) = env("FILTER_KEYWORDS") {
            self.feed.keywords = keywords.split(',').map(str::to_string).collect();
        }
        if let Some(token) = env("PUSHOVER_TOKEN") {
            self.pushover.token = token;
        }
        if let Some(user) = env("PUSHOVER_USER_KEY") {
            self.pushover.user = user;
        }
        if let Some(path) = env("STATE_PATH") {
            self.state.path = PathBuf::from(path);
        }
        if let Some(path) = env("BROWSER_PATH") {
            self.browser.binary = Some(PathBuf::from(path));
        }
        if let Some(wait) = env("WAIT_TIME") {
            let seconds = wait
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    field: "WAIT_TIME".to_string(),
                    value: wait.clone(),
                })?;
            self.watch.interval_seconds = Some(seconds);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.feed_url()?;
        self.pushover_endpoint()?;

        if self.pushover.token.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "pushover.token".to_string(),
            });
        }
        if self.pushover.user.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "pushover.user".to_string(),
            });
        }
        Ok(())
    }

    pub fn feed_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.feed.url).map_err(|_| ConfigError::InvalidValue {
            field: "feed.url".to_string(),
            value: self.feed.url.clone(),
        })
    }

    pub fn pushover_endpoint(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.pushover.endpoint).map_err(|_| ConfigError::InvalidValue {
            field: "pushover.endpoint".to_string(),
            value: self.pushover.endpoint.clone(),
        })
    }

    pub fn keywords(&self) -> KeywordSet {
        KeywordSet::new(&self.feed.keywords)
    }

    pub fn watch_interval(&self) -> Option<Duration> {
        self.watch
            .interval_seconds
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
    }
}

fn read_settings_file(path: &Path, required: bool) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            debug!("Loaded settings from {}", path.display());
            Ok(Some(contents))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(None),
        Err(_) => Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        }),
    }
}
