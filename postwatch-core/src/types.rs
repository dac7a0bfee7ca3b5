use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub link: Url,
    pub published_at: DateTime<Utc>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub domain: Option<String>,
}

/// Id of the newest post already processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marker(String);

impl Marker {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, post: &Post) -> bool {
        self.0 == post.id
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted watcher state, read before a run and written after it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchState {
    #[serde(default)]
    pub marker: Option<Marker>,
    /// An error notification was sent and no run has succeeded since.
    #[serde(default)]
    pub alert_active: bool,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Case-insensitive title keywords.
///
/// Keywords are stored lower-cased, trimmed and without duplicates, in the
/// order they were configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !set.keywords.contains(&keyword) {
                set.keywords.push(keyword);
            }
        }
        set
    }

    /// Parses a comma separated list such as `"uhr, Seiko,omega"`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// Returns the first keyword contained in `title`, ignoring case.
    pub fn find_match(&self, title: &str) -> Option<&str> {
        let title = title.to_lowercase();
        self.iter().find(|keyword| title.contains(keyword))
    }

    pub fn matches(&self, title: &str) -> bool {
        self.find_match(title).is_some()
    }
}

impl fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keywords.join(", "))
    }
}

pub const DEFAULT_NOTIFICATION_TITLE: &str = "New Forum Post";
pub const WATCHER_TITLE: &str = "Forum Watcher";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub link: Option<Url>,
}

impl NotificationPayload {
    pub fn for_post(post: &Post, title: &str) -> Self {
        Self {
            title: title.to_string(),
            message: format!("New Post: {}\nLink: {}", post.title, post.link),
            link: Some(post.link.clone()),
        }
    }

    pub fn startup() -> Self {
        Self {
            title: WATCHER_TITLE.to_string(),
            message: "Watcher is active and monitoring the RSS feed.".to_string(),
            link: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            title: WATCHER_TITLE.to_string(),
            message: format!("Error occurred: {}", message),
            link: None,
        }
    }
}

/// Order in which the feed lists its items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// What to do with the posts already in the feed when no marker exists yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstRunPolicy {
    /// Treat everything as already seen and only remember the newest id.
    #[default]
    MarkSeen,
    /// Treat every post as new.
    NotifyAll,
}
