use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Feed fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Feed parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Feed request to {url} returned HTTP {status_code}")]
    Status { url: String, status_code: u16 },

    #[error("Access to {url} was blocked: {reason}")]
    Blocked { url: String, reason: String },

    #[error("Empty document received from {url}")]
    EmptyDocument { url: String },

    #[error("Fetching {url} timed out after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    #[error("Headless browser failed: {reason}")]
    BrowserFailed { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("XML error at line {line}, column {column}: {message}")]
    Xml {
        line: usize,
        column: usize,
        message: String,
        excerpt: Option<String>,
    },

    #[error("Document is not a feed: {reason}")]
    NotAFeed { reason: String },

    #[error("Feed has no <channel> element")]
    MissingChannel,

    #[error("Item {index} is missing <{field}>")]
    MissingField { index: usize, field: String },

    #[error("Item {index} has an invalid link: {value}")]
    InvalidLink { index: usize, value: String },

    #[error("Item {index} has an invalid pubDate: {value}")]
    InvalidDate { index: usize, value: String },
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notification rejected with status {status_code}: {body}")]
    Rejected { status_code: u16, body: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read state from {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to write state to {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Corrupt state file {path}: {details}")]
    Corrupt { path: String, details: String },
}
