use crate::error::*;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    /// Whether the watcher has to stop. Non-fatal errors fail at most the
    /// current run and the next scheduled run tries again.
    fn is_fatal(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Fetch(e) => {
                error!("Fetch error details: {:?}", e);
            }
            CoreError::Parse(e) => {
                e.log_error();
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            CoreError::State(e) => {
                error!("State error details: {:?}", e);
            }
            CoreError::Notify(_) => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        match self {
            CoreError::Fetch(e) => e.is_fatal(),
            CoreError::Parse(e) => e.is_fatal(),
            CoreError::Notify(e) => e.is_fatal(),
            CoreError::Config(e) => e.is_fatal(),
            CoreError::State(e) => e.is_fatal(),
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Fetch(e) => e.user_friendly_message(),
            CoreError::Parse(e) => e.user_friendly_message(),
            CoreError::Notify(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::State(e) => e.user_friendly_message(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Fetch(_) => "FETCH".to_string(),
            CoreError::Parse(_) => "PARSE".to_string(),
            CoreError::Notify(_) => "NOTIFY".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::State(_) => "STATE".to_string(),
        }
    }
}

impl ErrorExt for FetchError {
    fn log_error(&self) -> &Self {
        error!("FetchError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("FetchError (warning): {}", self);
        self
    }

    // The forum may answer again on the next run.
    fn is_fatal(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            FetchError::Network { .. } => {
                "Could not reach the forum. Please check your internet connection.".to_string()
            }
            FetchError::Status { status_code, .. } => {
                format!("The forum answered with HTTP {}.", status_code)
            }
            FetchError::Blocked { .. } => {
                "The forum blocked the feed request. A headless browser may be required."
                    .to_string()
            }
            FetchError::EmptyDocument { .. } => "The forum returned an empty feed.".to_string(),
            FetchError::Timeout { seconds, .. } => {
                format!("The feed did not load within {} seconds.", seconds)
            }
            FetchError::BrowserFailed { reason } => {
                format!("The headless browser failed: {}", reason)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            FetchError::Network { .. } => "FETCH_NETWORK".to_string(),
            FetchError::Status { .. } => "FETCH_STATUS".to_string(),
            FetchError::Blocked { .. } => "FETCH_BLOCKED".to_string(),
            FetchError::EmptyDocument { .. } => "FETCH_EMPTY".to_string(),
            FetchError::Timeout { .. } => "FETCH_TIMEOUT".to_string(),
            FetchError::BrowserFailed { .. } => "FETCH_BROWSER_FAILED".to_string(),
        }
    }
}

impl ErrorExt for ParseError {
    fn log_error(&self) -> &Self {
        error!("ParseError: {}", self);
        if let ParseError::Xml {
            line,
            column,
            excerpt: Some(excerpt),
            ..
        } = self
        {
            error!("{:4}: {}", line, excerpt);
            error!("      {}^", " ".repeat(column.saturating_sub(1)));
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ParseError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ParseError::Xml { line, column, .. } => format!(
                "The feed is not valid XML (line {}, column {}).",
                line, column
            ),
            ParseError::NotAFeed { .. } => {
                "RSS feed not formatted as expected.".to_string()
            }
            ParseError::MissingChannel => "The feed has no channel.".to_string(),
            ParseError::MissingField { field, .. } => {
                format!("A feed item is missing its {}.", field)
            }
            ParseError::InvalidLink { value, .. } => {
                format!("A feed item has an invalid link: {}", value)
            }
            ParseError::InvalidDate { value, .. } => {
                format!("A feed item has an invalid date: {}", value)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ParseError::Xml { .. } => "PARSE_XML".to_string(),
            ParseError::NotAFeed { .. } => "PARSE_NOT_A_FEED".to_string(),
            ParseError::MissingChannel => "PARSE_NO_CHANNEL".to_string(),
            ParseError::MissingField { .. } => "PARSE_MISSING_FIELD".to_string(),
            ParseError::InvalidLink { .. } => "PARSE_INVALID_LINK".to_string(),
            ParseError::InvalidDate { .. } => "PARSE_INVALID_DATE".to_string(),
        }
    }
}

impl ErrorExt for NotifyError {
    fn log_error(&self) -> &Self {
        error!("NotifyError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("NotifyError (warning): {}", self);
        self
    }

    // Delivery is at-most-once; a failed push never stops the run.
    fn is_fatal(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            NotifyError::Request(_) => {
                "Could not reach the notification service.".to_string()
            }
            NotifyError::Rejected { status_code, .. } => format!(
                "The notification service rejected the message (HTTP {}).",
                status_code
            ),
        }
    }

    fn error_code(&self) -> String {
        match self {
            NotifyError::Request(_) => "NOTIFY_REQUEST".to_string(),
            NotifyError::Rejected { .. } => "NOTIFY_REJECTED".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' was not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required setting '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Setting '{}' has an invalid value: '{}'", field, value)
            }
            ConfigError::Parse(_) => "The configuration file is not valid TOML.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE".to_string(),
        }
    }
}

impl ErrorExt for StateError {
    fn log_error(&self) -> &Self {
        error!("StateError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StateError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StateError::Read { path, .. } => format!("Could not read state file '{}'.", path),
            StateError::Write { path, .. } => format!("Could not write state file '{}'.", path),
            StateError::Corrupt { path, .. } => {
                format!("State file '{}' is corrupt. Delete it to start over.", path)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            StateError::Read { .. } => "STATE_READ".to_string(),
            StateError::Write { .. } => "STATE_WRITE".to_string(),
            StateError::Corrupt { .. } => "STATE_CORRUPT".to_string(),
        }
    }
}
