use postwatch_core::{
    ConfigError, CoreError, ErrorExt, FetchError, NotifyError, ParseError, StateError,
};

#[test]
fn test_error_codes() {
    let fetch_error = CoreError::Fetch(FetchError::Status {
        url: "https://forum.example/index.rss".to_string(),
        status_code: 503,
    });
    assert_eq!(fetch_error.error_code(), "FETCH");

    let parse_error = CoreError::Parse(ParseError::MissingChannel);
    assert_eq!(parse_error.error_code(), "PARSE");

    let notify_error = CoreError::Notify(NotifyError::Rejected {
        status_code: 400,
        body: "invalid token".to_string(),
    });
    assert_eq!(notify_error.error_code(), "NOTIFY");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "pushover.token".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let state_error = CoreError::State(StateError::Corrupt {
        path: "state.json".to_string(),
        details: "expected value".to_string(),
    });
    assert_eq!(state_error.error_code(), "STATE");
}

#[test]
fn test_fatal_errors() {
    // Feed trouble is retried on the next run.
    let fetch_error = CoreError::Fetch(FetchError::Status {
        url: "https://forum.example/index.rss".to_string(),
        status_code: 503,
    });
    assert!(!fetch_error.is_fatal());

    let parse_error = CoreError::Parse(ParseError::NotAFeed {
        reason: "no <pre> element".to_string(),
    });
    assert!(!parse_error.is_fatal());

    let notify_error = CoreError::Notify(NotifyError::Rejected {
        status_code: 500,
        body: String::new(),
    });
    assert!(!notify_error.is_fatal());

    // Broken settings or state cannot recover by waiting.
    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "WAIT_TIME".to_string(),
        value: "soon".to_string(),
    });
    assert!(config_error.is_fatal());

    let state_error = CoreError::State(StateError::Corrupt {
        path: "state.json".to_string(),
        details: "expected value".to_string(),
    });
    assert!(state_error.is_fatal());
}

#[test]
fn test_specific_error_codes() {
    let blocked = FetchError::Blocked {
        url: "https://forum.example/index.rss".to_string(),
        reason: "403 Forbidden".to_string(),
    };
    assert_eq!(blocked.error_code(), "FETCH_BLOCKED");
    let browser = FetchError::BrowserFailed {
        reason: "exit status: 1".to_string(),
    };
    assert_eq!(browser.error_code(), "FETCH_BROWSER_FAILED");

    let xml = ParseError::Xml {
        line: 3,
        column: 14,
        message: "unexpected end".to_string(),
        excerpt: None,
    };
    assert_eq!(xml.error_code(), "PARSE_XML");
}

#[test]
fn test_user_friendly_messages() {
    let fetch_error = CoreError::Fetch(FetchError::Status {
        url: "https://forum.example/index.rss".to_string(),
        status_code: 503,
    });
    let message = fetch_error.user_friendly_message();
    assert!(message.contains("503"));

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "pushover.user".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(!message.is_empty());
    assert!(message.contains("pushover.user"));

    let parse_error = CoreError::Parse(ParseError::NotAFeed {
        reason: "no <pre> element".to_string(),
    });
    assert!(parse_error
        .user_friendly_message()
        .contains("not formatted as expected"));
}

#[test]
fn test_error_display_includes_context() {
    let error = CoreError::Parse(ParseError::Xml {
        line: 12,
        column: 5,
        message: "mismatched closing tag".to_string(),
        excerpt: Some("<title>Seiko</titel>".to_string()),
    });
    let text = error.to_string();
    assert!(text.contains("line 12"));
    assert!(text.contains("column 5"));

    // Logging must not panic, with or without an excerpt.
    error.log_error();
    CoreError::Parse(ParseError::MissingChannel).log_warn();
}
