use crate::browser::BrowserFetcher;
use async_trait::async_trait;
use postwatch_core::{AppConfig, CoreError, FetchError, HttpConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

/// Markers of the block pages the forum serves to clients it considers bots.
const BLOCK_PAGE_MARKERS: [&str; 2] = ["403 Forbidden", "not authorized"];

/// Where a document came from, which decides how it has to be unwrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOrigin {
    Http,
    Browser,
}

#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub body: String,
    pub origin: DocumentOrigin,
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self) -> Result<FeedDocument, FetchError>;

    fn name(&self) -> &'static str;
}

/// Rejects empty documents and forum block pages.
pub(crate) fn check_document(url: &Url, body: &str) -> Result<(), FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::EmptyDocument {
            url: url.to_string(),
        });
    }

    if let Some(marker) = BLOCK_PAGE_MARKERS
        .iter()
        .find(|marker| body.contains(*marker))
    {
        return Err(FetchError::Blocked {
            url: url.to_string(),
            reason: format!("response contains \"{}\"", marker),
        });
    }

    Ok(())
}

/// A plain response without RSS markup is a challenge or error page served
/// with a success status.
fn looks_like_feed(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("<rss") || lower.contains("<channel")
}

#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    url: Url,
    timeout_seconds: u64,
}

impl HttpFetcher {
    pub fn new(url: Url, config: &HttpConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        if let Some(referer) = &config.referer {
            insert_header(&mut headers, REFERER, referer);
        }
        if let Some(platform) = &config.platform {
            insert_header(
                &mut headers,
                HeaderName::from_static("sec-ch-ua-platform"),
                platform,
            );
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            url,
            timeout_seconds: config.timeout_seconds,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn map_request_error(&self, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: self.url.to_string(),
                seconds: self.timeout_seconds,
            }
        } else {
            FetchError::Network {
                url: self.url.to_string(),
                source,
            }
        }
    }
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!("Ignoring invalid value for header {}: {:?}", name, value),
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<FeedDocument, FetchError> {
        debug!("Fetching feed from {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.to_string(),
                status_code: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;
        check_document(&self.url, &body)?;
        if !looks_like_feed(&body) {
            return Err(FetchError::Blocked {
                url: self.url.to_string(),
                reason: "response is not an RSS document".to_string(),
            });
        }

        debug!("Fetched {} bytes from {}", body.len(), self.url);
        Ok(FeedDocument {
            body,
            origin: DocumentOrigin::Http,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Tries the primary fetcher and, when it fails, the fallback if one is
/// available. There is no retry beyond that single fallback attempt.
pub struct FallbackFetcher {
    primary: Box<dyn FeedFetcher>,
    fallback: Option<Box<dyn FeedFetcher>>,
}

impl FallbackFetcher {
    pub fn new(primary: Box<dyn FeedFetcher>, fallback: Option<Box<dyn FeedFetcher>>) -> Self {
        Self { primary, fallback }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[async_trait]
impl FeedFetcher for FallbackFetcher {
    async fn fetch(&self) -> Result<FeedDocument, FetchError> {
        let primary_error = match self.primary.fetch().await {
            Ok(document) => return Ok(document),
            Err(e) => e,
        };

        match &self.fallback {
            Some(fallback) => {
                warn!(
                    "{} fetch failed ({}), falling back to {}",
                    self.primary.name(),
                    primary_error,
                    fallback.name()
                );
                fallback.fetch().await
            }
            None => Err(primary_error),
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

/// Builds the plain HTTP fetcher plus, when a headless browser is
/// installed, the browser fallback.
pub fn build_fetcher(config: &AppConfig) -> Result<FallbackFetcher, CoreError> {
    let url = config.feed_url()?;
    let http = HttpFetcher::new(url.clone(), &config.http)?;

    let browser = BrowserFetcher::detect(url, &config.browser, &config.http.user_agent);
    match &browser {
        Some(browser) => info!(
            "Headless browser fallback available: {}",
            browser.binary().display()
        ),
        None => info!("No headless browser fallback available"),
    }

    Ok(FallbackFetcher::new(
        Box::new(http),
        browser.map(|b| Box::new(b) as Box<dyn FeedFetcher>),
    ))
}
