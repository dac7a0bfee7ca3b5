use crate::fetcher::{check_document, DocumentOrigin, FeedDocument, FeedFetcher};
use async_trait::async_trait;
use postwatch_core::{BrowserConfig, FetchError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// Chromium-family executables looked up on `PATH`, in order.
const BROWSER_CANDIDATES: [&str; 5] = [
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// Fetches the feed through a headless browser, which gets past the
/// forum's bot detection when plain requests are refused.
#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    binary: PathBuf,
    url: Url,
    user_agent: String,
    timeout: Duration,
}

impl BrowserFetcher {
    pub fn new(binary: PathBuf, url: Url, user_agent: &str, timeout: Duration) -> Self {
        Self {
            binary,
            url,
            user_agent: user_agent.to_string(),
            timeout,
        }
    }

    /// Returns a fetcher only if the browser is enabled and installed.
    pub fn detect(url: Url, config: &BrowserConfig, user_agent: &str) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let binary = match &config.binary {
            Some(path) if path.is_file() => Some(path.clone()),
            Some(path) => {
                debug!("Configured browser {} does not exist", path.display());
                None
            }
            None => find_on_path(&BROWSER_CANDIDATES),
        }?;

        Some(Self::new(binary, url, user_agent, config.timeout()))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--window-size=1920,1080".to_string(),
            format!("--user-agent={}", self.user_agent),
            "--dump-dom".to_string(),
            self.url.to_string(),
        ]
    }
}

fn find_on_path(candidates: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        candidates
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

#[async_trait]
impl FeedFetcher for BrowserFetcher {
    async fn fetch(&self) -> Result<FeedDocument, FetchError> {
        debug!(
            "Fetching feed from {} with {}",
            self.url,
            self.binary.display()
        );

        let mut command = Command::new(&self.binary);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| FetchError::Timeout {
                url: self.url.to_string(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| FetchError::BrowserFailed {
                reason: format!("could not start {}: {}", self.binary.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::BrowserFailed {
                reason: format!("{} ({})", output.status, stderr.trim()),
            });
        }

        let body = String::from_utf8_lossy(&output.stdout).into_owned();
        check_document(&self.url, &body)?;

        Ok(FeedDocument {
            body,
            origin: DocumentOrigin::Browser,
        })
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
