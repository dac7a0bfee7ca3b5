#[cfg(test)]
mod tests {
    use crate::{
        parse_document, BrowserFetcher, DocumentOrigin, FallbackFetcher, FeedDocument,
        FeedFetcher, HttpFetcher,
    };
    use async_trait::async_trait;
    use postwatch_core::{BrowserConfig, FetchError, HttpConfig};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use url::Url;

    const FEED: &str = "<rss><channel><item><title>Seiko Uhr</title>\
        <link>https://forum.example/threads/seiko.2/</link><guid>2</guid>\
        <pubDate>Tue, 14 Oct 2025 18:30:00 GMT</pubDate></item></channel></rss>";

    /// Serves one canned HTTP response and hands back the raw request.
    async fn serve_once(status: &str, body: &str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        let url = Url::parse(&format!("http://{}/forums/-/index.rss", addr)).unwrap();
        (url, handle)
    }

    fn http_config() -> HttpConfig {
        HttpConfig {
            timeout_seconds: 5,
            ..HttpConfig::default()
        }
    }

    struct StubFetcher {
        result: fn() -> Result<FeedDocument, FetchError>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FeedFetcher for StubFetcher {
        async fn fetch(&self) -> Result<FeedDocument, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn stub(
        result: fn() -> Result<FeedDocument, FetchError>,
    ) -> (Box<dyn FeedFetcher>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = StubFetcher {
            result,
            calls: calls.clone(),
        };
        (Box::new(fetcher), calls)
    }

    fn unavailable() -> Result<FeedDocument, FetchError> {
        Err(FetchError::Status {
            url: "http://forum.example/index.rss".to_string(),
            status_code: 503,
        })
    }

    fn rendered() -> Result<FeedDocument, FetchError> {
        Ok(FeedDocument {
            body: "<html><body><pre>&lt;rss&gt;&lt;channel&gt;&lt;/channel&gt;&lt;/rss&gt;</pre></body></html>"
                .to_string(),
            origin: DocumentOrigin::Browser,
        })
    }

    #[tokio::test]
    async fn test_http_fetch_sends_browser_headers() {
        let (url, server) = serve_once("200 OK", FEED).await;
        let fetcher = HttpFetcher::new(url, &http_config()).unwrap();

        let document = fetcher.fetch().await.unwrap();
        assert_eq!(document.origin, DocumentOrigin::Http);
        assert_eq!(parse_document(&document).unwrap()[0].id, "2");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /forums/-/index.rss"));
        assert!(request.contains("referer: https://uhrforum.de/"));
        assert!(request.contains("sec-ch-ua-platform: macos"));
        assert!(request.contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_http_fetch_service_unavailable() {
        let (url, _server) = serve_once("503 Service Unavailable", "down").await;
        let fetcher = HttpFetcher::new(url, &http_config()).unwrap();

        let result = fetcher.fetch().await;
        assert!(matches!(
            result,
            Err(FetchError::Status {
                status_code: 503,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_http_fetch_detects_block_page() {
        let (url, _server) = serve_once("200 OK", "<h1>403 Forbidden</h1>").await;
        let fetcher = HttpFetcher::new(url, &http_config()).unwrap();

        assert!(matches!(
            fetcher.fetch().await,
            Err(FetchError::Blocked { .. })
        ));
    }

    #[tokio::test]
    async fn test_challenge_page_triggers_fallback() {
        let challenge = "<html><head><title>Just a moment...</title></head>\
            <body><noscript>Enable JavaScript to continue</noscript></body></html>";
        let (url, _server) = serve_once("200 OK", challenge).await;
        let http = HttpFetcher::new(url, &http_config()).unwrap();

        let (fallback, fallback_calls) = stub(rendered);
        let fetcher = FallbackFetcher::new(Box::new(http), Some(fallback));

        let document = fetcher.fetch().await.unwrap();
        assert_eq!(document.origin, DocumentOrigin::Browser);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_fetch_rejects_html_page() {
        let (url, _server) = serve_once("200 OK", "<html><body>Wartung</body></html>").await;
        let fetcher = HttpFetcher::new(url, &http_config()).unwrap();

        assert!(matches!(
            fetcher.fetch().await,
            Err(FetchError::Blocked { ref reason, .. }) if reason.contains("not an RSS document")
        ));
    }

    #[tokio::test]
    async fn test_http_fetch_empty_document() {
        let (url, _server) = serve_once("200 OK", "  ").await;
        let fetcher = HttpFetcher::new(url, &http_config()).unwrap();

        assert!(matches!(
            fetcher.fetch().await,
            Err(FetchError::EmptyDocument { .. })
        ));
    }

    #[tokio::test]
    async fn test_http_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{}/index.rss", addr)).unwrap();
        let fetcher = HttpFetcher::new(url, &http_config()).unwrap();
        assert!(matches!(
            fetcher.fetch().await,
            Err(FetchError::Network { .. })
        ));
    }

    #[test]
    fn test_fallback_not_used_when_primary_succeeds() {
        let (primary, primary_calls) = stub(rendered);
        let (fallback, fallback_calls) = stub(unavailable);
        let fetcher = FallbackFetcher::new(primary, Some(fallback));

        let document = tokio_test::block_on(fetcher.fetch()).unwrap();
        assert_eq!(document.origin, DocumentOrigin::Browser);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fallback_used_when_primary_fails() {
        let (primary, primary_calls) = stub(unavailable);
        let (fallback, fallback_calls) = stub(rendered);
        let fetcher = FallbackFetcher::new(primary, Some(fallback));
        assert!(fetcher.has_fallback());

        let document = tokio_test::block_on(fetcher.fetch()).unwrap();
        assert!(parse_document(&document).unwrap().is_empty());
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_without_fallback_primary_error_is_returned() {
        let (primary, _) = stub(unavailable);
        let fetcher = FallbackFetcher::new(primary, None);
        assert!(!fetcher.has_fallback());

        let result = tokio_test::block_on(fetcher.fetch());
        assert!(matches!(
            result,
            Err(FetchError::Status {
                status_code: 503,
                ..
            })
        ));
    }

    #[test]
    fn test_browser_detection() {
        let url = Url::parse("https://forum.example/index.rss").unwrap();

        let disabled = BrowserConfig {
            enabled: false,
            ..BrowserConfig::default()
        };
        assert!(BrowserFetcher::detect(url.clone(), &disabled, "agent").is_none());

        let missing = BrowserConfig {
            binary: Some(PathBuf::from("/nonexistent/chromium")),
            ..BrowserConfig::default()
        };
        assert!(BrowserFetcher::detect(url.clone(), &missing, "agent").is_none());

        let current_exe = std::env::current_exe().unwrap();
        let present = BrowserConfig {
            binary: Some(current_exe.clone()),
            ..BrowserConfig::default()
        };
        let fetcher = BrowserFetcher::detect(url, &present, "agent").unwrap();
        assert_eq!(fetcher.binary(), current_exe.as_path());
    }

    #[test]
    fn test_browser_arguments() {
        let fetcher = BrowserFetcher::new(
            PathBuf::from("chromium"),
            Url::parse("https://forum.example/index.rss").unwrap(),
            "TestAgent/1.0",
            Duration::from_secs(5),
        );
        let args = fetcher.args();
        assert_eq!(args[0], "--headless=new");
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--user-agent=TestAgent/1.0".to_string()));
        assert_eq!(
            &args[args.len() - 2..],
            &["--dump-dom".to_string(), "https://forum.example/index.rss".to_string()]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_browser_process_output_is_captured() {
        let echo = PathBuf::from("/bin/echo");
        if !echo.is_file() {
            return;
        }

        let fetcher = BrowserFetcher::new(
            echo,
            Url::parse("https://forum.example/index.rss").unwrap(),
            "TestAgent/1.0",
            Duration::from_secs(5),
        );
        let document = fetcher.fetch().await.unwrap();
        assert_eq!(document.origin, DocumentOrigin::Browser);
        assert!(document.body.contains("--dump-dom https://forum.example/index.rss"));

        // echo renders no <pre> block, so the page is not a feed.
        assert!(parse_document(&document).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_browser_process_failure() {
        let failing = PathBuf::from("/bin/false");
        if !failing.is_file() {
            return;
        }

        let fetcher = BrowserFetcher::new(
            failing,
            Url::parse("https://forum.example/index.rss").unwrap(),
            "TestAgent/1.0",
            Duration::from_secs(5),
        );
        assert!(matches!(
            fetcher.fetch().await,
            Err(FetchError::BrowserFailed { .. })
        ));
    }
}
