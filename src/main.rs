use anyhow::Context;
use postwatch_core::{AppConfig, ErrorExt};
use tracing_subscriber::EnvFilter;
use watch_service::WatchService;

const DEFAULT_LOG_FILTER: &str =
    "postwatch=info,watch_service=info,feed_client=info,push_notifier=info,state_store=info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting Postwatch - forum post watcher");

    let config = AppConfig::load()
        .inspect_err(report_failure)
        .context("Failed to load configuration")?;
    let service = WatchService::from_config(&config)
        .inspect_err(report_failure)
        .context("Failed to set up watcher")?;

    let result = match config.watch_interval() {
        Some(interval) => {
            service
                .run_forever(interval, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await
        }
        None => service.run_once().await.map(|report| {
            tracing::info!(
                "Done: {} new posts, {} notifications sent",
                report.new_posts,
                report.notified
            );
        }),
    };

    if let Err(e) = &result {
        report_failure(e);
    }
    result.context("Feed watcher stopped")
}

fn report_failure<E: ErrorExt>(error: &E) {
    tracing::error!("[{}] {}", error.error_code(), error.user_friendly_message());
}
