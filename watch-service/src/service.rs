use crate::pipeline::{RunReport, WatchSettings, Watcher};
use feed_client::build_fetcher;
use postwatch_core::{AppConfig, CoreError, ErrorExt, NotificationPayload, WatchState};
use push_notifier::{Notifier, PushoverNotifier};
use state_store::{FileStateStore, StateStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Owns the persisted state around the pipeline and sends watcher alerts.
pub struct WatchService {
    watcher: Watcher,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn StateStore>,
}

impl WatchService {
    pub fn new(watcher: Watcher, notifier: Arc<dyn Notifier>, store: Arc<dyn StateStore>) -> Self {
        Self {
            watcher,
            notifier,
            store,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let fetcher = build_fetcher(config)?;
        let notifier: Arc<dyn Notifier> = Arc::new(PushoverNotifier::new(
            &config.pushover,
            config.pushover_endpoint()?,
        )?);
        let store = FileStateStore::new(&config.state.path);
        info!("Using state file {}", store.path().display());

        let watcher = Watcher::new(
            Box::new(fetcher),
            notifier.clone(),
            WatchSettings::from_config(config),
        );
        Ok(Self::new(watcher, notifier, Arc::new(store)))
    }

    /// Loads the state, runs the pipeline once and stores the result.
    ///
    /// On a fatal error the stored marker is left as it was. A feed that
    /// cannot be parsed also raises one error alert, which stays latched
    /// until a run succeeds again.
    pub async fn run_once(&self) -> Result<RunReport, CoreError> {
        let state = self.store.load().await?;

        match self.watcher.run_once(state.clone()).await {
            Ok(mut report) => {
                if report.state.alert_active {
                    info!("Feed check recovered, clearing error alert");
                    report.state.alert_active = false;
                }
                self.store.save(&report.state).await?;

                info!(
                    "Run complete: {} fetched, {} new, {} matched, {} notified, {} failed, marker {}",
                    report.fetched,
                    report.new_posts,
                    report.matched,
                    report.notified,
                    report.failed,
                    report
                        .state
                        .marker
                        .as_ref()
                        .map_or_else(|| "-".to_string(), ToString::to_string)
                );
                Ok(report)
            }
            Err(error) => {
                error.log_error();
                if matches!(error, CoreError::Parse(_)) && !state.alert_active {
                    self.raise_alert(&error, state).await;
                }
                Err(error)
            }
        }
    }

    async fn raise_alert(&self, error: &CoreError, state: WatchState) {
        self.send_alert(NotificationPayload::error(&error.to_string()))
            .await;

        let alerted = WatchState {
            alert_active: true,
            ..state
        };
        if let Err(e) = self.store.save(&alerted).await {
            e.log_error();
        }
    }

    async fn send_alert(&self, payload: NotificationPayload) {
        match self.notifier.send(&payload).await {
            Ok(()) => info!("{} notification sent", payload.title),
            Err(e) => {
                e.log_warn();
            }
        }
    }

    /// Repeats [`run_once`](Self::run_once) every `interval` until `shutdown`
    /// resolves. Feed failures are logged and the next run starts on
    /// schedule; a fatal error (settings or state) stops the loop.
    pub async fn run_forever<S>(&self, interval: Duration, shutdown: S) -> Result<(), CoreError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.send_alert(NotificationPayload::startup()).await;
        info!("~ Forum watcher started, checking every {:?} ~", interval);

        loop {
            info!("Checking for new posts...");
            match self.run_once().await {
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Feed check failed, retrying in {:?}: {}", interval, e),
                Ok(_) => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping watcher");
                    return Ok(());
                }
            }
        }
    }
}
