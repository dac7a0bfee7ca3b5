use crate::detect::{detect_new, next_marker};
use crate::filter::filter_keywords;
use chrono::Utc;
use feed_client::{filter_category, into_chronological, parse_document, FeedFetcher};
use postwatch_core::{
    AppConfig, CategoryFilter, CoreError, ErrorExt, FeedOrder, FirstRunPolicy, KeywordSet,
    NotificationPayload, WatchState,
};
use push_notifier::Notifier;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub keywords: KeywordSet,
    pub order: FeedOrder,
    pub first_run: FirstRunPolicy,
    pub category: Option<CategoryFilter>,
    pub notification_title: String,
}

impl WatchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            keywords: config.keywords(),
            order: config.feed.order,
            first_run: config.feed.first_run,
            category: config.feed.category.clone(),
            notification_title: config.pushover.title.clone(),
        }
    }
}

/// Outcome of one pass over the feed. `state` is what should be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub state: WatchState,
    pub fetched: usize,
    pub new_posts: usize,
    pub matched: usize,
    pub notified: usize,
    pub failed: usize,
}

/// Fetch, parse, detect, filter and notify, in that order.
pub struct Watcher {
    fetcher: Box<dyn FeedFetcher>,
    notifier: Arc<dyn Notifier>,
    settings: WatchSettings,
}

impl Watcher {
    pub fn new(
        fetcher: Box<dyn FeedFetcher>,
        notifier: Arc<dyn Notifier>,
        settings: WatchSettings,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    /// The configured first-run policy applies only before the first
    /// completed run. A later run without a marker has seen an empty feed,
    /// so everything it finds now is new.
    fn detection_policy(&self, state: &WatchState) -> FirstRunPolicy {
        if state.last_run_at.is_none() {
            self.settings.first_run
        } else {
            FirstRunPolicy::NotifyAll
        }
    }

    /// Runs the pipeline against `state` and returns the state to persist.
    ///
    /// Fetch and parse failures abort the run before anything is sent, so the
    /// caller keeps its old marker. Notification failures are logged and
    /// counted; the marker still advances past the affected posts.
    pub async fn run_once(&self, state: WatchState) -> Result<RunReport, CoreError> {
        let document = self.fetcher.fetch().await?;
        let mut posts = parse_document(&document)?;
        let fetched = posts.len();

        if let Some(category) = &self.settings.category {
            posts = filter_category(posts, category);
            debug!(
                "{} of {} posts are in category {}",
                posts.len(),
                fetched,
                category.name
            );
        }
        let posts = into_chronological(posts, self.settings.order);

        let policy = self.detection_policy(&state);
        if state.last_run_at.is_none() {
            info!(
                "First run: {} posts in feed, policy {:?}",
                posts.len(),
                policy
            );
        }
        let new_posts = detect_new(&posts, state.marker.as_ref(), policy);

        let matched = filter_keywords(new_posts.iter().copied(), &self.settings.keywords);
        let mut notified = 0;
        let mut failed = 0;

        for post in &matched {
            let payload = NotificationPayload::for_post(post, &self.settings.notification_title);
            match self.notifier.send(&payload).await {
                Ok(()) => notified += 1,
                Err(e) => {
                    e.log_warn();
                    failed += 1;
                }
            }
        }

        let marker = next_marker(&posts, state.marker.as_ref(), &new_posts);
        Ok(RunReport {
            state: WatchState {
                marker,
                alert_active: state.alert_active,
                last_run_at: Some(Utc::now()),
            },
            fetched,
            new_posts: new_posts.len(),
            matched: matched.len(),
            notified,
            failed,
        })
    }
}
