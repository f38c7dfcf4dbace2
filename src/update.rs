//! One full update pass over all enabled feeds, plus the periodic scheduler.
//!
//! Feeds are processed strictly one after another, and so are the items in
//! each feed. A failing feed is reported and skipped; it never aborts the
//! pass.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::{FeedConfig, Settings};
use crate::feed::{
    parse_feed, FeedDocument, FeedFetcher, FeedItemProcessor, FetchError, ImageExtractor,
    ParseError,
};
use crate::vault::{self, WriteOutcome};

/// Why a single feed failed for this pass.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Unsupported feed format (root element <{0}>)")]
    Unsupported(String),
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("An update is already running")]
    AlreadyRunning,
    #[error("Cannot create root folder {path}: {source}")]
    RootFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-feed counts for a successful feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub written: usize,
    pub skipped: usize,
    pub deleted: usize,
}

/// Outcome of one feed in a pass.
#[derive(Debug)]
pub struct FeedReport {
    pub name: String,
    pub result: Result<FeedStats, FeedError>,
}

#[derive(Debug, Default)]
pub struct UpdateSummary {
    pub feeds: Vec<FeedReport>,
}

impl UpdateSummary {
    pub fn succeeded(&self) -> usize {
        self.feeds.iter().filter(|f| f.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.feeds.len() - self.succeeded()
    }
}

/// User-facing progress notices: one at start, one per feed, one at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    Started { feeds: usize },
    FeedSucceeded { name: String, stats: FeedStats },
    FeedFailed { name: String, error: String },
    Finished { succeeded: usize, failed: usize },
}

/// Runs update passes against a vault directory.
pub struct Updater {
    settings: Settings,
    vault_root: PathBuf,
    fetcher: FeedFetcher,
    processor: FeedItemProcessor,
    event_tx: Option<mpsc::Sender<UpdateEvent>>,
    // Held for the duration of a pass; a second caller bails instead of waiting
    in_flight: Mutex<()>,
}

impl Updater {
    pub fn new(settings: Settings, vault_root: impl Into<PathBuf>) -> Result<Self, FetchError> {
        let fetcher = FeedFetcher::new(settings.request_timeout(), settings.user_agent.as_deref())?;
        Ok(Self::with_fetcher(settings, vault_root, fetcher))
    }

    pub fn with_fetcher(
        settings: Settings,
        vault_root: impl Into<PathBuf>,
        fetcher: FeedFetcher,
    ) -> Self {
        let processor = FeedItemProcessor::new(ImageExtractor::new(fetcher.clone()));
        Self {
            settings,
            vault_root: vault_root.into(),
            fetcher,
            processor,
            event_tx: None,
            in_flight: Mutex::new(()),
        }
    }

    /// Send [`UpdateEvent`]s to `tx` during each pass.
    pub fn with_events(mut self, tx: mpsc::Sender<UpdateEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Root folder for all feed folders.
    pub fn root_folder(&self) -> PathBuf {
        self.vault_root.join(&self.settings.folder_path)
    }

    /// Executes one pass over every enabled feed.
    ///
    /// Returns [`UpdateError::AlreadyRunning`] immediately if another pass
    /// holds the guard. Feed failures are reported in the summary, not as
    /// errors.
    pub async fn run(&self) -> Result<UpdateSummary, UpdateError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::info!("Update already in progress, skipping");
            return Err(UpdateError::AlreadyRunning);
        };

        let root = self.root_folder();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| UpdateError::RootFolder {
                path: root.clone(),
                source,
            })?;

        let enabled: Vec<&FeedConfig> = self.settings.feeds.iter().filter(|f| f.enabled).collect();
        tracing::info!(feeds = enabled.len(), "Starting update");
        self.emit(UpdateEvent::Started {
            feeds: enabled.len(),
        })
        .await;

        let mut summary = UpdateSummary::default();
        for feed in enabled {
            let result = self.update_feed(feed, &root).await;
            match &result {
                Ok(stats) => {
                    tracing::info!(
                        feed = %feed.name,
                        written = stats.written,
                        skipped = stats.skipped,
                        deleted = stats.deleted,
                        "Feed updated"
                    );
                    self.emit(UpdateEvent::FeedSucceeded {
                        name: feed.name.clone(),
                        stats: *stats,
                    })
                    .await;
                }
                Err(e) => {
                    tracing::warn!(feed = %feed.name, url = %feed.url, error = %e, "Feed update failed");
                    self.emit(UpdateEvent::FeedFailed {
                        name: feed.name.clone(),
                        error: e.to_string(),
                    })
                    .await;
                }
            }
            summary.feeds.push(FeedReport {
                name: feed.name.clone(),
                result,
            });
        }

        tracing::info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Update finished"
        );
        self.emit(UpdateEvent::Finished {
            succeeded: summary.succeeded(),
            failed: summary.failed(),
        })
        .await;

        Ok(summary)
    }

    async fn update_feed(&self, feed: &FeedConfig, root: &Path) -> Result<FeedStats, FeedError> {
        let folder = root.join(feed.folder_name());
        tokio::fs::create_dir_all(&folder).await?;

        let xml = self.fetcher.fetch_text(&feed.url).await?;
        let document = parse_feed(&xml)?;

        let mut stats = FeedStats::default();
        match document {
            FeedDocument::Rss(channel) => {
                for item in &channel.items {
                    let article = self
                        .processor
                        .process_rss_item(item, &channel.creator, feed, &self.settings)
                        .await;
                    record(&mut stats, vault::write_article(&article, &folder, &self.settings).await?);
                }
            }
            FeedDocument::Atom(atom) => {
                for entry in &atom.entries {
                    let article = self
                        .processor
                        .process_atom_item(entry, &atom.title, feed, &self.settings)
                        .await;
                    record(&mut stats, vault::write_article(&article, &folder, &self.settings).await?);
                }
            }
            FeedDocument::Unsupported { root } => return Err(FeedError::Unsupported(root)),
        }

        if self.settings.auto_delete_enabled {
            stats.deleted = vault::sweep(&folder, &self.settings).await.deleted;
        }

        Ok(stats)
    }

    async fn emit(&self, event: UpdateEvent) {
        if let Some(tx) = &self.event_tx {
            if let Err(e) = tx.send(event).await {
                tracing::debug!(error = %e, "Update event receiver dropped");
            }
        }
    }
}

fn record(stats: &mut FeedStats, outcome: WriteOutcome) {
    match outcome {
        WriteOutcome::Written(_) => stats.written += 1,
        WriteOutcome::Skipped(_) => stats.skipped += 1,
    }
}

/// Longest period between scheduled passes (about 136 years).
pub const MAX_PERIOD: Duration = Duration::from_secs(u32::MAX as u64);

/// Periodic trigger for [`Updater::run`].
///
/// Owns at most one background loop; [`start`](Self::start) replaces any
/// running loop, so reconfiguring is just calling it again.
pub struct UpdateScheduler {
    updater: Arc<Updater>,
    handle: Option<JoinHandle<()>>,
}

impl UpdateScheduler {
    pub fn new(updater: Arc<Updater>) -> Self {
        Self {
            updater,
            handle: None,
        }
    }

    /// (Re)starts the loop with a pass every `interval_minutes`. The first
    /// pass runs one full interval after start. `0` just stops.
    pub fn start(&mut self, interval_minutes: u64) {
        self.stop();
        if interval_minutes == 0 {
            tracing::info!("Periodic updates disabled");
            return;
        }
        self.start_with_period(Duration::from_secs(interval_minutes.saturating_mul(60)));
    }

    /// Like [`start`](Self::start) with an arbitrary period.
    ///
    /// Periods beyond [`MAX_PERIOD`] are clamped so the first deadline stays
    /// representable.
    pub fn start_with_period(&mut self, period: Duration) {
        self.stop();
        let period = period.min(MAX_PERIOD);
        let updater = Arc::clone(&self.updater);
        tracing::info!(period_secs = period.as_secs(), "Starting periodic updates");

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match updater.run().await {
                    Ok(_) => {}
                    Err(UpdateError::AlreadyRunning) => {
                        tracing::debug!("Scheduled tick skipped, update in progress");
                    }
                    Err(e) => tracing::warn!(error = %e, "Scheduled update failed"),
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Stopped periodic updates");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
