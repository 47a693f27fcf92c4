//! Crawl orchestrator: fans the single-URL pipeline out across sources.
//!
//! A batch moves `idle -> running -> idle`. Sources are split into groups of
//! `concurrency`; groups run one after another with a pause in between, and
//! the workers of one group run concurrently on the calling task. Each
//! worker owns exactly one entry of the progress table and publishes a full
//! snapshot of it on every change.
//!
//! One source failing never aborts the batch. [`CrawlOrchestrator::stop`]
//! prevents further groups from starting and makes in-flight workers discard
//! whatever they finish afterwards; no progress events or results are added
//! once it has been called.

use crate::config::CrawlSettings;
use crate::error::CrawlError;
use crate::feed::discover_links;
use crate::models::{Article, CrawlProgress, CrawlStatus, SourceConfig};
use crate::pipeline::ArticlePipeline;
use crate::progress::{ProgressBus, ProgressEvent};
use futures::future::join_all;
use rand::Rng;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

/// Batch lifecycle shared with [`StopHandle`]s: `IDLE -> RUNNING ->
/// (CANCELLED) -> IDLE`. Every transition is a single atomic step, so a stop
/// either lands on the running batch or is a no-op on an idle orchestrator.
#[derive(Debug, Default)]
struct BatchState(AtomicU8);

impl BatchState {
    fn begin(&self) -> bool {
        self.0.compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    fn cancel(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn end(&self) {
        self.0.store(IDLE, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst) != IDLE
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst) == CANCELLED
    }
}

/// Requests cancellation of the batch running on the orchestrator it came
/// from. Cheap to clone and usable from progress handlers. Like
/// [`CrawlOrchestrator::stop`], a no-op when no batch is running.
#[derive(Debug, Clone)]
pub struct StopHandle {
    state: Arc<BatchState>,
}

impl StopHandle {
    pub fn stop(&self) {
        if self.state.cancel() {
            info!("Stop requested");
        }
    }
}

#[derive(Debug)]
pub struct CrawlOrchestrator {
    pipeline: ArticlePipeline,
    settings: CrawlSettings,
    state: Arc<BatchState>,
    progress: Mutex<Vec<CrawlProgress>>,
}

/// Returns the orchestrator to idle however the batch future ends.
struct RunningGuard<'a>(&'a BatchState);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.end();
    }
}

impl CrawlOrchestrator {
    pub fn new(pipeline: ArticlePipeline, settings: CrawlSettings) -> Self {
        Self {
            pipeline,
            settings,
            state: Arc::default(),
            progress: Mutex::new(Vec::new()),
        }
    }

    pub fn bus(&self) -> &ProgressBus {
        self.pipeline.bus()
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Snapshot of every source's progress in the current or last batch.
    pub fn progress(&self) -> Vec<CrawlProgress> {
        self.lock_progress().clone()
    }

    /// Cancel the running batch. A no-op when idle.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Crawl `sources`, fetching at most `cap` articles from each.
    ///
    /// Returns the successfully extracted articles of all sources, most
    /// recent first (stable for equal dates). Failure-flagged records are
    /// counted as processed but never returned. Fails only when a batch is
    /// already running or there is nothing to crawl.
    #[instrument(level = "info", skip(self, sources), fields(sources = sources.len()))]
    pub async fn start_batch(&self, sources: &[SourceConfig], cap: usize) -> Result<Vec<Article>, CrawlError> {
        if !self.state.begin() {
            warn!("Rejected batch: another one is running");
            return Err(CrawlError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.state);
        if sources.is_empty() {
            return Err(CrawlError::NoSources);
        }
        let initial: Vec<CrawlProgress> = sources.iter().map(|s| CrawlProgress::pending(&s.id)).collect();
        *self.lock_progress() = initial.clone();
        self.bus().publish(ProgressEvent::BatchStarted { sources: initial });
        info!(concurrency = self.settings.concurrency, cap, "Batch started");

        let indexed: Vec<(usize, &SourceConfig)> = sources.iter().enumerate().collect();
        let mut articles: Vec<Article> = Vec::new();
        for (group_no, group) in indexed.chunks(self.settings.concurrency.max(1)).enumerate() {
            if group_no > 0 && !self.settings.inter_group_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_group_delay).await;
            }
            if self.is_cancelled() {
                break;
            }
            let workers = group.iter().map(|(slot, source)| self.crawl_source(*slot, source, cap));
            for found in join_all(workers).await {
                articles.extend(found);
            }
        }

        // Stable: equal dates keep source order, then discovery order.
        articles.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));

        if self.is_cancelled() {
            self.settle_cancelled();
            info!(kept = articles.len(), "Batch cancelled");
            self.bus().publish(ProgressEvent::BatchCancelled);
        } else {
            info!(articles = articles.len(), "Batch completed");
            self.bus().publish(ProgressEvent::BatchCompleted {
                articles: articles.len(),
            });
        }
        Ok(articles)
    }

    /// One worker: discover links for `source`, then fetch and extract them
    /// in discovery order.
    #[instrument(level = "info", skip(self, source), fields(source = %source.id))]
    async fn crawl_source(&self, slot: usize, source: &SourceConfig, cap: usize) -> Vec<Article> {
        let mut kept = Vec::new();
        if !self.update(slot, |p| {
            p.status = CrawlStatus::Crawling;
            p.progress = 0;
        }) {
            return kept;
        }

        let links = match discover_links(self.pipeline.plan(), source, cap).await {
            Ok(links) => links,
            Err(e) => {
                error!(error = %e, "Link discovery failed");
                self.update(slot, |p| {
                    p.status = CrawlStatus::Error;
                    p.progress = 100;
                    p.error = Some(format!("link discovery failed: {e}"));
                });
                return kept;
            }
        };
        let total = links.len();
        if !self.update(slot, |p| {
            p.articles_found = total;
            p.progress = 10;
        }) {
            return kept;
        }

        let mut last_failure: Option<String> = None;
        for (i, link) in links.iter().enumerate() {
            if i > 0 {
                self.pause_between_requests().await;
            }
            if self.is_cancelled() {
                return kept;
            }
            let article = self.pipeline.fetch_and_extract(link, source).await;
            if self.is_cancelled() {
                // Finished after stop was requested: discard.
                return kept;
            }
            match &article.failure {
                Some(reason) => {
                    warn!(url = %link, %reason, "Skipping failed extraction");
                    last_failure = Some(reason.to_string());
                }
                None => kept.push(article),
            }
            let processed = i + 1;
            self.update(slot, |p| {
                p.articles_processed = processed;
                p.progress = (10 + 90 * processed / total) as u8;
            });
        }

        let failed_all = total > 0 && kept.is_empty();
        self.update(slot, |p| {
            p.progress = 100;
            match (&last_failure, failed_all) {
                (Some(reason), true) => {
                    p.status = CrawlStatus::Error;
                    p.error = Some(format!("all {total} articles failed; last: {reason}"));
                }
                _ => p.status = CrawlStatus::Completed,
            }
        });
        info!(found = total, kept = kept.len(), "Source finished");
        kept
    }

    async fn pause_between_requests(&self) {
        let jitter_ms = self.settings.request_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        let delay = self.settings.inter_request_delay + jitter;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Mutate this worker's entry and publish the new snapshot. Returns
    /// `false`, changing nothing, once the batch is cancelled.
    fn update(&self, slot: usize, change: impl FnOnce(&mut CrawlProgress)) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let snapshot = {
            let mut table = self.lock_progress();
            let Some(entry) = table.get_mut(slot) else {
                return false;
            };
            change(entry);
            entry.clone()
        };
        self.bus().publish(ProgressEvent::Source(snapshot));
        true
    }

    /// Entries a cancelled batch never finished end in `error`, silently.
    fn settle_cancelled(&self) {
        for entry in self.lock_progress().iter_mut() {
            if !entry.status.is_terminal() {
                entry.status = CrawlStatus::Error;
                entry.error = Some("cancelled".into());
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    fn lock_progress(&self) -> MutexGuard<'_, Vec<CrawlProgress>> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
