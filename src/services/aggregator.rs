use std::collections::HashSet;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::domain::{CycleReport, Link};
use crate::services::notifier::Notifier;
use crate::sources::FeedFetcher;
use crate::storage::SeenRepository;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);

/// Polls the feed list and hands each never-seen link to the notifier.
///
/// The seen store is owned exclusively by the aggregator, and every method
/// that touches it takes `&mut self`, so store writes are serialized and the
/// feed list cannot change in the middle of a cycle.
pub struct Aggregator<F: FeedFetcher, S: SeenRepository> {
    feeds: Vec<String>,
    fetcher: F,
    store: S,
    notifier: Option<Box<dyn Notifier>>,
    interval: Duration,
}

impl<F: FeedFetcher, S: SeenRepository> Aggregator<F, S> {
    pub fn new(feeds: Vec<String>, fetcher: F, store: S) -> Self {
        Self {
            feeds,
            fetcher,
            store,
            notifier: None,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    pub fn feeds_mut(&mut self) -> &mut Vec<String> {
        &mut self.feeds
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register the action for new links, replacing any previous one.
    pub fn on_new_link<N: Notifier + 'static>(&mut self, notifier: N) {
        self.notifier = Some(Box::new(notifier));
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// One pass over every feed, in order.
    ///
    /// A feed that fails to fetch is skipped. A link is recorded only after
    /// the notifier accepted it; if the notifier fails the link stays unseen
    /// and is delivered again next cycle.
    pub fn run_cycle(&mut self) -> CycleReport {
        let Self {
            feeds,
            fetcher,
            store,
            notifier,
            ..
        } = self;

        let mut report = CycleReport::new();
        tracing::info!(feeds = feeds.len(), "cycle start");

        for feed_url in feeds.iter() {
            report.feeds_checked += 1;
            tracing::debug!(feed = %feed_url, "aggregate");

            let links = match fetcher.fetch(feed_url) {
                Ok(links) => links,
                Err(e) => {
                    tracing::warn!(feed = %feed_url, error = %e, "retrieval error");
                    report.feeds_failed += 1;
                    continue;
                }
            };

            for link in links {
                report.links_examined += 1;

                if store.contains(&link) {
                    continue;
                }

                if let Some(notifier) = notifier.as_deref() {
                    if let Err(e) = notifier.notify(&link) {
                        tracing::warn!(link = %link, error = %e, "notify failed, will retry");
                        report.notify_failures += 1;
                        continue;
                    }
                }

                tracing::info!(link = %link, feed = %feed_url, "new link");
                report.new_links += 1;

                if let Err(e) = store.record(&link) {
                    tracing::error!(link = %link, error = %e, "could not record seen link");
                    report.record_failures += 1;
                }
            }
        }

        tracing::info!("cycle done: {}", report.summary());
        report
    }

    /// Fetch every feed and list the links a cycle would deliver, without
    /// notifying or recording anything.
    pub fn dry_run_cycle(&self) -> Vec<Link> {
        let mut unseen: Vec<Link> = Vec::new();
        let mut listed: HashSet<Link> = HashSet::new();

        for feed_url in &self.feeds {
            match self.fetcher.fetch(feed_url) {
                Ok(links) => {
                    for link in links {
                        if !self.store.contains(&link) && listed.insert(link.clone()) {
                            unseen.push(link);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(feed = %feed_url, error = %e, "retrieval error");
                }
            }
        }

        unseen
    }

    /// Cycle forever, sleeping `interval` between passes.
    pub fn run(&mut self) -> ! {
        tracing::info!(
            feeds = self.feeds.len(),
            interval_secs = self.interval.as_secs(),
            "aggregator start"
        );

        loop {
            self.run_cycle();
            thread::sleep(self.interval);
        }
    }

    /// Cycle until `stop` receives a message or its sender is dropped.
    ///
    /// The stop signal is observed during the sleep between cycles, so the
    /// current cycle always completes. Returns the number of cycles run.
    pub fn run_until(&mut self, stop: &Receiver<()>) -> usize {
        tracing::info!(
            feeds = self.feeds.len(),
            interval_secs = self.interval.as_secs(),
            "aggregator start"
        );

        let mut cycles = 0;
        loop {
            self.run_cycle();
            cycles += 1;

            match stop.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::info!(cycles, "aggregator stopped");
        cycles
    }
}
