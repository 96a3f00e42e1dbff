//! Novelty detection for a single feed.
//!
//! One [`Monitor::poll`] is one attempt: fetch, parse, diff against the stored
//! snapshot, replace the snapshot. Failures before the diff leave the
//! snapshot untouched and produce an empty result; nothing here retries.

use std::collections::HashSet;
use std::sync::Arc;

use crate::app::FeedwatchError;
use crate::domain::{FeedItem, NewItem};
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::Store;

/// What a poll produced.
#[derive(Debug, Default)]
pub struct PollReport {
    /// New entries in feed order
    pub new_items: Vec<NewItem>,
    /// Number of entries in the fetched feed
    pub fetched: usize,
    /// Fetch or parse failure that ended the poll early
    pub error: Option<FeedwatchError>,
    /// Whether the snapshot was replaced
    pub persisted: bool,
    /// Snapshot write failure; the new entries above are still valid
    pub persist_error: Option<FeedwatchError>,
}

impl PollReport {
    fn failed(error: FeedwatchError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

pub struct Monitor {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    store: Arc<dyn Store + Send + Sync>,
    normalizer: Normalizer,
}

impl Monitor {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        store: Arc<dyn Store + Send + Sync>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            fetcher,
            store,
            normalizer,
        }
    }

    /// Poll `url` once and report the entries not seen in the previous snapshot.
    pub async fn poll(&self, url: &str, cookie: Option<&str>) -> PollReport {
        tracing::info!("Fetching feed from {}", url);

        let body = match self.fetcher.fetch(url, cookie).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to fetch {}: {}", url, e);
                return PollReport::failed(e);
            }
        };

        let current = match self.normalizer.normalize(&body) {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("Failed to parse {}: {}", url, e);
                return PollReport::failed(e);
            }
        };

        if current.is_empty() {
            tracing::info!("Feed {} has no usable entries, keeping stored snapshot", url);
            return PollReport::default();
        }

        tracing::info!("Fetched {} entries, loading stored snapshot", current.len());
        let previous = match self.store.load_guids() {
            Ok(guids) => guids,
            Err(e) => {
                tracing::warn!("{}; treating stored snapshot as empty", e);
                HashSet::new()
            }
        };
        tracing::debug!("Loaded {} stored guids", previous.len());

        let new_items = diff_items(&current, &previous);
        if new_items.is_empty() {
            tracing::info!("No new entries");
        } else {
            tracing::info!("Found {} new entries", new_items.len());
        }

        let persist_error = match self.store.save_items(&current) {
            Ok(()) => None,
            Err(e) => {
                tracing::error!("{}", e);
                Some(e)
            }
        };

        PollReport {
            new_items,
            fetched: current.len(),
            error: None,
            persisted: persist_error.is_none(),
            persist_error,
        }
    }

    /// Same as [`Monitor::poll`], keeping only the new entries.
    pub async fn get_new_items(&self, url: &str, cookie: Option<&str>) -> Vec<NewItem> {
        self.poll(url, cookie).await.new_items
    }
}

/// Entries of `current` whose guid is not in `previous`, in feed order.
pub fn diff_items(current: &[FeedItem], previous: &HashSet<String>) -> Vec<NewItem> {
    current
        .iter()
        .filter(|item| !item.guid.is_empty() && !previous.contains(&item.guid))
        .map(NewItem::from)
        .collect()
}
