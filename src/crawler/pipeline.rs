//! Per-item processing pipeline
//!
//! Each dispatched item runs: fetch, extract, persist records, append to the
//! process log, then archive the page. The archive is written last so that
//! its presence on disk implies the item's outputs were persisted.

use crate::cache::CacheStore;
use crate::crawler::fetcher::Fetcher;
use crate::extract::Extractor;
use crate::identifier::{Identifier, ShardAddress};
use crate::output::{OutputResult, OutputSink, ProcessLog};
use std::sync::Arc;

/// A catalog row resolved into something to fetch
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: Identifier,

    /// Cache slot for this identifier
    pub address: ShardAddress,

    /// Target URL
    pub url: String,
}

/// How a dispatched item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Records were written
    Persisted { records: usize },

    /// The page was fetched but yielded no records
    Empty,

    /// The fetch failed after the fetcher's own retries
    FetchFailed,
}

/// Report sent back to the driver for each finished item
#[derive(Debug, Clone)]
pub struct ItemReport {
    pub id: Identifier,
    pub outcome: ItemOutcome,
    pub cache_write_failed: bool,
}

/// Shared collaborators for item processing
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    extractor: Extractor,
    cache: Option<Arc<dyn CacheStore>>,
    sink: Arc<dyn OutputSink>,
    process_log: Option<Arc<ProcessLog>>,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Extractor,
        cache: Option<Arc<dyn CacheStore>>,
        sink: Arc<dyn OutputSink>,
        process_log: Option<Arc<ProcessLog>>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            cache,
            sink,
            process_log,
        }
    }

    /// Fetches and processes one item
    ///
    /// Fetch failures are logged and reported, never returned as errors.
    ///
    /// # Returns
    ///
    /// * `Ok(ItemReport)` - The item finished, successfully or not
    /// * `Err(OutputError)` - Records could not be persisted
    pub async fn run(&self, item: WorkItem) -> OutputResult<ItemReport> {
        tracing::info!("Visiting {}", item.url);

        match self.fetcher.fetch(&item.url).await {
            Ok(body) => self.process_page(&item, &body),
            Err(e) => {
                tracing::warn!(
                    "Request URL: {} failed with response: {}: {}",
                    item.url,
                    e,
                    e.body()
                );
                Ok(ItemReport {
                    id: item.id,
                    outcome: ItemOutcome::FetchFailed,
                    cache_write_failed: false,
                })
            }
        }
    }

    /// Extracts, persists and archives a fetched page
    pub fn process_page(&self, item: &WorkItem, body: &str) -> OutputResult<ItemReport> {
        let outcome = match self.extractor.extract(&item.id, &item.url, body) {
            Some(extraction) if !extraction.is_empty() => {
                self.sink.persist(&item.id, &extraction)?;
                if let Some(log) = &self.process_log {
                    log.append(&item.id)?;
                }
                ItemOutcome::Persisted {
                    records: extraction.record_count(),
                }
            }
            _ => {
                tracing::debug!("No records for {}", item.id);
                ItemOutcome::Empty
            }
        };

        let cache_write_failed = !self.archive(item, body);

        Ok(ItemReport {
            id: item.id.clone(),
            outcome,
            cache_write_failed,
        })
    }

    /// Writes the page to the cache; returns false if that failed
    fn archive(&self, item: &WorkItem, body: &str) -> bool {
        let Some(cache) = &self.cache else {
            return true;
        };

        match cache.write(&item.address, body.as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to cache {}: {}", item.id, e);
                false
            }
        }
    }
}
