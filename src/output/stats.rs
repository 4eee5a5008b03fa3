//! Crawl run summaries and cache statistics
//!
//! This module tallies per-item outcomes into a run summary and scans the
//! on-disk cache for the `--stats` report.

use crate::crawler::{ItemOutcome, ItemReport};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Counters for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Catalog data rows read
    pub rows_read: u64,

    /// Rows whose key carried no identifier
    pub malformed: u64,

    /// Rows skipped because their cache archive exists
    pub cache_hits: u64,

    /// Fetches submitted
    pub dispatched: u64,

    /// Fetches that returned a body
    pub fetched: u64,

    /// Fetches that failed after the fetcher's own retries
    pub fetch_failures: u64,

    /// Items whose records were written
    pub persisted: u64,

    /// Total records written
    pub records_written: u64,

    /// Fetched items that yielded no records
    pub empty: u64,

    /// Cache archives that could not be written
    pub cache_write_failures: u64,

    /// The run stopped on a cancellation signal
    pub interrupted: bool,
}

impl CrawlSummary {
    /// Creates an empty summary stamped with the current time
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            rows_read: 0,
            malformed: 0,
            cache_hits: 0,
            dispatched: 0,
            fetched: 0,
            fetch_failures: 0,
            persisted: 0,
            records_written: 0,
            empty: 0,
            cache_write_failures: 0,
            interrupted: false,
        }
    }

    /// Folds one finished item into the counters
    pub fn record(&mut self, report: &ItemReport) {
        match report.outcome {
            ItemOutcome::Persisted { records } => {
                self.fetched += 1;
                self.persisted += 1;
                self.records_written += records as u64;
            }
            ItemOutcome::Empty => {
                self.fetched += 1;
                self.empty += 1;
            }
            ItemOutcome::FetchFailed => self.fetch_failures += 1,
        }

        if report.cache_write_failed {
            self.cache_write_failures += 1;
        }
    }

    /// Stamps the finish time
    pub fn finish(&mut self, interrupted: bool) {
        self.finished_at = Some(Utc::now());
        self.interrupted = interrupted;
    }

    /// Number of dispatched items that have reported back
    pub fn completed(&self) -> u64 {
        self.fetched + self.fetch_failures
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Percentage of completed fetches that returned a body
    pub fn fetch_success_rate(&self) -> f64 {
        let completed = self.completed();
        if completed == 0 {
            return 0.0;
        }
        (self.fetched as f64 / completed as f64) * 100.0
    }

    /// Writes the summary to the log
    pub fn log(&self) {
        let status = if self.interrupted {
            "interrupted"
        } else {
            "completed"
        };

        tracing::info!(
            "Crawl {} in {}s: {} rows, {} cached, {} malformed, {} dispatched",
            status,
            self.duration_seconds().unwrap_or(0),
            self.rows_read,
            self.cache_hits,
            self.malformed,
            self.dispatched
        );
        tracing::info!(
            "Fetched {} ({:.1}% success), {} failed; persisted {} items ({} records), {} empty",
            self.fetched,
            self.fetch_success_rate(),
            self.fetch_failures,
            self.persisted,
            self.records_written,
            self.empty
        );

        if self.cache_write_failures > 0 {
            tracing::warn!("{} cache archives could not be written", self.cache_write_failures);
        }
    }
}

impl Default for CrawlSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Archive counts found under a cache prefix
#[derive(Debug, Clone)]
pub struct CacheStatistics {
    pub prefix: PathBuf,

    /// Archives per shard bucket
    pub archives_by_shard: BTreeMap<u64, u64>,
}

impl CacheStatistics {
    pub fn shard_count(&self) -> usize {
        self.archives_by_shard.len()
    }

    pub fn archive_count(&self) -> u64 {
        self.archives_by_shard.values().sum()
    }

    /// Lowest and highest identifier numbers the scanned shards can hold
    ///
    /// Saturates at `u64::MAX` for bucket names far outside the identifier space.
    pub fn identifier_range(&self, shard_size: u64) -> Option<(u64, u64)> {
        let shard_size = shard_size.max(1);
        let first = self.archives_by_shard.keys().next()?;
        let last = self.archives_by_shard.keys().next_back()?;

        let low = first.saturating_mul(shard_size);
        let high = last
            .saturating_add(1)
            .saturating_mul(shard_size)
            .saturating_sub(1);
        Some((low, high))
    }

    /// The fullest shard as `(bucket, archives)`
    pub fn largest_shard(&self) -> Option<(u64, u64)> {
        self.archives_by_shard
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(bucket, count)| (*bucket, *count))
    }
}

/// Scans a cache prefix for shard directories and their archives
///
/// Only directories named by a bucket number are counted. A missing prefix
/// yields empty statistics.
pub fn scan_cache(prefix: &Path) -> std::io::Result<CacheStatistics> {
    let mut archives_by_shard = BTreeMap::new();

    if !prefix.is_dir() {
        return Ok(CacheStatistics {
            prefix: prefix.to_path_buf(),
            archives_by_shard,
        });
    }

    for entry in fs::read_dir(prefix)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let Some(bucket) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u64>().ok())
        else {
            continue;
        };

        let mut archives = 0;
        for file in fs::read_dir(entry.path())? {
            let path = file?.path();
            if path.extension().is_some_and(|ext| ext == "zip") {
                archives += 1;
            }
        }
        archives_by_shard.insert(bucket, archives);
    }

    Ok(CacheStatistics {
        prefix: prefix.to_path_buf(),
        archives_by_shard,
    })
}

/// Prints cache statistics to stdout in a formatted manner
pub fn print_cache_statistics(stats: &CacheStatistics, shard_size: u64) {
    println!("=== Cache Statistics ===\n");

    println!("Overview:");
    println!("  Prefix: {}", stats.prefix.display());
    println!("  Shard directories: {}", stats.shard_count());
    println!("  Cached archives: {}", stats.archive_count());
    println!();

    if let Some((bucket, count)) = stats.largest_shard() {
        let fill = (count as f64 / shard_size.max(1) as f64) * 100.0;
        println!(
            "Fullest shard: {} ({} archives, {:.1}% of {} slots)",
            bucket, count, fill, shard_size
        );
    }

    if let Some((low, high)) = stats.identifier_range(shard_size) {
        println!("Identifier range covered: tt{} - tt{}", low, high);
    }
}
