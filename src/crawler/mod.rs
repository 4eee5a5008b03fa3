//! Crawler module for catalog-driven page harvesting
//!
//! This module contains the core crawling logic, including:
//! - Reading the seed catalog
//! - HTTP fetching with proxy rotation and retry logic
//! - Bounded concurrent dispatch with periodic drains
//! - The per-item fetch, extract, persist and archive pipeline
//! - Overall crawl coordination

mod catalog;
mod coordinator;
mod fetcher;
mod pipeline;
mod scheduler;

pub use catalog::{CatalogError, CatalogReader, CatalogRow};
pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, load_proxies, FetchError, Fetcher, HttpFetcher};
pub use pipeline::{ItemOutcome, ItemReport, Pipeline, WorkItem};
pub use scheduler::{Dispatcher, Finished};
