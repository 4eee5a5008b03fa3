//! Cache module for persisting raw fetched pages
//!
//! This module handles the on-disk page cache, including:
//! - Sharded archive placement (one archive per identifier)
//! - Existence checks used as the resume signal
//! - Atomic archive writes
//! - Reading archives back for inspection tooling

mod traits;
mod zip_store;

pub use traits::{CacheError, CacheResult, CacheStore};
pub use zip_store::{ZipCacheStore, DEFAULT_MEMBER_NAME};

use crate::config::CacheConfig;

/// Builds the cache backend described by the configuration
pub fn open_cache(config: &CacheConfig) -> ZipCacheStore {
    ZipCacheStore::new(config.naming, config.member_name.clone())
}
