//! Cache store traits and error types
//!
//! This module defines the trait interface for cache backends and
//! associated error types.

use crate::identifier::ShardAddress;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to write cache archive {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read cache archive {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Archive format error in {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("Archive {path} has no member named '{member}'")]
    MissingMember { path: PathBuf, member: String },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for cache backend implementations
///
/// The existence of an entry is the only resume signal the crawler uses;
/// entries are written once and never updated.
pub trait CacheStore: Send + Sync {
    /// Returns true if an entry exists at `address`
    fn exists(&self, address: &ShardAddress) -> bool;

    /// Writes `payload` as the single member of the entry at `address`
    ///
    /// Creates the shard directory if needed. A failed write must not leave a
    /// file at the final path.
    fn write(&self, address: &ShardAddress, payload: &[u8]) -> CacheResult<()>;

    /// Reads back the payload stored at `address`
    fn read(&self, address: &ShardAddress) -> CacheResult<Vec<u8>>;

    /// Returns the path of the entry at `address`
    fn entry_path(&self, address: &ShardAddress) -> PathBuf;
}
