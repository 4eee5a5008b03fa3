use crate::identifier::Identifier;
use crate::IdentifierResult;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Number of identifiers that share one shard directory
pub const DEFAULT_SHARD_SIZE: u64 = 5000;

/// How a file name is formed inside a shard directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileNaming {
    /// `<dir>/ <identifier>.<ext>`, the layout of existing cache corpora
    #[default]
    Legacy,

    /// `<dir>/<identifier>.<ext>`
    Clean,
}

/// Bucketed on-disk location of one identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardAddress {
    /// `<prefix>/<bucket>`
    pub directory: PathBuf,

    /// The identifier text, used as the file stem
    pub stem: String,
}

impl ShardAddress {
    /// Builds the full file path for this address with the given extension
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use title_trawler::{FileNaming, ShardAddress};
    ///
    /// let address = ShardAddress {
    ///     directory: PathBuf::from("imdb_cache/0"),
    ///     stem: "tt0000005".to_string(),
    /// };
    /// assert_eq!(
    ///     address.file_path(FileNaming::Legacy, "zip"),
    ///     PathBuf::from("imdb_cache/0/ tt0000005.zip")
    /// );
    /// assert_eq!(
    ///     address.file_path(FileNaming::Clean, "zip"),
    ///     PathBuf::from("imdb_cache/0/tt0000005.zip")
    /// );
    /// ```
    pub fn file_path(&self, naming: FileNaming, extension: &str) -> PathBuf {
        let file_name = match naming {
            FileNaming::Legacy => format!(" {}.{}", self.stem, extension),
            FileNaming::Clean => format!("{}.{}", self.stem, extension),
        };
        self.directory.join(file_name)
    }
}

/// Maps identifiers onto shard directories under a fixed prefix
///
/// `bucket = number / shard_size`, so every identifier whose number falls in
/// the same bucket shares a directory. The mapping is pure.
#[derive(Debug, Clone)]
pub struct ShardAddressor {
    prefix: PathBuf,
    shard_size: u64,
}

impl ShardAddressor {
    /// Creates an addressor rooted at `prefix`
    ///
    /// A `shard_size` of zero is clamped to one.
    pub fn new(prefix: impl Into<PathBuf>, shard_size: u64) -> Self {
        Self {
            prefix: prefix.into(),
            shard_size: shard_size.max(1),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn shard_size(&self) -> u64 {
        self.shard_size
    }

    /// Computes the address of an already parsed identifier
    pub fn address_of(&self, id: &Identifier) -> ShardAddress {
        let bucket = id.number() / self.shard_size;
        ShardAddress {
            directory: self.prefix.join(bucket.to_string()),
            stem: id.as_str().to_string(),
        }
    }

    /// Parses a key or URL and computes its address
    ///
    /// # Returns
    ///
    /// * `Ok(ShardAddress)` - The shard location
    /// * `Err(IdentifierError::Malformed)` - The input carries no identifier
    pub fn address(&self, raw: &str) -> IdentifierResult<ShardAddress> {
        let id = Identifier::parse(raw)?;
        Ok(self.address_of(&id))
    }
}
