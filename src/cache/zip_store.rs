//! Zip-archive cache implementation
//!
//! Each cached page is stored as a single-member zip archive inside its shard
//! directory. Archives are assembled in a temporary file in the same directory
//! and renamed into place, so a crash never leaves a half-written archive at
//! the final path.

use crate::cache::traits::{CacheError, CacheResult, CacheStore};
use crate::identifier::{FileNaming, ShardAddress};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Member name used for the payload inside every archive
pub const DEFAULT_MEMBER_NAME: &str = "data.txt";

const ARCHIVE_EXTENSION: &str = "zip";

/// Cache backend writing one zip archive per identifier
#[derive(Debug, Clone)]
pub struct ZipCacheStore {
    naming: FileNaming,
    member_name: String,
}

impl ZipCacheStore {
    /// Creates a store using the given file naming and member name
    pub fn new(naming: FileNaming, member_name: impl Into<String>) -> Self {
        Self {
            naming,
            member_name: member_name.into(),
        }
    }

    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    fn write_archive(&self, path: &Path, dir: &Path, payload: &[u8]) -> std::io::Result<()> {
        let mut staging = NamedTempFile::new_in(dir)?;

        {
            let mut writer = ZipWriter::new(staging.as_file_mut());
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            writer
                .start_file(self.member_name.as_str(), options)
                .map_err(zip_to_io)?;
            writer.write_all(payload)?;
            writer.finish().map_err(zip_to_io)?;
        }

        staging.as_file().sync_all()?;
        staging.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Default for ZipCacheStore {
    fn default() -> Self {
        Self::new(FileNaming::default(), DEFAULT_MEMBER_NAME)
    }
}

impl CacheStore for ZipCacheStore {
    fn exists(&self, address: &ShardAddress) -> bool {
        self.entry_path(address).is_file()
    }

    fn write(&self, address: &ShardAddress, payload: &[u8]) -> CacheResult<()> {
        let path = self.entry_path(address);

        fs::create_dir_all(&address.directory).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;

        self.write_archive(&path, &address.directory, payload)
            .map_err(|source| CacheError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("Cached {} bytes at {}", payload.len(), path.display());
        Ok(())
    }

    fn read(&self, address: &ShardAddress) -> CacheResult<Vec<u8>> {
        let path = self.entry_path(address);

        let file = File::open(&path).map_err(|source| CacheError::Read {
            path: path.clone(),
            source,
        })?;

        let mut archive = ZipArchive::new(file).map_err(|e| CacheError::Archive {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let mut member = archive
            .by_name(&self.member_name)
            .map_err(|e| match e {
                ZipError::FileNotFound => CacheError::MissingMember {
                    path: path.clone(),
                    member: self.member_name.clone(),
                },
                other => CacheError::Archive {
                    path: path.clone(),
                    message: other.to_string(),
                },
            })?;

        let mut payload = Vec::with_capacity(member.size() as usize);
        member
            .read_to_end(&mut payload)
            .map_err(|source| CacheError::Read {
                path: path.clone(),
                source,
            })?;

        Ok(payload)
    }

    fn entry_path(&self, address: &ShardAddress) -> PathBuf {
        address.file_path(self.naming, ARCHIVE_EXTENSION)
    }
}

fn zip_to_io(err: ZipError) -> std::io::Error {
    match err {
        ZipError::Io(e) => e,
        other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
    }
}
