//! Append-only log of processed identifiers
//!
//! One identifier per line, written after an item's records have been
//! persisted. The log is an audit trail only; resume decisions are made from
//! the cache.

use crate::identifier::Identifier;
use crate::output::traits::{OutputError, OutputResult};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub struct ProcessLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ProcessLog {
    /// Opens (creating if needed) the log in append mode
    pub fn open(path: impl Into<PathBuf>) -> OutputResult<Self> {
        let path = path.into();
        let write_error = |source| OutputError::Write {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(write_error)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one identifier line
    pub fn append(&self, id: &Identifier) -> OutputResult<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| OutputError::Poisoned(self.path.clone()))?;

        writeln!(file, "{}", id).map_err(|source| OutputError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_lines() {
        let dir = TempDir::new().unwrap();
        let log = ProcessLog::open(dir.path().join("var").join("references.txt")).unwrap();

        log.append(&Identifier::parse("tt0000005").unwrap()).unwrap();
        log.append(&Identifier::parse("tt0000100").unwrap()).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "tt0000005\ntt0000100\n");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("references.txt");

        ProcessLog::open(&path)
            .unwrap()
            .append(&Identifier::parse("tt1").unwrap())
            .unwrap();
        ProcessLog::open(&path)
            .unwrap()
            .append(&Identifier::parse("tt2").unwrap())
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "tt1\ntt2\n");
    }
}
