//! CSV output sink
//!
//! Appends one row per extracted record to a single CSV file. Appends from
//! concurrent workers are serialized through a mutex.

use crate::extract::Extraction;
use crate::identifier::Identifier;
use crate::output::traits::{OutputError, OutputResult, OutputSink};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Sink appending flattened rows to a CSV file
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> OutputError {
        OutputError::Write {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> OutputError {
        OutputError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

impl OutputSink for CsvSink {
    fn persist(&self, id: &Identifier, extraction: &Extraction) -> OutputResult<()> {
        let rows = extraction.csv_rows(id);
        if rows.is_empty() {
            return Ok(());
        }

        let _guard = self
            .lock
            .lock()
            .map_err(|_| OutputError::Poisoned(self.path.clone()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        for row in &rows {
            writer.write_record(row).map_err(|e| self.csv_error(e))?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;

        tracing::debug!(
            "Appended {} rows for {} to {}",
            rows.len(),
            id,
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Movie, Reference, TitleDetails};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn movie(subjects: &[&str]) -> Extraction {
        Extraction::References(Movie {
            link: "https://www.imdb.com/title/tt0000005/movieconnections/".to_string(),
            references: subjects
                .iter()
                .map(|s| Reference {
                    subject: s.to_string(),
                    description: "Followed by".to_string(),
                })
                .collect(),
        })
    }

    #[test]
    fn test_append_rows() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("data").join("references.csv"));
        let id = Identifier::parse("tt0000005").unwrap();

        sink.persist(&id, &movie(&["/title/tt0000777"])).unwrap();
        sink.persist(&id, &movie(&["/title/tt0000888", "/title/tt0000999"]))
            .unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            content,
            "tt0000005,/title/tt0000777,Followed by\n\
             tt0000005,/title/tt0000888,Followed by\n\
             tt0000005,/title/tt0000999,Followed by\n"
        );
    }

    #[test]
    fn test_quotes_fields_with_delimiter() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("details.csv"));
        let id = Identifier::parse("tt0000005").unwrap();
        let details = Extraction::Details(TitleDetails {
            movie_id: "tt0000005".to_string(),
            countries: vec!["France".to_string(), "Italy".to_string()],
            ..TitleDetails::default()
        });

        sink.persist(&id, &details).unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, "tt0000005,,\"France,Italy\",,,,,\n");
    }

    #[test]
    fn test_empty_extraction_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("references.csv"));
        let id = Identifier::parse("tt0000005").unwrap();

        sink.persist(&id, &movie(&[])).unwrap();
        assert!(!sink.path().exists());
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(CsvSink::new(dir.path().join("references.csv")));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    let id = Identifier::parse(&format!("tt{:07}", n)).unwrap();
                    for _ in 0..25 {
                        sink.persist(&id, &movie(&["/title/tt0000777"])).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(sink.path())
            .unwrap();
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 200);
        assert!(rows.iter().all(|r| r.len() == 3));
    }
}
