//! Recent documents
//!
//! Append-only JSON-lines record of documents opened with `persistent` set.
//! Each line is one `RecentDocument`; reading collapses repeated opens of
//! the same `(filename, uri)` into the latest one.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recent-documents errors (never fatal for a request)
#[derive(Debug, Error)]
pub enum RecentError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One opened document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentDocument {
    pub filename: String,
    pub uri: String,
    pub opened_at: DateTime<Utc>,
}

/// Recent-documents store backed by a JSON-lines file
pub struct RecentDocuments {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RecentDocuments {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry stamped with the current time
    pub fn record(&self, filename: &str, uri: &str) -> Result<(), RecentError> {
        self.record_at(filename, uri, Utc::now())
    }

    fn record_at(&self, filename: &str, uri: &str, opened_at: DateTime<Utc>) -> Result<(), RecentError> {
        let entry = RecentDocument {
            filename: filename.to_string(),
            uri: uri.to_string(),
            opened_at,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        tracing::debug!(filename = %filename, uri = %uri, "Recorded recent document");
        Ok(())
    }

    /// Latest entry per `(filename, uri)`, newest first
    ///
    /// A missing file is an empty list. Malformed lines are skipped.
    pub fn list(&self) -> Result<Vec<RecentDocument>, RecentError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut latest: HashMap<(String, String), RecentDocument> = HashMap::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: RecentDocument = match serde_json::from_str(&line) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(line = number + 1, "Skipping malformed recent entry: {}", e);
                    continue;
                }
            };

            let key = (entry.filename.clone(), entry.uri.clone());
            match latest.get(&key) {
                Some(existing) if existing.opened_at >= entry.opened_at => {}
                _ => {
                    latest.insert(key, entry);
                }
            }
        }

        let mut entries: Vec<RecentDocument> = latest.into_values().collect();
        entries.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        Ok(entries)
    }

    /// Forget every entry
    pub fn clear(&self) -> Result<(), RecentError> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let recent = RecentDocuments::new(dir.path().join("recent.jsonl"));

        assert!(recent.list().unwrap().is_empty());
    }

    #[test]
    fn test_latest_entry_per_key_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let recent = RecentDocuments::new(dir.path().join("nested/recent.jsonl"));
        let start = Utc::now();

        recent.record_at("a.odt", "file:///a.odt", start).unwrap();
        recent
            .record_at("b.pdf", "file:///b.pdf", start + Duration::seconds(1))
            .unwrap();
        recent
            .record_at("a.odt", "file:///a.odt", start + Duration::seconds(2))
            .unwrap();

        let entries = recent.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].filename, "a.odt");
        assert_eq!(entries[0].opened_at, start + Duration::seconds(2));
        assert_eq!(entries[1].filename, "b.pdf");
    }

    #[test]
    fn test_same_name_different_uri_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let recent = RecentDocuments::new(dir.path().join("recent.jsonl"));

        recent.record("report.pdf", "file:///one/report.pdf").unwrap();
        recent.record("report.pdf", "file:///two/report.pdf").unwrap();

        assert_eq!(recent.list().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent.jsonl");
        let recent = RecentDocuments::new(&path);

        recent.record("a.odt", "file:///a.odt").unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        let entries = recent.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uri, "file:///a.odt");
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let recent = RecentDocuments::new(dir.path().join("recent.jsonl"));

        recent.record("a.odt", "file:///a.odt").unwrap();
        recent.clear().unwrap();
        recent.clear().unwrap();

        assert!(recent.list().unwrap().is_empty());
    }
}
