//! Single-slot content cache
//!
//! Keeps one local, readable copy of the document currently being viewed.
//! A new resolution cleans up the previous entry before writing, so storage
//! use is bounded by the largest single document seen.
//!
//! # Thread Safety
//!
//! The slot is guarded by a `parking_lot::Mutex`; resolutions are sequential
//! hand-offs, never concurrent writes.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::document::{ContentResolver, SourceFingerprint, SourceReference};

/// File name of the cache slot inside the cache directory
pub const SLOT_FILE_NAME: &str = "document";

/// Cache errors (fatal for the current request)
#[derive(Debug, Error)]
pub enum CacheError {
    /// The source could not be opened
    #[error("Source not readable: {source_ref}: {error}")]
    SourceUnreadable {
        source_ref: String,
        #[source]
        error: io::Error,
    },

    /// Copying into the slot failed (disk full, permission denied, ...)
    #[error("Failed to materialize {source_ref}: {error}")]
    CopyFailed {
        source_ref: String,
        #[source]
        error: io::Error,
    },

    /// The slot itself was requested but holds nothing
    #[error("Cache slot is empty: {0}")]
    SlotEmpty(String),

    /// Cache directory could not be prepared
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Default)]
struct CacheSlot {
    /// Source materialized into the slot, if any
    source: Option<SourceReference>,
    /// Fingerprint of `source` taken when it was copied
    fingerprint: Option<SourceFingerprint>,
    /// Rendered part indices handed out since the last cleanup
    parts: BTreeSet<usize>,
    stats: CacheStats,
}

/// Single-slot on-disk cache
///
/// Only the slot file and the rendered parts handed out by `output_path`
/// belong to the cache; anything else in the directory is left alone.
pub struct ContentCache {
    dir: PathBuf,
    slot_path: PathBuf,
    locator: SourceReference,
    slot: Mutex<CacheSlot>,
}

impl ContentCache {
    /// Create a cache rooted at `dir`, creating the directory if needed
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let slot_path = dir.join(SLOT_FILE_NAME);
        let locator = SourceReference::from_path(&slot_path);

        Ok(Self {
            dir,
            slot_path,
            locator,
            slot: Mutex::new(CacheSlot::default()),
        })
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the slot file
    pub fn slot_path(&self) -> &Path {
        &self.slot_path
    }

    /// The cache's own locator (the slot as a source reference)
    pub fn locator(&self) -> &SourceReference {
        &self.locator
    }

    /// Location for rendered part `index`
    ///
    /// The part is owned by the cache and removed by the next cleanup.
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.slot.lock().parts.insert(index);
        self.part_path(index)
    }

    fn part_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.html", index))
    }

    /// Whether the slot already holds the current bytes of `next`
    fn holds(&self, slot: &CacheSlot, next: &SourceReference, current: Option<SourceFingerprint>) -> bool {
        slot.source.as_ref() == Some(next)
            && current.is_some()
            && slot.fingerprint == current
            && self.slot_path.is_file()
    }

    /// Materialize `source` into the slot and return the local path
    ///
    /// The slot is reused without copying when `source` is the cache's own
    /// locator, or the source materialized last and its fingerprint has not
    /// changed since.
    pub fn resolve(
        &self,
        source: &SourceReference,
        resolver: &dyn ContentResolver,
    ) -> Result<PathBuf, CacheError> {
        let mut slot = self.slot.lock();

        if source == &self.locator {
            self.cleanup_locked(&mut slot, true);
            if !self.slot_path.is_file() {
                return Err(CacheError::SlotEmpty(self.slot_path.display().to_string()));
            }
            slot.stats.reuses += 1;
            return Ok(self.slot_path.clone());
        }

        let fingerprint = match resolver.fingerprint(source) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::debug!(source = %source, "Fingerprint lookup failed: {}", e);
                None
            }
        };

        if self.holds(&slot, source, fingerprint) {
            self.cleanup_locked(&mut slot, true);
            tracing::debug!(source = %source, "Reusing cached copy");
            slot.stats.reuses += 1;
            return Ok(self.slot_path.clone());
        }

        // Delete before creating it again
        self.cleanup_locked(&mut slot, false);
        remove_if_exists(&self.slot_path)?;

        let mut reader = resolver
            .open(source)
            .map_err(|error| CacheError::SourceUnreadable {
                source_ref: source.to_string(),
                error,
            })?;

        let copied = File::create(&self.slot_path)
            .and_then(|mut file| io::copy(&mut reader, &mut file))
            .map_err(|error| CacheError::CopyFailed {
                source_ref: source.to_string(),
                error,
            });

        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&self.slot_path);
                return Err(e);
            }
        };

        slot.source = Some(source.clone());
        slot.fingerprint = fingerprint;
        slot.stats.copies += 1;

        tracing::debug!(
            source = %source,
            bytes = bytes,
            slot = %self.slot_path.display(),
            "Materialized source into cache"
        );

        Ok(self.slot_path.clone())
    }

    /// Remove the previous entry unless `next` names the same source
    ///
    /// Rendered parts are always removed. `resolve` still re-copies a kept
    /// slot whose source changed in the meantime.
    pub fn cleanup_previous(&self, next: &SourceReference) {
        let mut slot = self.slot.lock();
        let keep_slot = next == &self.locator || slot.source.as_ref() == Some(next);
        self.cleanup_locked(&mut slot, keep_slot);
    }

    fn cleanup_locked(&self, slot: &mut CacheSlot, keep_slot: bool) {
        for index in std::mem::take(&mut slot.parts) {
            let path = self.part_path(index);
            if let Err(e) = remove_if_exists(&path) {
                tracing::warn!(path = %path.display(), "Failed to clean cache entry: {}", e);
            }
        }

        if !keep_slot {
            if let Err(e) = remove_if_exists(&self.slot_path) {
                tracing::warn!(path = %self.slot_path.display(), "Failed to clean cache slot: {}", e);
            }
            slot.source = None;
            slot.fingerprint = None;
        }
        slot.stats.cleanups += 1;
    }

    /// Drop everything the cache owns, including the slot
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut slot = self.slot.lock();
        self.cleanup_locked(&mut slot, true);
        remove_if_exists(&self.slot_path)?;
        slot.source = None;
        slot.fingerprint = None;
        Ok(())
    }

    /// Source currently held in the slot
    pub fn current_source(&self) -> Option<SourceReference> {
        self.slot.lock().source.clone()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.slot.lock().stats.clone()
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of stream copies into the slot
    pub copies: u64,
    /// Number of resolutions served from the existing slot
    pub reuses: u64,
    /// Number of cleanup passes
    pub cleanups: u64,
}
