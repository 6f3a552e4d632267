//! Layered type sniffer
//!
//! Runs the detection layers in a fixed order and stops at the first one
//! that answers. Layer failures are logged and treated as "no answer"; the
//! sniffer itself never fails.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::mime_table;
use super::signature::{SignatureDatabase, SignatureHit};
use super::stream::guess_from_stream;
use crate::document::{ContentResolver, SourceReference};

/// Detection layer that produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffLayer {
    /// Magic-number signature database
    Signature,
    /// Type declared by the platform content resolver
    ContentResolver,
    /// Guess from the file name
    FileName,
    /// Guess from the first bytes of the stream
    Stream,
    /// Static extension table
    ExtensionTable,
}

/// Resolved MIME type and the layer that found it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub mime: String,
    pub layer: SniffLayer,
}

impl Detection {
    fn new(mime: impl Into<String>, layer: SniffLayer) -> Self {
        Self {
            mime: mime.into(),
            layer,
        }
    }
}

/// Everything the layers may look at
#[derive(Debug, Clone, Copy)]
pub struct SniffRequest<'a> {
    /// Materialized local copy
    pub path: &'a Path,
    /// Original reference, for the content resolver
    pub source: &'a SourceReference,
    pub filename: Option<&'a str>,
    pub extension: Option<&'a str>,
}

enum DatabaseState {
    Unloaded,
    Loaded(Arc<SignatureDatabase>),
    /// Load failed; the layer stays skipped until `release`
    Failed,
}

/// MIME type detector
pub struct TypeSniffer {
    db_path: Option<PathBuf>,
    database: Mutex<DatabaseState>,
    resolver: Arc<dyn ContentResolver>,
}

impl TypeSniffer {
    /// Create a sniffer using the builtin signature database
    pub fn new(resolver: Arc<dyn ContentResolver>) -> Self {
        Self {
            db_path: None,
            database: Mutex::new(DatabaseState::Unloaded),
            resolver,
        }
    }

    /// Use an external signature database instead of the builtin one
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Signature database, loading it on first use
    fn database(&self) -> Option<Arc<SignatureDatabase>> {
        let mut state = self.database.lock();
        match &*state {
            DatabaseState::Loaded(db) => return Some(Arc::clone(db)),
            DatabaseState::Failed => return None,
            DatabaseState::Unloaded => {}
        }

        match SignatureDatabase::load(self.db_path.as_deref()) {
            Ok(db) => {
                tracing::debug!(entries = db.len(), "Loaded signature database");
                let db = Arc::new(db);
                *state = DatabaseState::Loaded(Arc::clone(&db));
                Some(db)
            }
            Err(e) => {
                tracing::warn!(path = ?self.db_path, "Failed to load signature database: {}", e);
                *state = DatabaseState::Failed;
                None
            }
        }
    }

    /// Whether the signature database is currently held in memory
    pub fn is_loaded(&self) -> bool {
        matches!(&*self.database.lock(), DatabaseState::Loaded(_))
    }

    /// Drop the signature database; the next detection reloads it
    pub fn release(&self) {
        *self.database.lock() = DatabaseState::Unloaded;
    }

    /// Detect the MIME type of a materialized document
    ///
    /// Returns `None` when every layer came up empty. Blocking.
    ///
    /// A magic-number hit ends detection. The database's plain-text
    /// fallback is only provisional: a textual type from the content
    /// resolver or the file name (JSON, CSV, SVG, ...) takes its place.
    pub fn detect(&self, request: &SniffRequest<'_>) -> Option<Detection> {
        let detection = match self.from_signature(request) {
            Some(SignatureHit::Magic(mime)) => Some(Detection::new(mime, SniffLayer::Signature)),
            Some(SignatureHit::Text(mime)) => self
                .from_content_resolver(request)
                .filter(|found| is_textual(&found.mime))
                .or_else(|| from_filename(request).filter(|found| is_textual(&found.mime)))
                .or_else(|| Some(Detection::new(mime, SniffLayer::Signature))),
            None => self
                .from_content_resolver(request)
                .or_else(|| from_filename(request))
                .or_else(|| from_stream(request))
                .or_else(|| from_extension_table(request)),
        };

        match &detection {
            Some(found) => {
                tracing::debug!(mime = %found.mime, layer = ?found.layer, "Detected type");
            }
            None => {
                tracing::debug!(path = %request.path.display(), "No layer recognized the type");
            }
        }
        detection
    }

    fn from_signature(&self, request: &SniffRequest<'_>) -> Option<SignatureHit> {
        let db = self.database()?;
        match db.lookup(request.path) {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(path = %request.path.display(), "Signature lookup failed: {}", e);
                None
            }
        }
    }

    fn from_content_resolver(&self, request: &SniffRequest<'_>) -> Option<Detection> {
        match self.resolver.declared_type(request.source) {
            Ok(declared) => declared
                .filter(|mime| !mime.trim().is_empty())
                .map(|mime| Detection::new(mime, SniffLayer::ContentResolver)),
            Err(e) => {
                tracing::warn!(source = %request.source, "Content resolver type lookup failed: {}", e);
                None
            }
        }
    }
}

/// Types whose content is text, so a UTF-8 file may plausibly be one
fn is_textual(mime: &str) -> bool {
    const TEXTUAL_APPLICATION_TYPES: &[&str] = &[
        "application/json",
        "application/xml",
        "application/javascript",
        "application/x-javascript",
        "application/x-sh",
        "application/x-httpd-php",
        "application/sql",
        "application/toml",
        "application/x-yaml",
    ];

    let mime = mime.to_ascii_lowercase();
    mime.starts_with("text/")
        || mime.ends_with("+xml")
        || mime.ends_with("+json")
        || TEXTUAL_APPLICATION_TYPES.contains(&mime.as_str())
}

fn from_filename(request: &SniffRequest<'_>) -> Option<Detection> {
    let filename = request.filename?;
    mime_guess::from_path(filename)
        .first_raw()
        .map(|mime| Detection::new(mime, SniffLayer::FileName))
}

fn from_stream(request: &SniffRequest<'_>) -> Option<Detection> {
    let guess = File::open(request.path).and_then(|mut file| guess_from_stream(&mut file));
    match guess {
        Ok(mime) => mime.map(|mime| Detection::new(mime, SniffLayer::Stream)),
        Err(e) => {
            tracing::warn!(path = %request.path.display(), "Stream guess failed: {}", e);
            None
        }
    }
}

fn from_extension_table(request: &SniffRequest<'_>) -> Option<Detection> {
    let extension = request.extension?;
    mime_table::mime_for_extension(extension)
        .map(|mime| Detection::new(mime, SniffLayer::ExtensionTable))
}
