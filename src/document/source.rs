//! Source references and the platform content resolver seam

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use url::Url;

/// Prefix some callers put in front of relative references
const RELATIVE_MARKER: &str = "/./";

/// Opaque, URI-like locator of the original document bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceReference(String);

impl SourceReference {
    /// Create a reference, stripping a leading `/.` from `/./`-prefixed input
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.starts_with(RELATIVE_MARKER) {
            return Self(raw[2..].to_string());
        }
        Self(raw)
    }

    /// `file://` reference for a local path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Url::from_file_path(path) {
            Ok(url) => Self(url.to_string()),
            Err(()) => Self(path.display().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsed URL, if the reference carries a real scheme
    fn url(&self) -> Option<Url> {
        let url = Url::parse(&self.0).ok()?;
        // Single-letter schemes are drive letters, not URLs
        if url.scheme().len() < 2 {
            return None;
        }
        Some(url)
    }

    /// Local filesystem path, for `file://` references and bare paths
    pub fn to_file_path(&self) -> Option<PathBuf> {
        match self.url() {
            Some(url) if url.scheme() == "file" => url.to_file_path().ok(),
            Some(_) => None,
            None => Some(PathBuf::from(&self.0)),
        }
    }

    /// Last non-empty path segment, percent-decoded
    pub fn last_path_segment(&self) -> Option<String> {
        match self.url() {
            Some(url) => {
                let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
                let decoded = urlencoding::decode(segment)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| segment.to_string());
                Some(decoded)
            }
            None => Path::new(&self.0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }
    }
}

impl std::fmt::Display for SourceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Size and modification time of a source at one point in time
///
/// Two equal fingerprints are taken to mean the bytes did not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFingerprint {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceFingerprint {
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        }
    }
}

/// Platform content resolver
///
/// Opens source streams and answers the weak hints (display name, declared
/// type) the platform may know about a reference. Called from blocking
/// contexts only.
pub trait ContentResolver: Send + Sync {
    /// Open the source bytes for reading
    fn open(&self, source: &SourceReference) -> io::Result<Box<dyn Read + Send>>;

    /// Display name recorded by the platform
    fn display_name(&self, source: &SourceReference) -> io::Result<Option<String>>;

    /// MIME type declared by the platform
    fn declared_type(&self, source: &SourceReference) -> io::Result<Option<String>>;

    /// Fingerprint of the current source bytes
    ///
    /// `None` means the resolver cannot tell, and the cache always copies.
    fn fingerprint(&self, _source: &SourceReference) -> io::Result<Option<SourceFingerprint>> {
        Ok(None)
    }
}

/// Resolver for `file://` references and plain paths
#[derive(Debug, Clone, Default)]
pub struct FileSystemResolver;

impl FileSystemResolver {
    pub fn new() -> Self {
        Self
    }

    fn path_for(source: &SourceReference) -> io::Result<PathBuf> {
        source.to_file_path().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                format!("Not a local reference: {}", source),
            )
        })
    }
}

impl ContentResolver for FileSystemResolver {
    fn open(&self, source: &SourceReference) -> io::Result<Box<dyn Read + Send>> {
        let path = Self::path_for(source)?;
        let file = File::open(path)?;
        Ok(Box::new(file))
    }

    fn display_name(&self, source: &SourceReference) -> io::Result<Option<String>> {
        let path = Self::path_for(source)?;
        Ok(path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()))
    }

    fn declared_type(&self, _source: &SourceReference) -> io::Result<Option<String>> {
        // Plain filesystems carry no declared type
        Ok(None)
    }

    fn fingerprint(&self, source: &SourceReference) -> io::Result<Option<SourceFingerprint>> {
        let path = Self::path_for(source)?;
        let metadata = std::fs::metadata(path)?;
        Ok(Some(SourceFingerprint::from_metadata(&metadata)))
    }
}
