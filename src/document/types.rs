//! Request/response records shared by every loader

use serde::{Deserialize, Serialize};

use super::source::SourceReference;
use crate::loader::LoaderError;

/// Sentinel for a file type, name or extension that could not be discovered
pub const UNKNOWN: &str = "N/A";

/// Loader variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderType {
    /// Type, name and cache resolution (always runs first)
    Metadata,
    /// OpenDocument / Office Open XML rendering engine
    Odf,
    /// Local PDF viewer hand-off
    Pdf,
    /// Remote viewer escalation
    Online,
}

impl std::fmt::Display for LoaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoaderType::Metadata => "metadata",
            LoaderType::Odf => "odf",
            LoaderType::Pdf => "pdf",
            LoaderType::Online => "online",
        };
        f.write_str(name)
    }
}

/// Per-request state
///
/// Created once per open-document request. `file_type`, `filename`,
/// `file_extension`, `cache_uri` and `file_exists` are written by the
/// metadata loader and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Locator of the original bytes
    pub source: SourceReference,

    /// Detected MIME type, `UNKNOWN` until resolved
    pub file_type: String,

    /// Display name of the document
    pub filename: String,

    /// Extension, canonicalized from the detected type when possible
    pub file_extension: String,

    /// Locator of the materialized local copy
    pub cache_uri: Option<String>,

    /// Set once a read of the source succeeded
    pub file_exists: bool,

    /// Remember this document in the recent-documents list
    pub persistent: bool,

    /// Password for encrypted office documents
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Ask the rendering engine for editable output
    pub editable: bool,

    /// Skip local viewers and go straight to remote escalation
    pub force_remote: bool,
}

impl Options {
    pub fn new(source: SourceReference) -> Self {
        Self {
            source,
            file_type: UNKNOWN.to_string(),
            filename: UNKNOWN.to_string(),
            file_extension: UNKNOWN.to_string(),
            cache_uri: None,
            file_exists: false,
            persistent: false,
            password: None,
            editable: false,
            force_remote: false,
        }
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn force_remote(mut self, force_remote: bool) -> Self {
        self.force_remote = force_remote;
        self
    }

    /// Whether the type is still the unknown sentinel
    pub fn has_unknown_type(&self) -> bool {
        self.file_type == UNKNOWN
    }
}

/// One titled part of a resolved document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPart {
    /// Sheet/slide/page title, if the format has one
    pub title: Option<String>,
    /// Where the part can be displayed from
    pub uri: String,
}

impl DocumentPart {
    pub fn new(title: Option<String>, uri: impl Into<String>) -> Self {
        Self {
            title,
            uri: uri.into(),
        }
    }
}

/// Successful loader response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    pub options: Options,
    pub loader_type: LoaderType,
    /// Non-empty on success
    pub parts: Vec<DocumentPart>,
}

impl LoadResult {
    pub fn new(options: Options, loader_type: LoaderType, parts: Vec<DocumentPart>) -> Self {
        Self {
            options,
            loader_type,
            parts,
        }
    }
}

/// Failed loader response, carrying the original cause
#[derive(Debug)]
pub struct LoadFailure {
    pub options: Options,
    pub loader_type: LoaderType,
    pub error: LoaderError,
}

impl LoadFailure {
    pub fn new(options: Options, loader_type: LoaderType, error: LoaderError) -> Self {
        Self {
            options,
            loader_type,
            error,
        }
    }
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} loader failed: {}", self.loader_type, self.error)
    }
}

/// Exactly one of these is produced per loader invocation
pub type LoadOutcome = std::result::Result<LoadResult, LoadFailure>;
