//! Office document loader
//!
//! Hands OpenDocument (and, in the OOXML flavor, Office Open XML) files to a
//! rendering engine that translates each entry into an HTML part. The
//! engine is injected; this module owns only the request/response contract.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::error::LoaderError;
use super::traits::FileLoader;
use crate::cache::ContentCache;
use crate::document::{
    DocumentPart, LoadFailure, LoadOutcome, LoadResult, LoaderType, Options, SourceReference,
};

/// MIME prefixes of the OpenDocument family
pub const ODF_MIME_PREFIXES: &[&str] = &[
    "application/vnd.oasis.opendocument",
    "application/x-vnd.oasis.opendocument",
];

pub const ODF_EXTENSIONS: &[&str] = &[
    "odt", "ods", "odp", "odg", "ott", "ots", "otp", "otg", "fodt", "fods", "fodp", "fodg",
];

/// MIME prefix of the Office Open XML family
pub const OOXML_MIME_PREFIXES: &[&str] = &["application/vnd.openxmlformats-officedocument"];

pub const OOXML_EXTENSIONS: &[&str] = &["docx", "xlsx", "pptx"];

/// Row limit for spreadsheet tables
const TABLE_LIMIT_ROWS: u32 = 10_000;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to open document: {0}")]
    OpenFailed(String),

    #[error("Document is encrypted and could not be decrypted")]
    Encrypted,

    #[error("Engine failure: {0}")]
    Failed(String),

    #[error("Failed to translate entry {entry}: {reason}")]
    TranslateFailed { entry: usize, reason: String },

    #[error("Unsupported document kind: {0}")]
    UnsupportedKind(String),

    #[error("Failed to apply edits: {0}")]
    EditFailed(String),

    #[error("Failed to save document to {path}: {reason}")]
    SaveFailed { path: String, reason: String },
}

/// Document kind as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeKind {
    OdfText,
    OdfSpreadsheet,
    OdfPresentation,
    OdfGraphics,
    OoxmlDocument,
    OoxmlWorkbook,
    OoxmlPresentation,
    Other,
}

impl OfficeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfficeKind::OdfText => "odt",
            OfficeKind::OdfSpreadsheet => "ods",
            OfficeKind::OdfPresentation => "odp",
            OfficeKind::OdfGraphics => "odg",
            OfficeKind::OoxmlDocument => "docx",
            OfficeKind::OoxmlWorkbook => "xlsx",
            OfficeKind::OoxmlPresentation => "pptx",
            OfficeKind::Other => "unknown",
        }
    }
}

/// What the engine knows about an opened document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub kind: OfficeKind,
    pub encrypted: bool,
    /// Sheet or slide names, in order
    pub entries: Vec<String>,
}

/// Per-translation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateConfig {
    pub editable: bool,
    pub entry_offset: usize,
    pub entry_count: usize,
    pub table_limit_rows: u32,
}

impl TranslateConfig {
    fn for_entry(editable: bool, entry_offset: usize) -> Self {
        Self {
            editable,
            entry_offset,
            entry_count: 1,
            table_limit_rows: TABLE_LIMIT_ROWS,
        }
    }
}

/// Rendering engine
///
/// Implementations are blocking; the loader calls them from
/// `spawn_blocking`.
pub trait OdfEngine: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn OdfDocument>, EngineError>;
}

/// A document opened by the engine
pub trait OdfDocument: Send {
    fn meta(&self) -> DocumentMeta;

    /// Returns `Ok(false)` for a wrong password
    fn decrypt(&mut self, password: &str) -> Result<bool, EngineError>;

    /// Translate the entries selected by `config` into HTML at `output`
    fn translate(&mut self, output: &Path, config: &TranslateConfig) -> Result<(), EngineError>;

    /// Apply an HTML diff taken from an editable translation
    fn edit(&mut self, diff: &str) -> Result<(), EngineError>;

    /// Write the document, edits included, to `path`
    fn save(&mut self, path: &Path) -> Result<(), EngineError>;
}

/// Document family a loader instance claims
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeFlavor {
    OpenDocument,
    OfficeOpenXml,
}

impl OfficeFlavor {
    fn mime_prefixes(&self) -> &'static [&'static str] {
        match self {
            OfficeFlavor::OpenDocument => ODF_MIME_PREFIXES,
            OfficeFlavor::OfficeOpenXml => OOXML_MIME_PREFIXES,
        }
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self {
            OfficeFlavor::OpenDocument => ODF_EXTENSIONS,
            OfficeFlavor::OfficeOpenXml => OOXML_EXTENSIONS,
        }
    }

    /// Whether a request's type or extension belongs to this family
    pub fn claims(&self, options: &Options) -> bool {
        let file_type = options.file_type.to_ascii_lowercase();
        if self
            .mime_prefixes()
            .iter()
            .any(|prefix| file_type.starts_with(prefix))
        {
            return true;
        }
        let extension = options.file_extension.to_ascii_lowercase();
        self.extensions().contains(&extension.as_str())
    }

    /// Title of the single part produced for text-like documents
    fn text_title(&self) -> &'static str {
        match self {
            OfficeFlavor::OpenDocument => "Document",
            OfficeFlavor::OfficeOpenXml => "Text document",
        }
    }
}

/// How a document kind is laid out into parts
enum Layout {
    /// One part covering the whole document
    Single,
    /// One part per sheet or slide
    PerEntry,
}

fn layout_for(flavor: OfficeFlavor, kind: OfficeKind) -> Option<Layout> {
    match (flavor, kind) {
        (OfficeFlavor::OpenDocument, OfficeKind::OdfText | OfficeKind::OdfGraphics) => {
            Some(Layout::Single)
        }
        (OfficeFlavor::OpenDocument, OfficeKind::OdfSpreadsheet | OfficeKind::OdfPresentation) => {
            Some(Layout::PerEntry)
        }
        (OfficeFlavor::OfficeOpenXml, OfficeKind::OoxmlDocument) => Some(Layout::Single),
        (
            OfficeFlavor::OfficeOpenXml,
            OfficeKind::OoxmlWorkbook | OfficeKind::OoxmlPresentation,
        ) => Some(Layout::PerEntry),
        _ => None,
    }
}

/// Decrypt `document` if needed and return its metadata
fn unlock(document: &mut dyn OdfDocument, password: Option<&str>) -> Result<DocumentMeta, EngineError> {
    let meta = document.meta();
    if !meta.encrypted {
        return Ok(meta);
    }
    let Some(password) = password else {
        return Err(EngineError::Encrypted);
    };
    if document.decrypt(password)? {
        Ok(document.meta())
    } else {
        Err(EngineError::Encrypted)
    }
}

/// Apply `diff` to a materialized document and save it as
/// `{output_prefix}.{ext}`, `ext` following the document kind
fn save_document(
    engine: &dyn OdfEngine,
    input: &Path,
    password: Option<&str>,
    diff: &str,
    output_prefix: &Path,
) -> Result<PathBuf, EngineError> {
    let mut document = engine.open(input)?;
    let meta = unlock(document.as_mut(), password)?;

    let mut output = output_prefix.as_os_str().to_owned();
    output.push(".");
    output.push(meta.kind.as_str());
    let output = PathBuf::from(output);

    document.edit(diff)?;
    document.save(&output)?;
    Ok(output)
}

/// Run the engine over a materialized document
fn translate_document(
    engine: &dyn OdfEngine,
    flavor: OfficeFlavor,
    input: &Path,
    outputs: &dyn Fn(usize) -> PathBuf,
    password: Option<&str>,
    editable: bool,
) -> Result<Vec<(String, PathBuf)>, EngineError> {
    let mut document = engine.open(input)?;
    let meta = unlock(document.as_mut(), password)?;

    let layout = layout_for(flavor, meta.kind)
        .ok_or_else(|| EngineError::UnsupportedKind(meta.kind.as_str().to_string()))?;

    let mut parts = Vec::new();
    match layout {
        Layout::Single => {
            let output = outputs(0);
            document.translate(&output, &TranslateConfig::for_entry(editable, 0))?;
            parts.push((flavor.text_title().to_string(), output));
        }
        Layout::PerEntry => {
            for (index, name) in meta.entries.iter().enumerate() {
                let output = outputs(index);
                document.translate(&output, &TranslateConfig::for_entry(editable, index))?;
                parts.push((name.clone(), output));
            }
        }
    }

    if parts.is_empty() {
        return Err(EngineError::Failed("document has no entries".to_string()));
    }
    Ok(parts)
}

/// Loader for office documents rendered by an `OdfEngine`
pub struct OdfLoader {
    flavor: OfficeFlavor,
    engine: Arc<dyn OdfEngine>,
    cache: Arc<ContentCache>,
}

impl OdfLoader {
    /// OpenDocument loader
    pub fn new(engine: Arc<dyn OdfEngine>, cache: Arc<ContentCache>) -> Self {
        Self {
            flavor: OfficeFlavor::OpenDocument,
            engine,
            cache,
        }
    }

    /// Office Open XML loader over the same engine
    pub fn ooxml(engine: Arc<dyn OdfEngine>, cache: Arc<ContentCache>) -> Self {
        Self {
            flavor: OfficeFlavor::OfficeOpenXml,
            engine,
            cache,
        }
    }

    pub fn flavor(&self) -> OfficeFlavor {
        self.flavor
    }

    /// Write back the edits made in an editable translation
    ///
    /// `options` must describe the document currently held by the cache.
    /// Returns the path of the saved document.
    pub async fn save_edits(
        &self,
        options: &Options,
        diff: String,
        output_prefix: PathBuf,
    ) -> Result<PathBuf, LoaderError> {
        if self.cache.current_source().as_ref() != Some(&options.source) {
            return Err(LoaderError::SourceNotFound(format!(
                "{} is no longer cached",
                options.source
            )));
        }

        let engine = Arc::clone(&self.engine);
        let cache = Arc::clone(&self.cache);
        let password = options.password.clone();

        let joined = tokio::task::spawn_blocking(move || {
            save_document(
                engine.as_ref(),
                cache.slot_path(),
                password.as_deref(),
                &diff,
                &output_prefix,
            )
        })
        .await;

        let saved = match joined {
            Ok(result) => result.map_err(LoaderError::from),
            Err(e) => Err(LoaderError::from(e)),
        };

        match &saved {
            Ok(path) => {
                tracing::info!(source = %options.source, path = %path.display(), "Saved edited document");
            }
            Err(error) => {
                tracing::warn!(source = %options.source, "Saving edits failed: {}", error);
            }
        }
        saved
    }
}

#[async_trait]
impl FileLoader for OdfLoader {
    fn loader_type(&self) -> LoaderType {
        LoaderType::Odf
    }

    fn is_supported(&self, options: &Options) -> bool {
        self.flavor.claims(options)
    }

    async fn load(&self, options: &mut Options) -> LoadOutcome {
        let engine = Arc::clone(&self.engine);
        let cache = Arc::clone(&self.cache);
        let flavor = self.flavor;
        let password = options.password.clone();
        let editable = options.editable;

        let joined = tokio::task::spawn_blocking(move || {
            let outputs = |index: usize| cache.output_path(index);
            translate_document(
                engine.as_ref(),
                flavor,
                cache.slot_path(),
                &outputs,
                password.as_deref(),
                editable,
            )
        })
        .await;

        let translated = match joined {
            Ok(result) => result.map_err(LoaderError::from),
            Err(e) => Err(LoaderError::from(e)),
        };

        match translated {
            Ok(parts) => {
                tracing::info!(
                    source = %options.source,
                    flavor = ?flavor,
                    parts = parts.len(),
                    "Translated office document"
                );
                let parts = parts
                    .into_iter()
                    .map(|(title, path)| {
                        let uri = SourceReference::from_path(&path).to_string();
                        DocumentPart::new(Some(title), uri)
                    })
                    .collect();
                Ok(LoadResult::new(options.clone(), LoaderType::Odf, parts))
            }
            Err(error) => {
                tracing::warn!(source = %options.source, "Office document translation failed: {}", error);
                Err(LoadFailure::new(options.clone(), LoaderType::Odf, error))
            }
        }
    }

    fn close(&self) {}
}
