//! Loader variants
//!
//! Every loader answers the same three questions: do you handle this
//! request (`is_supported`), handle it (`load`), and let go of your
//! resources (`close`).
//!
//! - `MetadataLoader`: mandatory first stage; cache copy, type and name
//! - `OdfLoader`: OpenDocument / Office Open XML via a rendering engine
//! - `PdfLoader`: local PDF viewing
//! - `OnlineLoader`: remote viewer escalation

mod error;
mod metadata;
mod odf;
mod online;
mod pdf;
mod traits;

pub use error::{LoaderError, Result};
pub use metadata::MetadataLoader;
pub use odf::{
    DocumentMeta, EngineError, OdfDocument, OdfEngine, OdfLoader, OfficeFlavor, OfficeKind,
    TranslateConfig, ODF_EXTENSIONS, ODF_MIME_PREFIXES, OOXML_EXTENSIONS, OOXML_MIME_PREFIXES,
};
pub use online::OnlineLoader;
pub use pdf::{PdfLoader, PDF_MIME_TYPES};
pub use traits::FileLoader;
