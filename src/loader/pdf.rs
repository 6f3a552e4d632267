//! PDF loader
//!
//! Hands a materialized PDF to a local viewer. The only work done here is
//! checking that the cached copy really is a PDF.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::LoaderError;
use super::traits::FileLoader;
use crate::cache::ContentCache;
use crate::document::{DocumentPart, LoadFailure, LoadOutcome, LoadResult, LoaderType, Options};

pub const PDF_MIME_TYPES: &[&str] = &["application/pdf", "application/x-pdf"];

const PDF_HEADER: &[u8] = b"%PDF-";

/// Loader for local PDF viewing
pub struct PdfLoader {
    cache: Arc<ContentCache>,
}

impl PdfLoader {
    pub fn new(cache: Arc<ContentCache>) -> Self {
        Self { cache }
    }
}

/// Blocking; reads the first bytes of the cached copy
fn check_header(path: &Path) -> Result<(), LoaderError> {
    let mut header = [0u8; 5];
    let mut file = File::open(path).map_err(|e| LoaderError::SourceNotFound(e.to_string()))?;
    file.read_exact(&mut header)
        .map_err(|e| LoaderError::InvalidDocument(format!("Truncated PDF: {}", e)))?;

    if &header[..] != PDF_HEADER {
        return Err(LoaderError::InvalidDocument(
            "Missing %PDF- header".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl FileLoader for PdfLoader {
    fn loader_type(&self) -> LoaderType {
        LoaderType::Pdf
    }

    fn is_supported(&self, options: &Options) -> bool {
        let file_type = options.file_type.to_ascii_lowercase();
        PDF_MIME_TYPES.iter().any(|mime| file_type == *mime)
    }

    async fn load(&self, options: &mut Options) -> LoadOutcome {
        let Some(cache_uri) = options.cache_uri.clone() else {
            return Err(LoadFailure::new(
                options.clone(),
                LoaderType::Pdf,
                LoaderError::SourceNotFound("Document was not materialized".to_string()),
            ));
        };

        let slot = self.cache.slot_path().to_path_buf();
        let checked = match tokio::task::spawn_blocking(move || check_header(&slot)).await {
            Ok(result) => result,
            Err(e) => Err(LoaderError::from(e)),
        };

        match checked {
            Ok(()) => Ok(LoadResult::new(
                options.clone(),
                LoaderType::Pdf,
                vec![DocumentPart::new(None, cache_uri)],
            )),
            Err(error) => {
                tracing::warn!(source = %options.source, "PDF validation failed: {}", error);
                Err(LoadFailure::new(options.clone(), LoaderType::Pdf, error))
            }
        }
    }

    fn close(&self) {}
}
