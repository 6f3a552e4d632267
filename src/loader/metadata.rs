//! Metadata loader
//!
//! Mandatory first stage of every request: materializes the source into the
//! cache and resolves type, filename and extension. Later stages only read
//! what this loader writes.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::{LoaderError, Result};
use super::traits::FileLoader;
use crate::cache::ContentCache;
use crate::document::{
    ContentResolver, DocumentPart, LoadFailure, LoadOutcome, LoadResult, LoaderType, Options,
    SourceReference, UNKNOWN,
};
use crate::recent::RecentDocuments;
use crate::sniff::{extension_for_mime, SniffRequest, TypeSniffer};

/// Resolves `file_type`, `filename`, `file_extension` and the cache copy
pub struct MetadataLoader {
    cache: Arc<ContentCache>,
    resolver: Arc<dyn ContentResolver>,
    sniffer: Arc<TypeSniffer>,
    recent: Option<Arc<RecentDocuments>>,
}

impl MetadataLoader {
    pub fn new(
        cache: Arc<ContentCache>,
        resolver: Arc<dyn ContentResolver>,
        sniffer: Arc<TypeSniffer>,
    ) -> Self {
        Self {
            cache,
            resolver,
            sniffer,
            recent: None,
        }
    }

    /// Record persistent requests in `recent`
    pub fn with_recent_documents(mut self, recent: Arc<RecentDocuments>) -> Self {
        self.recent = Some(recent);
        self
    }
}

/// Everything the blocking resolution step needs
struct Resolution {
    cache: Arc<ContentCache>,
    resolver: Arc<dyn ContentResolver>,
    sniffer: Arc<TypeSniffer>,
    recent: Option<Arc<RecentDocuments>>,
}

impl Resolution {
    fn run(&self, options: &mut Options) -> Result<()> {
        let source = SourceReference::parse(options.source.as_str());
        options.source = source.clone();

        let path = self.cache.resolve(&source, self.resolver.as_ref())?;
        options.file_exists = true;
        options.cache_uri = Some(self.cache.locator().to_string());

        options.filename = self.filename(&source);
        options.file_extension = extension_of(&options.filename);

        // Checked on the copy itself so it holds even without a signature database
        let copied_len = std::fs::metadata(&path)
            .map_err(|e| LoaderError::SourceNotFound(format!("{}: {}", source, e)))?
            .len();
        if copied_len == 0 {
            return Err(LoaderError::SourceNotFound(format!("{} is empty", source)));
        }

        let detection = self.sniffer.detect(&SniffRequest {
            path: &path,
            source: &source,
            filename: known(&options.filename),
            extension: known(&options.file_extension),
        });
        options.file_type = detection
            .map(|found| found.mime)
            .unwrap_or_else(|| UNKNOWN.to_string());

        if let Some(canonical) = extension_for_mime(&options.file_type) {
            options.file_extension = canonical.to_string();
        }

        if options.persistent {
            self.remember(options);
        }

        Ok(())
    }

    /// Display name from the resolver, else the last path segment
    fn filename(&self, source: &SourceReference) -> String {
        let display_name = match self.resolver.display_name(source) {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(source = %source, "Display name lookup failed: {}", e);
                None
            }
        };

        display_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| source.last_path_segment())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn remember(&self, options: &Options) {
        let Some(recent) = &self.recent else {
            return;
        };
        if let Err(e) = recent.record(&options.filename, options.source.as_str()) {
            tracing::warn!(
                path = %recent.path().display(),
                "Failed to record recent document: {}",
                e
            );
        }
    }
}

/// Part of the name after the last dot
fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, extension)) if !extension.is_empty() => extension.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

fn known(value: &str) -> Option<&str> {
    (value != UNKNOWN).then_some(value)
}

#[async_trait]
impl FileLoader for MetadataLoader {
    fn loader_type(&self) -> LoaderType {
        LoaderType::Metadata
    }

    fn is_supported(&self, _options: &Options) -> bool {
        true
    }

    async fn load(&self, options: &mut Options) -> LoadOutcome {
        let resolution = Resolution {
            cache: Arc::clone(&self.cache),
            resolver: Arc::clone(&self.resolver),
            sniffer: Arc::clone(&self.sniffer),
            recent: self.recent.clone(),
        };

        let request = options.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let mut request = request;
            let outcome = resolution.run(&mut request);
            (request, outcome)
        })
        .await;

        let outcome = match joined {
            Ok((resolved, outcome)) => {
                *options = resolved;
                outcome
            }
            Err(e) => Err(LoaderError::from(e)),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(
                    source = %options.source,
                    file_type = %options.file_type,
                    extension = %options.file_extension,
                    "Resolved document metadata"
                );
                let cache_uri = options.cache_uri.clone().unwrap_or_default();
                Ok(LoadResult::new(
                    options.clone(),
                    LoaderType::Metadata,
                    vec![DocumentPart::new(None, cache_uri)],
                ))
            }
            Err(error) => {
                options.file_type = UNKNOWN.to_string();
                tracing::info!(source = %options.source, "Metadata resolution failed: {}", error);
                Err(LoadFailure::new(options.clone(), LoaderType::Metadata, error))
            }
        }
    }

    fn close(&self) {
        self.sniffer.release();
    }
}
