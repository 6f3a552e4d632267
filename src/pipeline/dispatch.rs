//! Ordered loader dispatch
//!
//! metadata -> first format loader that claims the request -> online
//! escalation -> `NoEligibleLoader`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{CacheError, ContentCache};
use crate::config::Config;
use crate::document::{ContentResolver, FileSystemResolver, LoadFailure, LoadOutcome, LoaderType, Options};
use crate::loader::{FileLoader, LoaderError, MetadataLoader, OdfEngine, OdfLoader, OnlineLoader, PdfLoader};
use crate::recent::RecentDocuments;
use crate::remote::{firebase_clients, EligibilityPolicy, RemoteClients, ViewerUrls};
use crate::sniff::TypeSniffer;

/// The full loader chain for one cache
pub struct DocumentPipeline {
    cache: Arc<ContentCache>,
    metadata: MetadataLoader,
    /// Local viewers, in priority order
    format_loaders: Vec<Arc<dyn FileLoader>>,
    /// The office loaders among `format_loaders`, for saving edits
    office_loaders: Vec<Arc<OdfLoader>>,
    online: OnlineLoader,
}

impl DocumentPipeline {
    pub fn builder(cache: Arc<ContentCache>) -> PipelineBuilder {
        PipelineBuilder::new(cache)
    }

    /// Pipeline wired from configuration
    ///
    /// Remote escalation stays uninitialized (and every escalation fails
    /// fast) when the Firebase settings are missing or unusable.
    pub fn from_config(config: &Config) -> Result<Self, CacheError> {
        let cache = Arc::new(ContentCache::new(config.cache.dir.clone())?);

        let mut builder = Self::builder(cache).viewer_urls(
            ViewerUrls::default().with_download_endpoint(config.remote.download_endpoint.clone()),
        );
        if let Some(path) = &config.signature_db_path {
            builder = builder.signature_database(path.clone());
        }
        if let Some(path) = &config.recent_documents_path {
            builder = builder.recent_documents(Arc::new(RecentDocuments::new(path)));
        }
        match firebase_clients(&config.remote) {
            Ok(clients) => builder = builder.remote_clients(clients),
            Err(e) => tracing::warn!("Remote escalation disabled: {}", e),
        }

        Ok(builder.build())
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Resolve one request into exactly one outcome
    pub async fn open(&self, mut options: Options) -> LoadOutcome {
        self.metadata.load(&mut options).await?;

        if options.force_remote {
            tracing::debug!(source = %options.source, "Local viewers skipped by request");
        } else if let Some(loader) = self
            .format_loaders
            .iter()
            .find(|loader| loader.is_supported(&options))
        {
            tracing::debug!(loader = %loader.loader_type(), file_type = %options.file_type, "Dispatching");
            return loader.load(&mut options).await;
        }

        if self.online.is_supported(&options) {
            tracing::debug!(file_type = %options.file_type, "Escalating to remote viewer");
            return self.online.load(&mut options).await;
        }

        tracing::info!(file_type = %options.file_type, "No loader accepts document");
        let error = LoaderError::NoEligibleLoader(options.file_type.clone());
        Err(LoadFailure::new(options, LoaderType::Online, error))
    }

    /// Save the edits made in an editable office translation
    ///
    /// `options` is the resolved request of the document currently open;
    /// the result is written to `{output_prefix}.{ext}`.
    pub async fn save_edits(
        &self,
        options: &Options,
        diff: String,
        output_prefix: PathBuf,
    ) -> Result<PathBuf, LoaderError> {
        let loader = self
            .office_loaders
            .iter()
            .find(|loader| loader.is_supported(options))
            .ok_or_else(|| LoaderError::Unsupported(options.file_type.clone()))?;
        loader.save_edits(options, diff, output_prefix).await
    }

    /// Release every loader's resources
    pub fn close(&self) {
        self.metadata.close();
        for loader in &self.format_loaders {
            loader.close();
        }
        self.online.close();
    }
}

/// Builder for `DocumentPipeline`
pub struct PipelineBuilder {
    cache: Arc<ContentCache>,
    resolver: Arc<dyn ContentResolver>,
    signature_db_path: Option<PathBuf>,
    recent: Option<Arc<RecentDocuments>>,
    odf_engine: Option<Arc<dyn OdfEngine>>,
    remote_clients: Option<RemoteClients>,
    policy: EligibilityPolicy,
    viewer: ViewerUrls,
}

impl PipelineBuilder {
    pub fn new(cache: Arc<ContentCache>) -> Self {
        Self {
            cache,
            resolver: Arc::new(FileSystemResolver::new()),
            signature_db_path: None,
            recent: None,
            odf_engine: None,
            remote_clients: None,
            policy: EligibilityPolicy::default(),
            viewer: ViewerUrls::default(),
        }
    }

    pub fn resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn signature_database(mut self, path: PathBuf) -> Self {
        self.signature_db_path = Some(path);
        self
    }

    pub fn recent_documents(mut self, recent: Arc<RecentDocuments>) -> Self {
        self.recent = Some(recent);
        self
    }

    /// Enable the OpenDocument and Office Open XML loaders
    pub fn odf_engine(mut self, engine: Arc<dyn OdfEngine>) -> Self {
        self.odf_engine = Some(engine);
        self
    }

    pub fn remote_clients(mut self, clients: RemoteClients) -> Self {
        self.remote_clients = Some(clients);
        self
    }

    pub fn eligibility_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn viewer_urls(mut self, viewer: ViewerUrls) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn build(self) -> DocumentPipeline {
        let mut sniffer = TypeSniffer::new(Arc::clone(&self.resolver));
        if let Some(path) = self.signature_db_path {
            sniffer = sniffer.with_database_path(path);
        }

        let mut metadata =
            MetadataLoader::new(Arc::clone(&self.cache), self.resolver, Arc::new(sniffer));
        if let Some(recent) = self.recent {
            metadata = metadata.with_recent_documents(recent);
        }

        let mut office_loaders = Vec::new();
        if let Some(engine) = self.odf_engine {
            office_loaders.push(Arc::new(OdfLoader::new(
                Arc::clone(&engine),
                Arc::clone(&self.cache),
            )));
            office_loaders.push(Arc::new(OdfLoader::ooxml(engine, Arc::clone(&self.cache))));
        }

        let mut format_loaders: Vec<Arc<dyn FileLoader>> = office_loaders
            .iter()
            .map(|loader| Arc::clone(loader) as Arc<dyn FileLoader>)
            .collect();
        format_loaders.push(Arc::new(PdfLoader::new(Arc::clone(&self.cache))));

        let online = OnlineLoader::new(Arc::clone(&self.cache), self.remote_clients)
            .with_policy(self.policy)
            .with_viewer_urls(self.viewer);

        DocumentPipeline {
            cache: self.cache,
            metadata,
            format_loaders,
            office_loaders,
            online,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::document::{SourceReference, UNKNOWN};
    use crate::loader::{DocumentMeta, EngineError, OdfDocument, OfficeKind, TranslateConfig};
    use crate::remote::mocks::{MockAuth, MockStorage};
    use crate::remote::{GENERIC_VIEWER_TEMPLATE, OFFICE_VIEWER_TEMPLATE};
    use crate::sniff::inspect_zip;

    /// Engine rendering every document as a single text part
    struct TextEngine;

    struct TextDocument;

    impl OdfEngine for TextEngine {
        fn open(&self, _path: &Path) -> Result<Box<dyn OdfDocument>, EngineError> {
            Ok(Box::new(TextDocument))
        }
    }

    impl OdfDocument for TextDocument {
        fn meta(&self) -> DocumentMeta {
            DocumentMeta {
                kind: OfficeKind::OdfText,
                encrypted: false,
                entries: Vec::new(),
            }
        }

        fn decrypt(&mut self, _password: &str) -> Result<bool, EngineError> {
            Ok(true)
        }

        fn translate(&mut self, output: &Path, _config: &TranslateConfig) -> Result<(), EngineError> {
            std::fs::write(output, b"<p>text</p>").map_err(|e| EngineError::Failed(e.to_string()))
        }

        fn edit(&mut self, _diff: &str) -> Result<(), EngineError> {
            Ok(())
        }

        fn save(&mut self, path: &Path) -> Result<(), EngineError> {
            std::fs::write(path, b"saved").map_err(|e| EngineError::SaveFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        storage: Arc<MockStorage>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                storage: Arc::new(MockStorage::accepting()),
            }
        }

        fn builder(&self) -> PipelineBuilder {
            let cache = Arc::new(ContentCache::new(self.dir.path().join("cache")).unwrap());
            let clients = RemoteClients::new(
                Arc::new(MockAuth::signed_in("user-1")),
                Arc::clone(&self.storage) as Arc<dyn crate::remote::StorageClient>,
            );
            DocumentPipeline::builder(cache).remote_clients(clients)
        }

        fn source(&self, name: &str, content: &[u8]) -> Options {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            Options::new(SourceReference::from_path(path))
        }

        fn odt_source(&self, name: &str) -> Options {
            let path = self.dir.path().join(name);
            crate::sniff::fixtures::write_zip(
                &path,
                &[
                    ("mimetype", "application/vnd.oasis.opendocument.text"),
                    ("content.xml", "<office:document-content/>"),
                ],
            );
            assert!(inspect_zip(&path).unwrap().is_some());
            Options::new(SourceReference::from_path(path))
        }
    }

    #[tokio::test]
    async fn test_pdf_goes_to_pdf_loader() {
        let fx = Fixture::new();
        let pipeline = fx.builder().build();

        let result = pipeline
            .open(fx.source("report.unknown", b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n"))
            .await
            .unwrap();

        assert_eq!(result.loader_type, LoaderType::Pdf);
        assert_eq!(result.options.file_type, "application/pdf");
        assert_eq!(result.options.file_extension, "pdf");
        assert_eq!(result.parts.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_file_is_not_found() {
        let fx = Fixture::new();
        let pipeline = fx.builder().build();

        let failure = pipeline.open(fx.source("empty.pdf", b"")).await.unwrap_err();

        assert_eq!(failure.loader_type, LoaderType::Metadata);
        assert!(matches!(failure.error, LoaderError::SourceNotFound(_)));
        assert_eq!(failure.options.file_type, UNKNOWN);
        assert!(fx.storage.uploads.lock().is_empty());
    }

    #[tokio::test]
    async fn test_odf_goes_to_office_loader_when_engine_present() {
        let fx = Fixture::new();
        let pipeline = fx.builder().odf_engine(Arc::new(TextEngine)).build();

        let result = pipeline.open(fx.odt_source("letter.odt")).await.unwrap();

        assert_eq!(result.loader_type, LoaderType::Odf);
        assert_eq!(result.parts[0].title.as_deref(), Some("Document"));
        assert!(fx.storage.uploads.lock().is_empty());
    }

    #[tokio::test]
    async fn test_odf_without_engine_escalates_to_office_viewer() {
        let fx = Fixture::new();
        let pipeline = fx.builder().build();

        let result = pipeline.open(fx.odt_source("letter.odt")).await.unwrap();

        assert_eq!(result.loader_type, LoaderType::Online);
        assert!(result.parts[0].uri.starts_with(OFFICE_VIEWER_TEMPLATE));
        let uploads = fx.storage.uploads.lock();
        assert!(uploads[0].0.ends_with(".odt"));
    }

    #[tokio::test]
    async fn test_force_remote_skips_local_viewers() {
        let fx = Fixture::new();
        let pipeline = fx.builder().build();

        let options = fx.source("report.pdf", b"%PDF-1.4\n").force_remote(true);
        let result = pipeline.open(options).await.unwrap();

        assert_eq!(result.loader_type, LoaderType::Online);
        assert!(result.parts[0].uri.starts_with(GENERIC_VIEWER_TEMPLATE));
    }

    #[tokio::test]
    async fn test_text_escalates_unless_policy_refuses() {
        let fx = Fixture::new();
        let pipeline = fx.builder().build();

        let result = pipeline
            .open(fx.source("notes.txt", b"remember the milk\n"))
            .await
            .unwrap();
        assert_eq!(result.options.file_type, "text/plain");
        assert_eq!(result.loader_type, LoaderType::Online);

        let strict = fx
            .builder()
            .eligibility_policy(EligibilityPolicy::new(["image/"], ["image/svg"]))
            .build();
        let failure = strict
            .open(fx.source("notes.txt", b"remember the milk\n"))
            .await
            .unwrap_err();
        assert_eq!(failure.loader_type, LoaderType::Online);
        assert!(matches!(failure.error, LoaderError::NoEligibleLoader(ref t) if t == "text/plain"));
    }

    #[tokio::test]
    async fn test_unknown_binary_has_no_loader() {
        let fx = Fixture::new();
        let pipeline = fx.builder().build();

        let failure = pipeline
            .open(fx.source("blob", b"\x00\x01\x02\x03"))
            .await
            .unwrap_err();

        assert_eq!(failure.options.file_type, UNKNOWN);
        assert!(matches!(failure.error, LoaderError::NoEligibleLoader(_)));
        assert!(fx.storage.uploads.lock().is_empty());
    }

    #[tokio::test]
    async fn test_close_releases_remote_clients() {
        let fx = Fixture::new();
        let pipeline = fx.builder().build();
        pipeline.close();

        let failure = pipeline
            .open(fx.source("notes.txt", b"hello\n"))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, LoaderError::ClientNotInitialized));
    }

    #[test]
    fn test_from_config_without_remote_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.dir = dir.path().join("cache");

        let pipeline = DocumentPipeline::from_config(&config).unwrap();

        assert!(!pipeline.online.is_initialized());
        assert!(pipeline.cache().dir().is_dir());
    }

    #[tokio::test]
    async fn test_save_edits_after_open() {
        let fx = Fixture::new();
        let pipeline = fx.builder().odf_engine(Arc::new(TextEngine)).build();

        let mut request = fx.odt_source("letter.odt");
        request.editable = true;
        let result = pipeline.open(request).await.unwrap();

        let saved = pipeline
            .save_edits(&result.options, "<p>new</p>".to_string(), fx.dir.path().join("letter-2"))
            .await
            .unwrap();

        assert_eq!(saved, fx.dir.path().join("letter-2.odt"));
        assert_eq!(std::fs::read(saved).unwrap(), b"saved");
    }

    #[tokio::test]
    async fn test_save_edits_without_office_loader() {
        let fx = Fixture::new();
        let pipeline = fx.builder().build();

        let result = pipeline
            .open(fx.source("report.pdf", b"%PDF-1.4\n"))
            .await
            .unwrap();
        let err = pipeline
            .save_edits(&result.options, "x".to_string(), fx.dir.path().join("out"))
            .await
            .unwrap_err();

        assert!(matches!(err, LoaderError::Unsupported(ref t) if t == "application/pdf"));
    }
}
