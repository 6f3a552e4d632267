//! Online loader
//!
//! Last resort for types no local loader claims: uploads the cached copy
//! and answers with a cloud viewer URL.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::LoaderError;
use super::odf::OfficeFlavor;
use super::traits::FileLoader;
use crate::cache::ContentCache;
use crate::document::{DocumentPart, LoadFailure, LoadOutcome, LoadResult, LoaderType, Options};
use crate::remote::{EligibilityPolicy, EscalationRequest, RemoteClients, RemoteEscalation, ViewerUrls};

/// Remote viewer escalation as a loader
pub struct OnlineLoader {
    cache: Arc<ContentCache>,
    policy: EligibilityPolicy,
    viewer: ViewerUrls,
    clients: RwLock<Option<RemoteClients>>,
}

impl OnlineLoader {
    /// `clients` is `None` when the remote services could not be set up;
    /// every load then fails without touching the network.
    pub fn new(cache: Arc<ContentCache>, clients: Option<RemoteClients>) -> Self {
        Self {
            cache,
            policy: EligibilityPolicy::default(),
            viewer: ViewerUrls::default(),
            clients: RwLock::new(clients),
        }
    }

    pub fn with_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_viewer_urls(mut self, viewer: ViewerUrls) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    pub fn is_initialized(&self) -> bool {
        self.clients.read().is_some()
    }
}

#[async_trait]
impl FileLoader for OnlineLoader {
    fn loader_type(&self) -> LoaderType {
        LoaderType::Online
    }

    fn is_supported(&self, options: &Options) -> bool {
        self.policy.is_eligible(&options.file_type)
    }

    async fn load(&self, options: &mut Options) -> LoadOutcome {
        let Some(clients) = self.clients.read().clone() else {
            return Err(LoadFailure::new(
                options.clone(),
                LoaderType::Online,
                LoaderError::ClientNotInitialized,
            ));
        };

        let request = EscalationRequest {
            local_path: self.cache.slot_path(),
            file_type: &options.file_type,
            file_extension: &options.file_extension,
            office: OfficeFlavor::OpenDocument.claims(options),
        };

        let mut escalation = RemoteEscalation::new(&clients, &self.viewer);
        match escalation.run(request).await {
            Ok(viewer_url) => Ok(LoadResult::new(
                options.clone(),
                LoaderType::Online,
                vec![DocumentPart::new(None, viewer_url)],
            )),
            Err(error) => {
                tracing::warn!(source = %options.source, "Remote escalation failed: {}", error);
                Err(LoadFailure::new(options.clone(), LoaderType::Online, error))
            }
        }
    }

    fn close(&self) {
        self.clients.write().take();
    }
}
