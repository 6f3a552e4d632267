//! Remote service client traits
//!
//! The escalation protocol talks to an identity service and an object store
//! only through these traits. `firebase` provides the HTTP implementation;
//! tests substitute mocks.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::document::UNKNOWN;

/// Remote service errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Remote services not configured: {0}")]
    NotConfigured(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata attached to an uploaded object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMetadata {
    pub content_type: Option<String>,
}

impl UploadMetadata {
    /// Content type from a resolved file type; omitted for the unknown sentinel
    pub fn for_file_type(file_type: &str) -> Self {
        let content_type = (file_type != UNKNOWN && !file_type.is_empty())
            .then(|| file_type.to_string());
        Self { content_type }
    }
}

/// Outcome of a completed upload call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Object name the upload targeted
    pub object: String,
    /// Whether the store accepted the object
    pub success: bool,
    /// HTTP status, when the transport has one
    pub status: Option<u16>,
    /// Server message for rejected uploads
    pub message: Option<String>,
}

/// Identity service
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Id of the currently signed-in user, if any
    fn current_user(&self) -> Option<String>;

    /// Create an anonymous identity and return its user id
    async fn sign_in_anonymously(&self) -> Result<String, RemoteError>;
}

/// Object store
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload `local_path` as `object`
    ///
    /// A completed call that the store refused is `Ok` with
    /// `success == false`; transport failures are `Err`.
    async fn upload(
        &self,
        object: &str,
        local_path: &Path,
        metadata: &UploadMetadata,
    ) -> Result<UploadReport, RemoteError>;
}

/// Auth and storage handles used together by the online loader
#[derive(Clone)]
pub struct RemoteClients {
    pub auth: Arc<dyn AuthClient>,
    pub storage: Arc<dyn StorageClient>,
}

impl RemoteClients {
    pub fn new(auth: Arc<dyn AuthClient>, storage: Arc<dyn StorageClient>) -> Self {
        Self { auth, storage }
    }
}

impl std::fmt::Debug for RemoteClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClients").finish_non_exhaustive()
    }
}
