//! Loader error types
//!
//! Every failure a loader reports funnels through `LoaderError`, with the
//! original cause attached where there is one.

use thiserror::Error;

use super::odf::EngineError;
use crate::cache::CacheError;
use crate::remote::RemoteError;

/// Unified loader error type
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Source could not be found or holds no bytes
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Materializing the cache copy failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Document content is not what the loader expects
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Request reached a loader that does not handle its type
    #[error("Unsupported document type: {0}")]
    Unsupported(String),

    /// Rendering engine failure
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Remote auth/storage handles are missing or were released
    #[error("Remote client not initialized")]
    ClientNotInitialized,

    /// Anonymous sign-in failed
    #[error("Authentication failed: {0}")]
    Authentication(#[source] RemoteError),

    /// Upload call failed
    #[error("Upload failed: {0}")]
    Upload(#[source] RemoteError),

    /// Upload completed but the server reported failure
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    /// Blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Join(String),

    /// The pipeline worker has shut down
    #[error("Pipeline worker unavailable")]
    WorkerUnavailable,

    /// No loader accepted the request
    #[error("No loader accepts type {0}")]
    NoEligibleLoader(String),
}

impl From<tokio::task::JoinError> for LoaderError {
    fn from(err: tokio::task::JoinError) -> Self {
        LoaderError::Join(err.to_string())
    }
}

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;
