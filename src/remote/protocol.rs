//! Remote escalation protocol
//!
//! authenticate -> upload -> viewer URL. Each step is awaited in turn; the
//! first failure ends the attempt with its cause. No retries.

use std::path::Path;

use uuid::Uuid;

use super::client::{RemoteClients, UploadMetadata};
use super::viewer::{ViewerTemplate, ViewerUrls};
use crate::loader::LoaderError;

/// Prefix of every uploaded object name
const UPLOAD_PREFIX: &str = "uploads";

/// Protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Uploading,
    Uploaded,
    ViewerReady,
    Failed,
}

/// What one escalation needs from the request
#[derive(Debug, Clone, Copy)]
pub struct EscalationRequest<'a> {
    /// Materialized local copy
    pub local_path: &'a Path,
    pub file_type: &'a str,
    pub file_extension: &'a str,
    /// The office loader would claim this type
    pub office: bool,
}

/// A single escalation attempt
pub struct RemoteEscalation<'a> {
    clients: &'a RemoteClients,
    viewer: &'a ViewerUrls,
    state: EscalationState,
}

impl<'a> RemoteEscalation<'a> {
    pub fn new(clients: &'a RemoteClients, viewer: &'a ViewerUrls) -> Self {
        Self {
            clients,
            viewer,
            state: EscalationState::Unauthenticated,
        }
    }

    pub fn state(&self) -> EscalationState {
        self.state
    }

    fn transition(&mut self, next: EscalationState) {
        tracing::debug!(from = ?self.state, to = ?next, "Escalation state change");
        self.state = next;
    }

    fn fail(&mut self, error: LoaderError) -> LoaderError {
        self.transition(EscalationState::Failed);
        error
    }

    /// Run the protocol and return the viewer URL
    pub async fn run(&mut self, request: EscalationRequest<'_>) -> Result<String, LoaderError> {
        let user_id = match self.clients.auth.current_user() {
            Some(user_id) => user_id,
            None => {
                self.transition(EscalationState::Authenticating);
                match self.clients.auth.sign_in_anonymously().await {
                    Ok(user_id) => user_id,
                    Err(e) => return Err(self.fail(LoaderError::Authentication(e))),
                }
            }
        };
        self.transition(EscalationState::Authenticated);

        let metadata = UploadMetadata::for_file_type(request.file_type);
        let file_path = format!("{}/{}.{}", user_id, Uuid::new_v4(), request.file_extension);
        let object = format!("{}/{}", UPLOAD_PREFIX, file_path);

        self.transition(EscalationState::Uploading);
        let report = match self
            .clients
            .storage
            .upload(&object, request.local_path, &metadata)
            .await
        {
            Ok(report) => report,
            Err(e) => return Err(self.fail(LoaderError::Upload(e))),
        };

        if !report.success {
            let message = report
                .message
                .unwrap_or_else(|| "server couldn't handle request".to_string());
            return Err(self.fail(LoaderError::UploadRejected(message)));
        }
        self.transition(EscalationState::Uploaded);

        let template = if request.office {
            ViewerTemplate::Office
        } else {
            ViewerTemplate::Generic
        };
        let viewer_url = self.viewer.viewer_url(template, &file_path);

        self.transition(EscalationState::ViewerReady);
        tracing::info!(object = %object, template = ?template, "Document escalated to remote viewer");
        Ok(viewer_url)
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::remote::client::{AuthClient, RemoteError, StorageClient, UploadMetadata, UploadReport};

    /// Auth client with a scripted outcome
    pub struct MockAuth {
        pub current: Option<String>,
        pub fail: bool,
        pub sign_ins: AtomicUsize,
    }

    impl MockAuth {
        pub fn signed_in(user: &str) -> Self {
            Self {
                current: Some(user.to_string()),
                fail: false,
                sign_ins: AtomicUsize::new(0),
            }
        }

        pub fn anonymous() -> Self {
            Self {
                current: None,
                fail: false,
                sign_ins: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                current: None,
                fail: true,
                sign_ins: AtomicUsize::new(0),
            }
        }

        pub fn sign_ins(&self) -> usize {
            self.sign_ins.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthClient for MockAuth {
        fn current_user(&self) -> Option<String> {
            self.current.clone()
        }

        async fn sign_in_anonymously(&self) -> Result<String, RemoteError> {
            self.sign_ins.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RemoteError::InvalidResponse("sign-up refused".to_string()));
            }
            Ok("anon-7".to_string())
        }
    }

    /// Storage client recording uploads
    pub struct MockStorage {
        pub accept: bool,
        pub transport_error: bool,
        pub uploads: Mutex<Vec<(String, UploadMetadata)>>,
    }

    impl MockStorage {
        pub fn accepting() -> Self {
            Self {
                accept: true,
                transport_error: false,
                uploads: Mutex::new(Vec::new()),
            }
        }

        pub fn rejecting() -> Self {
            Self {
                accept: false,
                transport_error: false,
                uploads: Mutex::new(Vec::new()),
            }
        }

        pub fn broken() -> Self {
            Self {
                accept: false,
                transport_error: true,
                uploads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl StorageClient for MockStorage {
        async fn upload(
            &self,
            object: &str,
            _local_path: &Path,
            metadata: &UploadMetadata,
        ) -> Result<UploadReport, RemoteError> {
            if self.transport_error {
                return Err(RemoteError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                )));
            }
            self.uploads
                .lock()
                .push((object.to_string(), metadata.clone()));
            Ok(UploadReport {
                object: object.to_string(),
                success: self.accept,
                status: Some(if self.accept { 200 } else { 503 }),
                message: None,
            })
        }
    }
}
