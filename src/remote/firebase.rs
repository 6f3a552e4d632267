//! Firebase REST clients
//!
//! Anonymous sign-up against the Identity Toolkit and media uploads to
//! Cloud Storage for Firebase, over plain `reqwest`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use super::client::{AuthClient, RemoteClients, RemoteError, StorageClient, UploadMetadata, UploadReport};
use crate::config::RemoteConfig;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const STORAGE_URL: &str = "https://firebasestorage.googleapis.com/v0";

/// Content type sent when the document type is unknown
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    id_token: String,
    local_id: String,
}

/// Identity Toolkit client holding the anonymous session
pub struct FirebaseAuth {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    session: RwLock<Option<Session>>,
}

impl FirebaseAuth {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: IDENTITY_TOOLKIT_URL.to_string(),
            session: RwLock::new(None),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Token for authorizing storage requests
    pub fn id_token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.id_token.clone())
    }
}

#[async_trait]
impl AuthClient for FirebaseAuth {
    fn current_user(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.user_id.clone())
    }

    async fn sign_in_anonymously(&self) -> Result<String, RemoteError> {
        let url = format!("{}/accounts:signUp", self.base_url);
        let request = serde_json::json!({ "returnSecureToken": true });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                service: "identity toolkit",
                status,
                body,
            });
        }

        let body: SignUpResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("Failed to parse sign-up response: {}", e)))?;

        tracing::debug!(user_id = %body.local_id, "Signed in anonymously");
        let user_id = body.local_id.clone();
        *self.session.write() = Some(Session {
            user_id: body.local_id,
            id_token: body.id_token,
        });
        Ok(user_id)
    }
}

/// Cloud Storage client uploading as the signed-in user
pub struct FirebaseStorage {
    client: reqwest::Client,
    bucket: String,
    base_url: String,
    auth: Arc<FirebaseAuth>,
}

impl FirebaseStorage {
    pub fn new(client: reqwest::Client, bucket: &str, auth: Arc<FirebaseAuth>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            base_url: STORAGE_URL.to_string(),
            auth,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl StorageClient for FirebaseStorage {
    async fn upload(
        &self,
        object: &str,
        local_path: &Path,
        metadata: &UploadMetadata,
    ) -> Result<UploadReport, RemoteError> {
        let token = self.auth.id_token().ok_or(RemoteError::NotSignedIn)?;
        let body = tokio::fs::read(local_path).await?;
        let content_type = metadata
            .content_type
            .as_deref()
            .unwrap_or(FALLBACK_CONTENT_TYPE);

        let url = format!("{}/b/{}/o", self.base_url, self.bucket);
        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", object)])
            .header(AUTHORIZATION, format!("Firebase {}", token))
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let message = if status.is_success() {
            None
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(object = %object, status = status.as_u16(), "Upload rejected: {}", body);
            Some(format!("storage returned {}", status))
        };

        Ok(UploadReport {
            object: object.to_string(),
            success: status.is_success(),
            status: Some(status.as_u16()),
            message,
        })
    }
}

/// Build auth and storage clients from configuration
pub fn firebase_clients(config: &RemoteConfig) -> Result<RemoteClients, RemoteError> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| RemoteError::NotConfigured("FIREBASE_API_KEY is not set".to_string()))?;
    let bucket = config
        .storage_bucket
        .as_deref()
        .ok_or_else(|| RemoteError::NotConfigured("FIREBASE_STORAGE_BUCKET is not set".to_string()))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let auth = Arc::new(FirebaseAuth::new(client.clone(), api_key));
    let storage = Arc::new(FirebaseStorage::new(client, bucket, Arc::clone(&auth)));
    Ok(RemoteClients::new(auth, storage))
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use super::*;

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        (base_url, rx)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn config(api_key: Option<&str>, bucket: Option<&str>) -> RemoteConfig {
        RemoteConfig {
            api_key: api_key.map(str::to_string),
            storage_bucket: bucket.map(str::to_string),
            ..RemoteConfig::default()
        }
    }

    #[tokio::test]
    async fn test_anonymous_sign_up() {
        let (base_url, request) = serve_once(
            "200 OK",
            r#"{"idToken":"token-abc","localId":"user-42","refreshToken":"r","expiresIn":"3600"}"#,
        )
        .await;
        let auth = FirebaseAuth::new(reqwest::Client::new(), "key-1").with_base_url(&base_url);
        assert_eq!(auth.current_user(), None);

        let user_id = auth.sign_in_anonymously().await.unwrap();

        assert_eq!(user_id, "user-42");
        assert_eq!(auth.current_user().as_deref(), Some("user-42"));
        assert_eq!(auth.id_token().as_deref(), Some("token-abc"));

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /accounts:signUp?key=key-1 "));
        assert!(request.contains("\"returnSecureToken\":true"));
    }

    #[tokio::test]
    async fn test_sign_up_error_status() {
        let (base_url, _request) =
            serve_once("400 Bad Request", r#"{"error":{"message":"ADMIN_ONLY_OPERATION"}}"#).await;
        let auth = FirebaseAuth::new(reqwest::Client::new(), "key-1").with_base_url(&base_url);

        let err = auth.sign_in_anonymously().await.unwrap_err();

        assert!(matches!(err, RemoteError::Status { status: 400, .. }));
        assert_eq!(auth.current_user(), None);
    }

    async fn signed_in_auth() -> Arc<FirebaseAuth> {
        let (base_url, _request) =
            serve_once("200 OK", r#"{"idToken":"token-abc","localId":"user-42"}"#).await;
        let auth = FirebaseAuth::new(reqwest::Client::new(), "key-1").with_base_url(&base_url);
        auth.sign_in_anonymously().await.unwrap();
        Arc::new(auth)
    }

    #[tokio::test]
    async fn test_upload_sends_token_and_content_type() {
        let auth = signed_in_auth().await;
        let (base_url, request) = serve_once("200 OK", r#"{"name":"uploads/user-42/a.pdf"}"#).await;
        let storage =
            FirebaseStorage::new(reqwest::Client::new(), "demo.appspot.com", auth).with_base_url(&base_url);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("document");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        let metadata = UploadMetadata::for_file_type("application/pdf");

        let report = storage
            .upload("uploads/user-42/a.pdf", &path, &metadata)
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.status, Some(200));

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /b/demo.appspot.com/o?uploadType=media&name=uploads%2Fuser-42%2Fa.pdf "));
        let lowered = request.to_ascii_lowercase();
        assert!(lowered.contains("authorization: firebase token-abc"));
        assert!(lowered.contains("content-type: application/pdf"));
        assert!(request.ends_with("%PDF-1.7\n"));
    }

    #[tokio::test]
    async fn test_rejected_upload_is_reported_not_raised() {
        let auth = signed_in_auth().await;
        let (base_url, _request) = serve_once("503 Service Unavailable", "{}").await;
        let storage =
            FirebaseStorage::new(reqwest::Client::new(), "demo.appspot.com", auth).with_base_url(&base_url);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("document");
        std::fs::write(&path, b"hello").unwrap();

        let report = storage
            .upload("uploads/user-42/a.txt", &path, &UploadMetadata::default())
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.status, Some(503));
        assert!(report.message.is_some());
    }

    #[tokio::test]
    async fn test_upload_requires_session() {
        let auth = Arc::new(FirebaseAuth::new(reqwest::Client::new(), "key-1"));
        let storage = FirebaseStorage::new(reqwest::Client::new(), "demo.appspot.com", auth);

        let err = storage
            .upload("uploads/x/y.txt", Path::new("/nonexistent"), &UploadMetadata::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::NotSignedIn));
    }

    #[test]
    fn test_clients_need_key_and_bucket() {
        assert!(matches!(
            firebase_clients(&config(None, Some("bucket"))),
            Err(RemoteError::NotConfigured(_))
        ));
        assert!(matches!(
            firebase_clients(&config(Some("key"), None)),
            Err(RemoteError::NotConfigured(_))
        ));
        assert!(firebase_clients(&config(Some("key"), Some("bucket"))).is_ok());
    }
}
