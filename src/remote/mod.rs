//! Remote viewer escalation
//!
//! Documents no local loader can show may be uploaded and displayed by a
//! cloud viewer, if the eligibility policy admits their type.
//!
//! # Architecture
//!
//! ```text
//! EligibilityPolicy ──admits──▶ RemoteEscalation
//!                                 │
//!                 ┌───────────────┼───────────────┐
//!                 ▼               ▼               ▼
//!            AuthClient     StorageClient     ViewerUrls
//!           (anonymous)       (upload)      (Google / Office)
//! ```

mod client;
mod firebase;
pub mod policy;
mod protocol;
mod viewer;

pub use client::{
    AuthClient, RemoteClients, RemoteError, StorageClient, UploadMetadata, UploadReport,
};
pub use firebase::{firebase_clients, FirebaseAuth, FirebaseStorage};
pub use policy::{EligibilityPolicy, MIME_BLACKLIST, MIME_WHITELIST};
pub use protocol::{EscalationRequest, EscalationState, RemoteEscalation};
pub use viewer::{
    ViewerTemplate, ViewerUrls, DEFAULT_DOWNLOAD_ENDPOINT, GENERIC_VIEWER_TEMPLATE,
    OFFICE_VIEWER_TEMPLATE,
};

#[cfg(test)]
pub(crate) use protocol::mocks;
