//! Document Resolver Library
//!
//! Resolves an arbitrary source reference into something a viewer can show:
//! a local rendering, a cloud viewer URL, or a typed failure.
//!
//! # Modules
//!
//! - `document`: Request/response records and source references
//! - `cache`: Single-slot on-disk content cache
//! - `sniff`: Layered MIME type detection
//! - `loader`: Loader variants (metadata, ODF, PDF, online)
//! - `remote`: Eligibility policy and remote escalation protocol
//! - `recent`: Recent-documents record
//! - `pipeline`: Ordered dispatch and the background worker

pub mod cache;
pub mod config;
pub mod document;
pub mod loader;
pub mod pipeline;
pub mod recent;
pub mod remote;
pub mod sniff;
