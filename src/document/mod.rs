//! Request and response records
//!
//! `Options` threads request state through the loader chain; every loader
//! answers with exactly one `LoadOutcome`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use document_resolver::document::{Options, SourceReference};
//!
//! let options = Options::new(SourceReference::parse("/tmp/report.pdf"));
//! let outcome = pipeline.open(options).await;
//! ```

mod source;
mod types;

pub use source::{ContentResolver, FileSystemResolver, SourceFingerprint, SourceReference};
pub use types::{
    DocumentPart, LoadFailure, LoadOutcome, LoadResult, LoaderType, Options, UNKNOWN,
};
