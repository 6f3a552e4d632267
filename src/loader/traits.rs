//! Loader trait
//!
//! One capability interface shared by every loader variant.

use async_trait::async_trait;

use crate::document::{LoadOutcome, LoaderType, Options};

/// A stage of the document pipeline
///
/// `load` always produces exactly one outcome: a result carrying at least
/// one part, or a failure carrying the cause.
#[async_trait]
pub trait FileLoader: Send + Sync {
    /// Variant tag reported in results
    fn loader_type(&self) -> LoaderType;

    /// Whether this loader handles the request. Pure.
    fn is_supported(&self, options: &Options) -> bool;

    /// Perform the variant's work
    async fn load(&self, options: &mut Options) -> LoadOutcome;

    /// Release variant-owned resources
    ///
    /// Idempotent, performs no I/O, safe on a loader that was never used.
    fn close(&self);
}
