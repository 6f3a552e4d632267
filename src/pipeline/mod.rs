//! Document resolution pipeline
//!
//! `DocumentPipeline` runs the loader chain for one request;
//! `PipelineService` puts it behind a queue so callers on any task can
//! submit requests and await exactly one outcome each.

mod dispatch;
mod worker;

pub use dispatch::{DocumentPipeline, PipelineBuilder};
pub use worker::{PipelineHandle, PipelineService};
