//! Pipeline worker
//!
//! Requests are queued to a single task owning the pipeline, so loads never
//! overlap on the shared cache slot. Every request gets exactly one reply.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::dispatch::DocumentPipeline;
use crate::document::{LoadFailure, LoadOutcome, LoaderType, Options};
use crate::loader::LoaderError;

const QUEUE_DEPTH: usize = 16;

enum Command {
    Open {
        options: Options,
        reply: oneshot::Sender<LoadOutcome>,
    },
    SaveEdits {
        options: Options,
        diff: String,
        output_prefix: PathBuf,
        reply: oneshot::Sender<Result<PathBuf, LoaderError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Spawns the worker task
pub struct PipelineService;

impl PipelineService {
    pub fn spawn(pipeline: DocumentPipeline) -> (PipelineHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Command>(QUEUE_DEPTH);

        let handle = tokio::spawn(async move {
            tracing::debug!("Pipeline worker started");
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Open { options, reply } => {
                        let source = options.source.clone();
                        let outcome = pipeline.open(options).await;
                        if reply.send(outcome).is_err() {
                            tracing::warn!(source = %source, "Requester went away before the reply");
                        }
                    }
                    Command::SaveEdits {
                        options,
                        diff,
                        output_prefix,
                        reply,
                    } => {
                        let saved = pipeline.save_edits(&options, diff, output_prefix).await;
                        if reply.send(saved).is_err() {
                            tracing::warn!(source = %options.source, "Requester went away before the reply");
                        }
                    }
                    Command::Close { reply } => {
                        pipeline.close();
                        let _ = reply.send(());
                        tracing::debug!("Pipeline worker closed");
                        return;
                    }
                }
            }
            pipeline.close();
            tracing::debug!("Pipeline worker stopped: all handles dropped");
        });

        (PipelineHandle { tx }, handle)
    }
}

/// Cloneable entry point to a running worker
#[derive(Clone)]
pub struct PipelineHandle {
    tx: mpsc::Sender<Command>,
}

impl PipelineHandle {
    /// Queue a request and wait for its outcome
    pub async fn open(&self, options: Options) -> LoadOutcome {
        let (reply, rx) = oneshot::channel();
        let command = Command::Open {
            options: options.clone(),
            reply,
        };

        if self.tx.send(command).await.is_err() {
            return Err(unavailable(options));
        }
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(source = %options.source, "Pipeline worker dropped a request");
                Err(unavailable(options))
            }
        }
    }

    /// Queue a save of edits to the document currently open
    pub async fn save_edits(
        &self,
        options: Options,
        diff: String,
        output_prefix: PathBuf,
    ) -> Result<PathBuf, LoaderError> {
        let (reply, rx) = oneshot::channel();
        let command = Command::SaveEdits {
            options,
            diff,
            output_prefix,
            reply,
        };

        if self.tx.send(command).await.is_err() {
            return Err(LoaderError::WorkerUnavailable);
        }
        rx.await.unwrap_or(Err(LoaderError::WorkerUnavailable))
    }

    /// Close every loader and stop the worker
    ///
    /// Requests queued before the close are still answered.
    pub async fn close(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Close { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

fn unavailable(options: Options) -> LoadFailure {
    LoadFailure::new(options, LoaderType::Metadata, LoaderError::WorkerUnavailable)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::ContentCache;
    use crate::document::SourceReference;

    fn spawn(dir: &tempfile::TempDir) -> (PipelineHandle, JoinHandle<()>) {
        let cache = Arc::new(ContentCache::new(dir.path().join("cache")).unwrap());
        PipelineService::spawn(DocumentPipeline::builder(cache).build())
    }

    fn pdf_request(dir: &tempfile::TempDir, name: &str) -> Options {
        let path = dir.path().join(name);
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        Options::new(SourceReference::from_path(path))
    }

    #[tokio::test]
    async fn test_requests_are_answered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, _task) = spawn(&dir);

        let first = handle.open(pdf_request(&dir, "a.pdf"));
        let second = handle.open(pdf_request(&dir, "b.pdf"));
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().options.filename, "a.pdf");
        assert_eq!(second.unwrap().options.filename, "b.pdf");
    }

    #[tokio::test]
    async fn test_open_after_close_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = spawn(&dir);

        handle.close().await;
        task.await.unwrap();

        assert!(handle.is_closed());
        let failure = handle.open(pdf_request(&dir, "late.pdf")).await.unwrap_err();
        assert!(matches!(failure.error, LoaderError::WorkerUnavailable));
        assert_eq!(failure.options.filename, crate::document::UNKNOWN);

        let request = Options::new(SourceReference::parse("/tmp/a.odt"));
        let err = handle
            .save_edits(request, String::new(), dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::WorkerUnavailable));
    }

    #[tokio::test]
    async fn test_save_edits_is_answered() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, _task) = spawn(&dir);

        let result = handle.open(pdf_request(&dir, "a.pdf")).await.unwrap();
        let err = handle
            .save_edits(result.options, "<p/>".to_string(), dir.path().join("out"))
            .await
            .unwrap_err();

        assert!(matches!(err, LoaderError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_worker_stops_when_handles_drop() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = spawn(&dir);

        drop(handle);

        task.await.unwrap();
    }
}
