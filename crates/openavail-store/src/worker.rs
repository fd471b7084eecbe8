//! The worker pool: a fixed set of tasks polling the store, claiming one
//! document at a time, running the injected analyzer, and advancing job
//! progress whatever the outcome.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::blob::BlobStore;
use crate::store::DocStore;
use crate::types::{Document, JobLogEntry, JobStatus, LogLevel};

const ERROR_TAIL_CHARS: usize = 2000;

/// Analysis failure as stored on a document.
#[derive(Debug, Clone)]
pub struct AnalyzeFailure {
    /// Short machine-readable kind, e.g. `invalid_pdf`.
    pub kind: String,
    pub detail: String,
}

impl AnalyzeFailure {
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}

/// The single capability the pool needs from the analysis side.
pub trait DocumentAnalyzer: Send + Sync {
    fn analyze<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, AnalyzeFailure>> + Send + 'a>>;
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl WorkerPool {
    pub fn spawn(
        store: Arc<DocStore>,
        blobs: Arc<BlobStore>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        config: WorkerConfig,
        cancel: CancellationToken,
    ) -> Self {
        let mut handles = Vec::new();
        for worker_id in 0..config.concurrency.max(1) {
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&store),
                Arc::clone(&blobs),
                Arc::clone(&analyzer),
                config.poll_interval,
                cancel.clone(),
            )));
        }
        Self { handles, cancel }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal shutdown and wait for workers to finish their current
    /// document.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    store: Arc<DocStore>,
    blobs: Arc<BlobStore>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    tracing::debug!(worker_id, "worker started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let claimed = match store.claim_next() {
            Ok(doc) => doc,
            Err(err) => {
                tracing::error!(worker_id, %err, "claim failed");
                None
            }
        };
        match claimed {
            Some(doc) => {
                process_document(worker_id, &store, &blobs, analyzer.as_ref(), doc).await;
            }
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }
    }
    tracing::debug!(worker_id, "worker stopped");
}

async fn process_document(
    worker_id: usize,
    store: &DocStore,
    blobs: &BlobStore,
    analyzer: &dyn DocumentAnalyzer,
    doc: Document,
) {
    let started = Instant::now();
    tracing::info!(worker_id, doc_id = %doc.id, filename = %doc.filename, "processing document");

    let outcome = run_analysis(blobs, analyzer, &doc).await;
    let cancelled = job_was_cancelled(store, doc.job_id.as_deref());
    let duration_ms = started.elapsed().as_millis() as u64;

    let (level, message) = match (&outcome, cancelled) {
        (_, true) => {
            let _ = store.set_document_error(&doc.id, "job cancelled");
            (LogLevel::Warn, "cancelled after current step".to_string())
        }
        (Ok(analysis), false) => match store.set_document_done(&doc.id, analysis) {
            Ok(()) => (LogLevel::Info, "analysis complete".to_string()),
            Err(err) => (LogLevel::Error, format!("failed to persist result: {err}")),
        },
        (Err(failure), false) => {
            let stored = format!("{}: {}", failure.kind, tail(&failure.detail, ERROR_TAIL_CHARS));
            if let Err(err) = store.set_document_error(&doc.id, &stored) {
                tracing::error!(doc_id = %doc.id, %err, "failed to store document error");
            }
            (LogLevel::Error, stored)
        }
    };

    // Progress always advances, success or failure, so the job reaches a
    // terminal state.
    if let Some(ref job_id) = doc.job_id {
        if let Err(err) = store.advance_progress(job_id) {
            tracing::error!(job_id, %err, "failed to advance progress");
        }
        let _ = store.append_log(&JobLogEntry {
            job_id: job_id.clone(),
            ts: Utc::now(),
            level,
            op: Some("analyze".into()),
            message: Some(message),
            doc_id: Some(doc.id.clone()),
            duration_ms: Some(duration_ms),
        });
    }
}

async fn run_analysis(
    blobs: &BlobStore,
    analyzer: &dyn DocumentAnalyzer,
    doc: &Document,
) -> Result<serde_json::Value, AnalyzeFailure> {
    let bytes = blobs
        .get(&doc.blob_ref)
        .map_err(|e| AnalyzeFailure::new("blob_missing", e.to_string()))?;

    // The temp file lives for exactly this analysis; drop deletes it on
    // every exit path.
    let tmp = tempfile::NamedTempFile::new()
        .map_err(|e| AnalyzeFailure::new("io", e.to_string()))?;
    std::fs::write(tmp.path(), &bytes).map_err(|e| AnalyzeFailure::new("io", e.to_string()))?;

    analyzer.analyze(tmp.path()).await
}

fn job_was_cancelled(store: &DocStore, job_id: Option<&str>) -> bool {
    match job_id {
        Some(id) => matches!(
            store.get_job(id).map(|j| j.status),
            Ok(JobStatus::Error)
        ),
        None => false,
    }
}

/// Last `n` chars of a long error text.
fn tail(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n.saturating_sub(1)) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
