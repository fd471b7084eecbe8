//! Document/job persistence and the worker pool that drains the queue.
//!
//! The store is SQLite-backed and the claim operation is the sole
//! concurrency-safety mechanism: one guarded update moves a document from
//! `queued` to `processing`, so N concurrent workers can poll without any
//! external lock.

use thiserror::Error;

pub mod blob;
pub mod store;
pub mod types;
pub mod worker;

pub use blob::BlobStore;
pub use store::DocStore;
pub use types::{
    Document, DocumentStatus, Job, JobLogEntry, JobProgress, JobStatus, LogLevel,
};
pub use worker::{AnalyzeFailure, DocumentAnalyzer, WorkerConfig, WorkerPool};

/// Reduce an uploaded filename to a safe basename: path components and
/// control characters stripped, length capped.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim()
        .trim_start_matches('.');
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .take(200)
        .collect();
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),
    #[error("blob of {size} bytes exceeds the {max} byte limit")]
    BlobTooLarge { size: u64, max: u64 },
    #[error("store lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::sanitize_filename;

    #[test]
    fn path_components_are_stripped() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\uploads\paper.pdf"), "paper.pdf");
    }

    #[test]
    fn hostile_characters_are_replaced() {
        assert_eq!(sanitize_filename("a:b?c.pdf"), "a_b_c.pdf");
    }

    #[test]
    fn empty_names_get_a_default() {
        assert_eq!(sanitize_filename(""), "upload.pdf");
        assert_eq!(sanitize_filename("..."), "upload.pdf");
    }
}
