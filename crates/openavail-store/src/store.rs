//! SQLite-backed document/job store. All writes go through one connection
//! behind a mutex; the claim path additionally runs inside an immediate
//! transaction so exactly one caller can move a document out of `queued`.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use crate::types::{
    Document, DocumentStatus, Job, JobLogEntry, JobProgress, JobStatus, LogLevel,
};
use crate::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id           TEXT PRIMARY KEY,
    filename     TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size         INTEGER NOT NULL,
    checksum     TEXT NOT NULL,
    blob_ref     TEXT NOT NULL,
    status       TEXT NOT NULL,
    job_id       TEXT,
    user_id      TEXT,
    analysis     TEXT,
    error        TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
CREATE INDEX IF NOT EXISTS idx_documents_job ON documents(job_id);
CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created_at);

CREATE TABLE IF NOT EXISTS jobs (
    id               TEXT PRIMARY KEY,
    status           TEXT NOT NULL,
    progress_current INTEGER NOT NULL DEFAULT 0,
    progress_total   INTEGER NOT NULL,
    user_id          TEXT,
    created_at       TEXT NOT NULL,
    started_at       TEXT,
    finished_at      TEXT
);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
CREATE INDEX IF NOT EXISTS idx_jobs_created ON jobs(created_at);

CREATE TABLE IF NOT EXISTS job_logs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id      TEXT NOT NULL,
    ts          TEXT NOT NULL,
    level       TEXT NOT NULL,
    op          TEXT,
    message     TEXT,
    doc_id      TEXT,
    duration_ms INTEGER
);
CREATE INDEX IF NOT EXISTS idx_job_logs_job ON job_logs(job_id);
";

pub struct DocStore {
    conn: Mutex<Connection>,
}

fn now_str() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl DocStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Poisoned)
    }

    // ── documents ───────────────────────────────────────────────────────

    pub fn create_document(
        &self,
        filename: &str,
        content_type: &str,
        size: u64,
        checksum: &str,
        blob_ref: &str,
        user_id: Option<&str>,
    ) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = now_str();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (id, filename, content_type, size, checksum, blob_ref, status, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'uploaded', ?7, ?8, ?8)",
            params![id, filename, content_type, size as i64, checksum, blob_ref, user_id, now],
        )?;
        drop(conn);
        self.get_document(&id)
    }

    pub fn get_document(&self, id: &str) -> Result<Document, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, filename, content_type, size, checksum, blob_ref, status, job_id, user_id, analysis, error, created_at, updated_at
             FROM documents WHERE id = ?1",
            params![id],
            row_to_document,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("document {id}")))
    }

    pub fn list_documents(&self, status: Option<DocumentStatus>) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let sql = "SELECT id, filename, content_type, size, checksum, blob_ref, status, job_id, user_id, analysis, error, created_at, updated_at
                   FROM documents WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at, rowid";
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![status.map(|s| s.as_str())], row_to_document)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Find a document by content checksum, for upload dedup.
    pub fn find_by_checksum(&self, checksum: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, filename, content_type, size, checksum, blob_ref, status, job_id, user_id, analysis, error, created_at, updated_at
                 FROM documents WHERE checksum = ?1 ORDER BY created_at LIMIT 1",
                params![checksum],
                row_to_document,
            )
            .optional()?)
    }

    pub fn set_document_done(
        &self,
        id: &str,
        analysis: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let n = conn.execute(
            "UPDATE documents SET status = 'done', analysis = ?2, error = NULL, updated_at = ?3
             WHERE id = ?1 AND status = 'processing'",
            params![id, analysis.to_string(), now_str()],
        )?;
        if n == 0 {
            return Err(StoreError::InvalidTransition(format!(
                "document {id} is not processing"
            )));
        }
        Ok(())
    }

    pub fn set_document_error(&self, id: &str, error: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let n = conn.execute(
            "UPDATE documents SET status = 'error', error = ?2, updated_at = ?3
             WHERE id = ?1 AND status IN ('processing', 'queued', 'uploaded')",
            params![id, error, now_str()],
        )?;
        if n == 0 {
            return Err(StoreError::InvalidTransition(format!(
                "document {id} is already terminal"
            )));
        }
        Ok(())
    }

    /// Operator recovery: put a stuck (`processing`) or failed document
    /// back on the queue.
    pub fn requeue_document(&self, id: &str) -> Result<Document, StoreError> {
        {
            let conn = self.lock()?;
            let n = conn.execute(
                "UPDATE documents SET status = 'queued', error = NULL, updated_at = ?2
                 WHERE id = ?1 AND status IN ('processing', 'error')",
                params![id, now_str()],
            )?;
            if n == 0 {
                return Err(StoreError::InvalidTransition(format!(
                    "document {id} cannot be requeued from its current status"
                )));
            }
        }
        self.get_document(id)
    }

    // ── jobs ────────────────────────────────────────────────────────────

    /// Create a job over a set of uploaded documents and queue them all.
    pub fn create_job(
        &self,
        document_ids: &[String],
        user_id: Option<&str>,
    ) -> Result<Job, StoreError> {
        if document_ids.is_empty() {
            return Err(StoreError::InvalidTransition("job needs documents".into()));
        }
        let job_id = Uuid::new_v4().to_string();
        let now = now_str();
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO jobs (id, status, progress_current, progress_total, user_id, created_at)
                 VALUES (?1, 'pending', 0, ?2, ?3, ?4)",
                params![job_id, document_ids.len() as i64, user_id, now],
            )?;
            for doc_id in document_ids {
                let n = tx.execute(
                    "UPDATE documents SET status = 'queued', job_id = ?2, updated_at = ?3
                     WHERE id = ?1 AND status = 'uploaded'",
                    params![doc_id, job_id, now],
                )?;
                if n == 0 {
                    return Err(StoreError::InvalidTransition(format!(
                        "document {doc_id} is not in uploaded state"
                    )));
                }
            }
            tx.commit()?;
        }
        self.get_job(&job_id)
    }

    pub fn get_job(&self, id: &str) -> Result<Job, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, status, progress_current, progress_total, user_id, created_at, started_at, finished_at
             FROM jobs WHERE id = ?1",
            params![id],
            row_to_job,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("job {id}")))
    }

    pub fn running_job(&self) -> Result<Option<Job>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, status, progress_current, progress_total, user_id, created_at, started_at, finished_at
                 FROM jobs WHERE status = 'running' ORDER BY created_at, rowid LIMIT 1",
                [],
                row_to_job,
            )
            .optional()?)
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, status, progress_current, progress_total, user_id, created_at, started_at, finished_at
             FROM jobs ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map([], row_to_job)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Atomically claim the next queued document. Promotes the oldest
    /// pending job to running first if no job is running. Returns `None`
    /// when there is nothing to do.
    pub fn claim_next(&self) -> Result<Option<Document>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut active_job: Option<String> = tx
            .query_row(
                "SELECT id FROM jobs WHERE status = 'running' ORDER BY created_at, rowid LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        if active_job.is_none() {
            // FIFO promotion of the oldest pending job.
            let pending: Option<String> = tx
                .query_row(
                    "SELECT id FROM jobs WHERE status = 'pending' ORDER BY created_at, rowid LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(ref id) = pending {
                tx.execute(
                    "UPDATE jobs SET status = 'running', started_at = ?2 WHERE id = ?1 AND status = 'pending'",
                    params![id, now_str()],
                )?;
                tracing::info!(job_id = %id, "promoted pending job to running");
            }
            active_job = pending;
        }

        let candidate: Option<String> = match active_job {
            Some(ref job_id) => tx
                .query_row(
                    "SELECT id FROM documents WHERE status = 'queued' AND job_id = ?1
                     ORDER BY created_at, rowid LIMIT 1",
                    params![job_id],
                    |row| row.get(0),
                )
                .optional()?,
            None => tx
                .query_row(
                    "SELECT id FROM documents WHERE status = 'queued' AND job_id IS NULL
                     ORDER BY created_at, rowid LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?,
        };

        let Some(doc_id) = candidate else {
            tx.commit()?;
            return Ok(None);
        };

        // The guarded status predicate makes this a true claim: only one
        // transaction can observe the row still queued.
        let claimed = tx
            .query_row(
                "UPDATE documents SET status = 'processing', updated_at = ?2
                 WHERE id = ?1 AND status = 'queued'
                 RETURNING id, filename, content_type, size, checksum, blob_ref, status, job_id, user_id, analysis, error, created_at, updated_at",
                params![doc_id, now_str()],
                row_to_document,
            )
            .optional()?;
        tx.commit()?;
        Ok(claimed)
    }

    /// Advance job progress by one processed document (success or failure
    /// alike). Marks the job done when progress reaches its total and then
    /// promotes the next pending job.
    pub fn advance_progress(&self, job_id: &str) -> Result<Job, StoreError> {
        let job = {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "UPDATE jobs SET progress_current = progress_current + 1
                 WHERE id = ?1 AND progress_current < progress_total",
                params![job_id],
            )?;
            let job = tx
                .query_row(
                    "SELECT id, status, progress_current, progress_total, user_id, created_at, started_at, finished_at
                     FROM jobs WHERE id = ?1",
                    params![job_id],
                    row_to_job,
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("job {job_id}")))?;

            if job.progress.current >= job.progress.total && job.status == JobStatus::Running {
                tx.execute(
                    "UPDATE jobs SET status = 'done', finished_at = ?2 WHERE id = ?1",
                    params![job_id, now_str()],
                )?;
                tracing::info!(job_id, total = job.progress.total, "job completed");
            }
            tx.commit()?;
            job
        };
        if job.progress.current >= job.progress.total {
            // Completion opens the slot for the next job.
            let _ = self.claim_slot_for_next_job()?;
            return self.get_job(job_id);
        }
        Ok(job)
    }

    /// Promote the oldest pending job if no job is running. Returns the
    /// promoted job id, if any.
    fn claim_slot_for_next_job(&self) -> Result<Option<String>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let running: Option<String> = tx
            .query_row(
                "SELECT id FROM jobs WHERE status = 'running' LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if running.is_some() {
            tx.commit()?;
            return Ok(None);
        }
        let pending: Option<String> = tx
            .query_row(
                "SELECT id FROM jobs WHERE status = 'pending' ORDER BY created_at, rowid LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(ref id) = pending {
            tx.execute(
                "UPDATE jobs SET status = 'running', started_at = ?2 WHERE id = ?1 AND status = 'pending'",
                params![id, now_str()],
            )?;
        }
        tx.commit()?;
        Ok(pending)
    }

    /// Cancel a job: the job goes to `error` and all its not-yet-claimed
    /// documents follow. Documents already `processing` finish their
    /// current step and observe the cancellation afterwards.
    pub fn cancel_job(&self, job_id: &str) -> Result<Job, StoreError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let n = tx.execute(
                "UPDATE jobs SET status = 'error', finished_at = ?2
                 WHERE id = ?1 AND status IN ('pending', 'running')",
                params![job_id, now_str()],
            )?;
            if n == 0 {
                return Err(StoreError::InvalidTransition(format!(
                    "job {job_id} is already terminal"
                )));
            }
            tx.execute(
                "UPDATE documents SET status = 'error', error = 'job cancelled', updated_at = ?2
                 WHERE job_id = ?1 AND status IN ('uploaded', 'queued')",
                params![job_id, now_str()],
            )?;
            tx.commit()?;
        }
        let _ = self.claim_slot_for_next_job()?;
        self.get_job(job_id)
    }

    // ── job log ─────────────────────────────────────────────────────────

    pub fn append_log(&self, entry: &JobLogEntry) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO job_logs (job_id, ts, level, op, message, doc_id, duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.job_id,
                entry.ts.to_rfc3339_opts(SecondsFormat::Micros, true),
                entry.level.as_str(),
                entry.op,
                entry.message,
                entry.doc_id,
                entry.duration_ms.map(|d| d as i64),
            ],
        )?;
        Ok(())
    }

    pub fn list_logs(&self, job_id: &str) -> Result<Vec<JobLogEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT job_id, ts, level, op, message, doc_id, duration_ms
             FROM job_logs WHERE job_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![job_id], |row| {
            Ok(JobLogEntry {
                job_id: row.get(0)?,
                ts: parse_ts(&row.get::<_, String>(1)?),
                level: match row.get::<_, String>(2)?.as_str() {
                    "warn" => LogLevel::Warn,
                    "error" => LogLevel::Error,
                    _ => LogLevel::Info,
                },
                op: row.get(3)?,
                message: row.get(4)?,
                doc_id: row.get(5)?,
                duration_ms: row.get::<_, Option<i64>>(6)?.map(|d| d as u64),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let status: String = row.get(6)?;
    let analysis: Option<String> = row.get(9)?;
    Ok(Document {
        id: row.get(0)?,
        filename: row.get(1)?,
        content_type: row.get(2)?,
        size: row.get::<_, i64>(3)? as u64,
        checksum: row.get(4)?,
        blob_ref: row.get(5)?,
        status: DocumentStatus::parse(&status).unwrap_or(DocumentStatus::Error),
        job_id: row.get(7)?,
        user_id: row.get(8)?,
        analysis: analysis.and_then(|a| serde_json::from_str(&a).ok()),
        error: row.get(10)?,
        created_at: parse_ts(&row.get::<_, String>(11)?),
        updated_at: parse_ts(&row.get::<_, String>(12)?),
    })
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let status: String = row.get(1)?;
    Ok(Job {
        id: row.get(0)?,
        status: JobStatus::parse(&status).unwrap_or(JobStatus::Error),
        progress: JobProgress {
            current: row.get::<_, i64>(2)? as u32,
            total: row.get::<_, i64>(3)? as u32,
        },
        user_id: row.get(4)?,
        created_at: parse_ts(&row.get::<_, String>(5)?),
        started_at: row.get::<_, Option<String>>(6)?.map(|s| parse_ts(&s)),
        finished_at: row.get::<_, Option<String>>(7)?.map(|s| parse_ts(&s)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store_with_docs(n: usize) -> (DocStore, Vec<String>) {
        let store = DocStore::open_in_memory().unwrap();
        let ids: Vec<String> = (0..n)
            .map(|i| {
                store
                    .create_document(
                        &format!("paper{i}.pdf"),
                        "application/pdf",
                        1024,
                        &format!("sha256:{i}"),
                        &format!("blob/{i}"),
                        None,
                    )
                    .unwrap()
                    .id
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn upload_then_queue_then_claim() {
        let (store, ids) = store_with_docs(2);
        let job = store.create_job(&ids, None).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress.total, 2);

        let claimed = store.claim_next().unwrap().expect("a claim");
        assert_eq!(claimed.status, DocumentStatus::Processing);
        assert_eq!(claimed.id, ids[0], "oldest first");
        assert_eq!(store.get_job(&job.id).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn each_document_is_claimed_exactly_once() {
        let (store, ids) = store_with_docs(8);
        store.create_job(&ids, None).unwrap();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let mut mine = Vec::new();
                while let Some(doc) = store.claim_next().unwrap() {
                    mine.push(doc.id);
                }
                mine
            }));
        }
        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(all, expected, "every doc claimed exactly once");
    }

    #[test]
    fn progress_completion_marks_job_done() {
        let (store, ids) = store_with_docs(2);
        let job = store.create_job(&ids, None).unwrap();

        for _ in 0..2 {
            let doc = store.claim_next().unwrap().unwrap();
            store
                .set_document_done(&doc.id, &serde_json::json!({"ok": true}))
                .unwrap();
            store.advance_progress(&job.id).unwrap();
        }

        let job = store.get_job(&job.id).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.progress.current, job.progress.total);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn progress_advances_on_failure_too() {
        let (store, ids) = store_with_docs(1);
        let job = store.create_job(&ids, None).unwrap();
        let doc = store.claim_next().unwrap().unwrap();
        store.set_document_error(&doc.id, "analysis blew up").unwrap();
        let job = store.advance_progress(&job.id).unwrap();
        assert_eq!(job.status, JobStatus::Done);
    }

    #[test]
    fn second_job_waits_until_first_finishes() {
        let (store, ids) = store_with_docs(2);
        let job_a = store.create_job(&ids[..1].to_vec(), None).unwrap();
        let job_b = store.create_job(&ids[1..].to_vec(), None).unwrap();

        // Job A wins the slot; B's document stays queued.
        let doc = store.claim_next().unwrap().unwrap();
        assert_eq!(doc.job_id.as_deref(), Some(job_a.id.as_str()));
        assert!(store.claim_next().unwrap().is_none(), "B must wait");
        assert_eq!(store.get_job(&job_b.id).unwrap().status, JobStatus::Pending);

        store.set_document_done(&doc.id, &serde_json::json!({})).unwrap();
        store.advance_progress(&job_a.id).unwrap();

        // A done; B is promoted and its document claimable.
        assert_eq!(store.get_job(&job_b.id).unwrap().status, JobStatus::Running);
        let doc_b = store.claim_next().unwrap().expect("B's doc");
        assert_eq!(doc_b.job_id.as_deref(), Some(job_b.id.as_str()));
    }

    #[test]
    fn at_most_one_job_runs() {
        let (store, ids) = store_with_docs(3);
        for id in &ids {
            store.create_job(&[id.clone()], None).unwrap();
        }
        store.claim_next().unwrap().unwrap();
        let running: Vec<_> = store
            .list_jobs()
            .unwrap()
            .into_iter()
            .filter(|j| j.status == JobStatus::Running)
            .collect();
        assert_eq!(running.len(), 1);
    }

    #[test]
    fn cancel_errors_unclaimed_documents() {
        let (store, ids) = store_with_docs(2);
        let job = store.create_job(&ids, None).unwrap();
        let claimed = store.claim_next().unwrap().unwrap();

        let job = store.cancel_job(&job.id).unwrap();
        assert_eq!(job.status, JobStatus::Error);

        // Unclaimed doc errored; claimed doc untouched until its worker
        // finishes.
        let other_id = ids.iter().find(|id| **id != claimed.id).unwrap();
        assert_eq!(
            store.get_document(other_id).unwrap().status,
            DocumentStatus::Error
        );
        assert_eq!(
            store.get_document(&claimed.id).unwrap().status,
            DocumentStatus::Processing
        );
    }

    #[test]
    fn requeue_recovers_stuck_documents() {
        let (store, ids) = store_with_docs(1);
        store.create_job(&ids, None).unwrap();
        let doc = store.claim_next().unwrap().unwrap();

        // Simulate a crashed worker: the doc is stuck processing.
        let recovered = store.requeue_document(&doc.id).unwrap();
        assert_eq!(recovered.status, DocumentStatus::Queued);
        assert_eq!(store.claim_next().unwrap().unwrap().id, doc.id);
    }

    #[test]
    fn requeue_rejects_done_documents() {
        let (store, ids) = store_with_docs(1);
        store.create_job(&ids, None).unwrap();
        let doc = store.claim_next().unwrap().unwrap();
        store.set_document_done(&doc.id, &serde_json::json!({})).unwrap();
        assert!(store.requeue_document(&doc.id).is_err());
    }

    #[test]
    fn checksum_dedup_finds_existing_upload() {
        let (store, _) = store_with_docs(1);
        assert!(store.find_by_checksum("sha256:0").unwrap().is_some());
        assert!(store.find_by_checksum("sha256:missing").unwrap().is_none());
    }

    #[test]
    fn log_is_append_only_and_ordered() {
        let (store, ids) = store_with_docs(1);
        let job = store.create_job(&ids, None).unwrap();
        for (i, level) in [LogLevel::Info, LogLevel::Warn].iter().enumerate() {
            store
                .append_log(&JobLogEntry {
                    job_id: job.id.clone(),
                    ts: Utc::now(),
                    level: *level,
                    op: Some("analyze".into()),
                    message: Some(format!("step {i}")),
                    doc_id: Some(ids[0].clone()),
                    duration_ms: Some(10),
                })
                .unwrap();
        }
        let logs = store.list_logs(&job.id).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message.as_deref(), Some("step 0"));
        assert_eq!(logs[1].level, LogLevel::Warn);
    }
}
