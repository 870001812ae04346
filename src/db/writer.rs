//! Single-writer persistence channel
//!
//! The catalog store does not support safe concurrent writers, so every
//! mutation from every scanner worker is expressed as a `StoreOp` and
//! funneled through one dedicated writer thread that exclusively owns the
//! SQLite connection. Ops are buffered and committed in batched
//! transactions; an idle timeout triggers a periodic commit so progress
//! survives long gaps, and a stop sentinel drains everything before the
//! thread exits.
//!
//! Each commit runs inside a bounded retry loop. A transient SQLite error
//! is retried with backoff; exhaustion halts the writer with an explicit
//! error that surfaces at `finish()` instead of silently dropping records.

use crate::db::schema::{self, keys};
use crate::error::{DbError, DbResult};
use crate::fs::{DirectoryRecord, FailureRecord, FileRecord, SymlinkRecord};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// How long the writer waits for an op before committing pending work
const COMMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Attempts per commit before the writer gives up
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Base backoff between commit attempts
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// A store mutation, as emitted by a scanner worker
#[derive(Debug)]
pub enum StoreOp {
    /// Upsert a hashed file
    File(FileRecord),

    /// Upsert a completed directory pass
    Directory(DirectoryRecord),

    /// Upsert a symlink
    Symlink(SymlinkRecord),

    /// Upsert a per-directory failure
    Failure(FailureRecord),

    /// Drain pending ops and stop the writer
    Stop,
}

/// Statistics about write operations
#[derive(Debug, Default)]
pub struct WriterStats {
    /// Files written
    pub files_written: AtomicU64,

    /// Directory passes written
    pub dirs_written: AtomicU64,

    /// Symlinks written
    pub symlinks_written: AtomicU64,

    /// Failures written
    pub failures_written: AtomicU64,

    /// Batches committed
    pub batches_committed: AtomicU64,

    /// Commit attempts that had to be retried
    pub commit_retries: AtomicU64,
}

impl WriterStats {
    /// Total records written across all relations
    pub fn records_written(&self) -> u64 {
        self.files_written.load(Ordering::Relaxed)
            + self.dirs_written.load(Ordering::Relaxed)
            + self.symlinks_written.load(Ordering::Relaxed)
            + self.failures_written.load(Ordering::Relaxed)
    }
}

/// Handle for sending ops to the writer (clone one per worker)
#[derive(Clone)]
pub struct SinkHandle {
    sender: Sender<StoreOp>,
    stats: Arc<WriterStats>,
}

impl SinkHandle {
    /// Send a file record to be written
    pub fn record_file(&self, record: FileRecord) -> DbResult<()> {
        self.send(StoreOp::File(record))
    }

    /// Send a directory record to be written
    pub fn record_directory(&self, record: DirectoryRecord) -> DbResult<()> {
        self.send(StoreOp::Directory(record))
    }

    /// Send a symlink record to be written
    pub fn record_symlink(&self, record: SymlinkRecord) -> DbResult<()> {
        self.send(StoreOp::Symlink(record))
    }

    /// Send a failure record to be written
    pub fn record_failure(&self, record: FailureRecord) -> DbResult<()> {
        self.send(StoreOp::Failure(record))
    }

    /// Ask the writer to drain and stop
    pub fn stop(&self) -> DbResult<()> {
        self.send(StoreOp::Stop)
    }

    /// Get writer statistics
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    fn send(&self, op: StoreOp) -> DbResult<()> {
        self.sender.send(op).map_err(|_| DbError::ChannelClosed)
    }
}

/// The catalog writer: a dedicated thread owning the store connection
pub struct CatalogWriter {
    /// Thread handle
    handle: Option<JoinHandle<DbResult<()>>>,

    /// Handle for sending ops
    sink: SinkHandle,

    /// Path to the store (for reopening at finalization)
    db_path: PathBuf,
}

impl CatalogWriter {
    /// Open the store, ensure the schema, record run metadata, and spawn
    /// the writer thread
    ///
    /// `channel_capacity` of `None` gives an unbounded sink queue; `Some(n)`
    /// bounds it so enqueueing workers block when the writer falls behind.
    pub fn new(
        db_path: &Path,
        batch_size: usize,
        channel_capacity: Option<usize>,
    ) -> DbResult<Self> {
        let (sender, receiver) = match channel_capacity {
            Some(n) => bounded(n),
            None => unbounded(),
        };
        let stats = Arc::new(WriterStats::default());

        let sink = SinkHandle {
            sender,
            stats: Arc::clone(&stats),
        };

        let conn = Connection::open(db_path)?;
        schema::create_database(&conn)?;

        schema::set_scan_info(&conn, keys::SCHEMA_VERSION, &schema::SCHEMA_VERSION.to_string())?;
        schema::set_scan_info(&conn, keys::SCANNER_VERSION, env!("CARGO_PKG_VERSION"))?;
        schema::set_scan_info(&conn, keys::START_TIME, &chrono::Utc::now().to_rfc3339())?;
        schema::set_scan_info(&conn, keys::STATUS, "running")?;

        let stats_clone = Arc::clone(&stats);
        let handle = thread::Builder::new()
            .name("catalog-writer".into())
            .spawn(move || writer_loop(conn, receiver, stats_clone, batch_size))
            .map_err(|e| DbError::CreateFailed {
                path: db_path.to_path_buf(),
                reason: format!("Failed to spawn writer thread: {}", e),
            })?;

        Ok(Self {
            handle: Some(handle),
            sink,
            db_path: db_path.to_path_buf(),
        })
    }

    /// Get a handle for sending ops to the writer
    pub fn handle(&self) -> SinkHandle {
        self.sink.clone()
    }

    /// Stop the writer, wait for it to drain, and finalize the store
    ///
    /// `status` is recorded in scan_info ("completed" or "interrupted").
    /// Returns the writer thread's error if it halted on a persistent
    /// commit failure.
    pub fn finish(mut self, status: &str) -> DbResult<()> {
        // The send fails if the writer already died; the join below
        // surfaces the underlying error in that case.
        let _ = self.sink.stop();

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => {
                    return Err(DbError::WriterThread("writer thread panicked".into()));
                }
            }
        }

        // Reopen for finalization
        let conn = Connection::open(&self.db_path)?;
        schema::create_indexes(&conn)?;
        schema::set_scan_info(&conn, keys::STATUS, status)?;
        schema::set_scan_info(&conn, keys::END_TIME, &chrono::Utc::now().to_rfc3339())?;
        schema::optimize_for_reads(&conn)?;

        Ok(())
    }

    /// Get the store path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Writer thread body
fn writer_loop(
    conn: Connection,
    receiver: Receiver<StoreOp>,
    stats: Arc<WriterStats>,
    batch_size: usize,
) -> DbResult<()> {
    let mut pending: Vec<StoreOp> = Vec::with_capacity(batch_size);

    loop {
        match receiver.recv_timeout(COMMIT_INTERVAL) {
            Ok(StoreOp::Stop) => {
                flush(&conn, &mut pending, &stats)?;
                debug!("Writer stopping after drain");
                return Ok(());
            }
            Ok(op) => {
                pending.push(op);
                if pending.len() >= batch_size {
                    flush(&conn, &mut pending, &stats)?;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                // Periodic commit so progress survives idle gaps
                flush(&conn, &mut pending, &stats)?;
            }
            Err(RecvTimeoutError::Disconnected) => {
                flush(&conn, &mut pending, &stats)?;
                debug!("Writer stopping, all senders gone");
                return Ok(());
            }
        }
    }
}

/// Commit pending ops as one transaction, retrying transient failures
fn flush(conn: &Connection, pending: &mut Vec<StoreOp>, stats: &WriterStats) -> DbResult<()> {
    if pending.is_empty() {
        return Ok(());
    }

    let mut attempt = 1;
    loop {
        match commit_batch(conn, pending) {
            Ok(()) => {
                // Count only after the transaction landed; a rolled-back
                // attempt must not inflate the stats.
                for op in pending.iter() {
                    match op {
                        StoreOp::File(_) => &stats.files_written,
                        StoreOp::Directory(_) => &stats.dirs_written,
                        StoreOp::Symlink(_) => &stats.symlinks_written,
                        StoreOp::Failure(_) => &stats.failures_written,
                        StoreOp::Stop => continue,
                    }
                    .fetch_add(1, Ordering::Relaxed);
                }
                pending.clear();
                stats.batches_committed.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(e) if attempt < MAX_COMMIT_ATTEMPTS => {
                warn!(attempt, error = %e, "Store commit failed, retrying");
                stats.commit_retries.fetch_add(1, Ordering::Relaxed);
                thread::sleep(RETRY_BACKOFF * attempt);
                attempt += 1;
            }
            Err(e) => {
                return Err(DbError::RetriesExhausted {
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }
}

/// Apply one batch of ops inside a transaction
fn commit_batch(conn: &Connection, ops: &[StoreOp]) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;

    {
        let mut file_stmt = tx.prepare_cached(
            "REPLACE INTO files (abs_path, base_name, dir_name, extension, size, mtime, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut dir_stmt = tx.prepare_cached(
            "REPLACE INTO directories (abs_path, file_count, dir_count, symlink_count, last_scanned_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut symlink_stmt =
            tx.prepare_cached("REPLACE INTO symlinks (abs_path, target) VALUES (?1, ?2)")?;
        let mut failure_stmt = tx.prepare_cached(
            "REPLACE INTO failures (abs_path, timestamp, error_message) VALUES (?1, ?2, ?3)",
        )?;

        for op in ops {
            match op {
                StoreOp::File(r) => {
                    file_stmt.execute(params![
                        r.abs_path,
                        r.base_name,
                        r.dir_name,
                        r.extension,
                        r.size as i64,
                        r.mtime,
                        r.content_hash,
                    ])?;
                }
                StoreOp::Directory(r) => {
                    dir_stmt.execute(params![
                        r.abs_path,
                        r.file_count as i64,
                        r.dir_count as i64,
                        r.symlink_count as i64,
                        r.last_scanned_at,
                    ])?;
                }
                StoreOp::Symlink(r) => {
                    symlink_stmt.execute(params![r.abs_path, r.target])?;
                }
                StoreOp::Failure(r) => {
                    failure_stmt.execute(params![r.abs_path, r.timestamp, r.error_message])?;
                }
                StoreOp::Stop => {}
            }
        }
    }

    tx.commit()
}
