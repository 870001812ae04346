//! Scanner worker threads
//!
//! Each worker:
//! - Pulls directory tasks from the shared work queue
//! - Enumerates the directory's entries exactly once
//! - Re-enqueues non-ignored subdirectories, even under resumed dirs
//! - Hashes files and resolves symlinks when the directory is not in
//!   the resume index
//! - Emits records to the sink and failures to the failures relation
//!
//! Workers share no mutable memory; they interact only through the work
//! queue, the sink channel, and the read-only resume index. A worker
//! exits its loop the first time its own accumulated dequeue idle time
//! reaches the configured idle timeout - a per-worker local decision,
//! not a synchronized barrier.

use crate::config::ScanConfig;
use crate::content::Fingerprinter;
use crate::db::{ResumeIndex, SinkHandle};
use crate::error::{FsError, ScanOutcome, WorkerError};
use crate::fs::{self, DirTally, DirectoryRecord, EntryKind, FailureRecord, FileRecord, SymlinkRecord};
use crate::scanner::queue::{DirTask, WorkReceiver, WorkSender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Dequeue poll interval; idle time accumulates in these steps so the
/// shutdown flag is still observed promptly
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Directories fully scanned
    pub dirs_scanned: AtomicU64,

    /// Directories found in the resume index (subdir discovery only)
    pub dirs_resumed: AtomicU64,

    /// Files hashed
    pub files_hashed: AtomicU64,

    /// Bytes hashed (sum of file sizes)
    pub bytes_hashed: AtomicU64,

    /// Symlinks recorded
    pub symlinks_found: AtomicU64,

    /// Directories that failed
    pub failures: AtomicU64,
}

/// A worker thread that processes directory tasks
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<Result<(), WorkerError>>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        id: usize,
        config: Arc<ScanConfig>,
        queue_rx: WorkReceiver,
        queue_tx: WorkSender,
        sink: SinkHandle,
        resume: Arc<ResumeIndex>,
        fingerprinter: Arc<dyn Fingerprinter>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("scanner-{}", id))
            .spawn(move || {
                worker_loop(
                    id,
                    config,
                    queue_rx,
                    queue_tx,
                    sink,
                    resume,
                    fingerprinter,
                    shutdown,
                    stats_clone,
                )
            })
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Check whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Panicked { id: self.id }),
            }
        } else {
            Ok(())
        }
    }
}

/// Main worker loop
#[allow(clippy::too_many_arguments)]
fn worker_loop(
    id: usize,
    config: Arc<ScanConfig>,
    queue_rx: WorkReceiver,
    queue_tx: WorkSender,
    sink: SinkHandle,
    resume: Arc<ResumeIndex>,
    fingerprinter: Arc<dyn Fingerprinter>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) -> Result<(), WorkerError> {
    debug!(worker = id, "Worker starting");

    let mut idle = Duration::ZERO;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!(worker = id, "Worker stopping on shutdown signal");
            break;
        }

        let task = match queue_rx.recv_timeout(POLL_INTERVAL) {
            Some(task) => {
                idle = Duration::ZERO;
                task
            }
            None => {
                idle += POLL_INTERVAL;
                if idle >= config.idle_timeout {
                    info!(
                        worker = id,
                        idle_secs = idle.as_secs(),
                        "Worker finished, queue stayed empty past idle timeout"
                    );
                    break;
                }
                continue;
            }
        };

        let outcome = scan_directory(
            id,
            &task,
            &config,
            &resume,
            &queue_tx,
            &sink,
            fingerprinter.as_ref(),
            &stats,
        )
        .map_err(|e| {
            // Channel gone: either the run is tearing down or the writer
            // halted; nothing more this worker can do
            warn!(worker = id, error = %e, "Worker stopping, channel closed");
            e
        })?;

        match &outcome {
            ScanOutcome::Scanned {
                path,
                files,
                subdirs,
                ..
            } => {
                trace!(worker = id, path = %path.display(), files, subdirs, queue = queue_rx.len(), "Directory scanned");
            }
            ScanOutcome::Resumed { path, subdirs } => {
                debug!(worker = id, path = %path.display(), subdirs, "Directory already done, re-walked for new children");
            }
            ScanOutcome::Failed { path, error } => {
                if error.is_recoverable() {
                    debug!(worker = id, path = %path.display(), error = %error, "Directory skipped");
                } else {
                    warn!(worker = id, path = %path.display(), error = %error, "Directory failed");
                }
            }
        }
    }

    debug!(
        worker = id,
        dirs = stats.dirs_scanned.load(Ordering::Relaxed),
        files = stats.files_hashed.load(Ordering::Relaxed),
        "Worker exited"
    );

    Ok(())
}

/// Process a single directory
///
/// Subdirectories are re-enqueued unconditionally (even when the
/// directory is in the resume index) so new children under previously
/// completed directories are still discovered. Files and symlinks are
/// only processed - and the directory record only emitted - when the
/// directory is not already done. Any filesystem error turns the whole
/// pass into a failure record; records emitted before the error remain
/// valid.
///
/// Errs only when a channel is disconnected; filesystem problems are a
/// `Failed` outcome, not an error.
#[allow(clippy::too_many_arguments)]
fn scan_directory(
    worker_id: usize,
    task: &DirTask,
    config: &ScanConfig,
    resume: &ResumeIndex,
    queue_tx: &WorkSender,
    sink: &SinkHandle,
    fingerprinter: &dyn Fingerprinter,
    stats: &WorkerStats,
) -> Result<ScanOutcome, WorkerError> {
    let abs_path = task.path.to_string_lossy().into_owned();
    let done = resume.is_done(&abs_path);

    let fail = |error: FsError, stats: &WorkerStats| -> Result<ScanOutcome, WorkerError> {
        stats.failures.fetch_add(1, Ordering::Relaxed);
        sink.record_failure(FailureRecord {
            abs_path: abs_path.clone(),
            timestamp: chrono::Utc::now().timestamp(),
            error_message: error.to_string(),
        })
        .map_err(|_| WorkerError::SinkClosed { id: worker_id })?;
        Ok(ScanOutcome::Failed {
            path: task.path.clone(),
            error,
        })
    };

    let entries = match fs::read_dir_entries(&task.path) {
        Ok(entries) => entries,
        Err(e) => return fail(e, stats),
    };

    let mut tally = DirTally::default();
    let mut files = Vec::new();

    for entry in entries {
        match entry.kind {
            EntryKind::Directory => {
                // Ignored names are neither descended nor recorded, but
                // they still count toward the parent's tally
                tally.dir_count += 1;
                if !config.is_ignored(&entry.name) {
                    queue_tx
                        .send(DirTask::new(task.path.join(&entry.name)))
                        .map_err(|_| WorkerError::QueueClosed { id: worker_id })?;
                }
            }
            EntryKind::File if !done => files.push(entry),
            EntryKind::Symlink if !done => {
                let link_path = task.path.join(&entry.name);
                let target = match fs::read_link_target(&link_path) {
                    Ok(target) => target,
                    Err(e) => return fail(e, stats),
                };
                sink.record_symlink(SymlinkRecord {
                    abs_path: link_path.to_string_lossy().into_owned(),
                    target,
                })
                .map_err(|_| WorkerError::SinkClosed { id: worker_id })?;
                tally.symlink_count += 1;
                stats.symlinks_found.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    if done {
        stats.dirs_resumed.fetch_add(1, Ordering::Relaxed);
        return Ok(ScanOutcome::Resumed {
            path: task.path.clone(),
            subdirs: tally.dir_count,
        });
    }

    for entry in &files {
        let file_path = task.path.join(&entry.name);
        let content_hash = match fingerprinter.fingerprint_file(&file_path) {
            Ok(hash) => hash,
            Err(e) => {
                return fail(
                    FsError::Hash {
                        path: file_path,
                        source: e,
                    },
                    stats,
                )
            }
        };
        sink.record_file(FileRecord::new(
            &file_path,
            entry.size,
            entry.mtime,
            content_hash,
        ))
        .map_err(|_| WorkerError::SinkClosed { id: worker_id })?;
        stats.files_hashed.fetch_add(1, Ordering::Relaxed);
        stats.bytes_hashed.fetch_add(entry.size, Ordering::Relaxed);
    }
    tally.file_count = files.len() as u64;

    // The directory record goes last: its presence marks the pass done,
    // so the file and symlink records must already be in the sink
    sink.record_directory(DirectoryRecord {
        abs_path,
        file_count: tally.file_count,
        dir_count: tally.dir_count,
        symlink_count: tally.symlink_count,
        last_scanned_at: chrono::Utc::now().timestamp(),
    })
    .map_err(|_| WorkerError::SinkClosed { id: worker_id })?;
    stats.dirs_scanned.fetch_add(1, Ordering::Relaxed);

    Ok(ScanOutcome::Scanned {
        path: task.path.clone(),
        files: tally.file_count,
        subdirs: tally.dir_count,
        symlinks: tally.symlink_count,
    })
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[Worker]) -> AggregatedStats {
    let mut total = AggregatedStats::default();
    for worker in workers {
        total.dirs_scanned += worker.stats.dirs_scanned.load(Ordering::Relaxed);
        total.dirs_resumed += worker.stats.dirs_resumed.load(Ordering::Relaxed);
        total.files_hashed += worker.stats.files_hashed.load(Ordering::Relaxed);
        total.bytes_hashed += worker.stats.bytes_hashed.load(Ordering::Relaxed);
        total.symlinks_found += worker.stats.symlinks_found.load(Ordering::Relaxed);
        total.failures += worker.stats.failures.load(Ordering::Relaxed);
    }
    total
}

/// Pool-wide totals
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatedStats {
    pub dirs_scanned: u64,
    pub dirs_resumed: u64,
    pub files_hashed: u64,
    pub bytes_hashed: u64,
    pub symlinks_found: u64,
    pub failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::content::{fingerprint_bytes, Blake3Fingerprinter};
    use crate::db::CatalogWriter;
    use crate::scanner::queue::WorkQueue;
    use rusqlite::Connection;
    use std::fs::File;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};

    fn test_config(roots: Vec<PathBuf>, output: &Path, ignore: &[&str]) -> ScanConfig {
        let patterns: Vec<String> = ignore.iter().map(|s| s.to_string()).collect();
        ScanConfig {
            roots,
            output_path: output.to_path_buf(),
            worker_count: 1,
            queue_capacity: None,
            writer_queue_capacity: None,
            idle_timeout: Duration::from_millis(300),
            batch_size: 100,
            show_progress: false,
            verbose: false,
            ignore: config::compile_ignore_patterns(&patterns).unwrap(),
            ignore_patterns: patterns,
        }
    }

    struct Harness {
        _tmp: TempDir,
        tree: PathBuf,
        db_path: PathBuf,
        config: ScanConfig,
        queue: WorkQueue,
        writer: CatalogWriter,
        stats: Arc<WorkerStats>,
    }

    fn harness(ignore: &[&str]) -> Harness {
        let tmp = tempdir().unwrap();
        let tree = tmp.path().join("tree");
        std::fs::create_dir(&tree).unwrap();
        let db_path = tmp.path().join("catalog.db");
        let config = test_config(vec![tree.clone()], &db_path, ignore);
        let queue = WorkQueue::new(None);
        let writer = CatalogWriter::new(&db_path, 100, None).unwrap();
        Harness {
            _tmp: tmp,
            tree,
            db_path,
            config,
            queue,
            writer,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    fn scan(h: &Harness, path: &Path, resume: &ResumeIndex) -> ScanOutcome {
        scan_directory(
            0,
            &DirTask::new(path.to_path_buf()),
            &h.config,
            resume,
            &h.queue.sender(),
            &h.writer.handle(),
            &Blake3Fingerprinter,
            &h.stats,
        )
        .unwrap()
    }

    fn write_file(path: &Path, content: &[u8]) {
        let mut f = File::create(path).unwrap();
        f.write_all(content).unwrap();
    }

    #[test]
    fn test_scan_directory_records() {
        let h = harness(&[]);
        write_file(&h.tree.join("a.jpg"), b"0123456789");
        std::fs::create_dir(h.tree.join("sub")).unwrap();

        let outcome = scan(&h, &h.tree.clone(), &ResumeIndex::empty());
        match outcome {
            ScanOutcome::Scanned {
                files,
                subdirs,
                symlinks,
                ..
            } => {
                assert_eq!(files, 1);
                assert_eq!(subdirs, 1);
                assert_eq!(symlinks, 0);
            }
            other => panic!("expected Scanned, got {:?}", other),
        }

        // The subdirectory was re-enqueued
        let receiver = h.queue.receiver();
        let next = receiver.recv_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(next.path, h.tree.join("sub"));

        let db_path = h.db_path.clone();
        let tree = h.tree.clone();
        h.writer.finish("completed").unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let (hash, ext): (String, String) = conn
            .query_row(
                "SELECT content_hash, extension FROM files WHERE base_name = 'a.jpg'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(hash, fingerprint_bytes(b"0123456789"));
        assert_eq!(ext, "jpg");

        let (file_count, dir_count): (i64, i64) = conn
            .query_row(
                "SELECT file_count, dir_count FROM directories WHERE abs_path = ?1",
                [tree.to_string_lossy().into_owned()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(file_count, 1);
        assert_eq!(dir_count, 1);
    }

    #[test]
    fn test_resumed_directory_skips_hashing() {
        let h = harness(&[]);
        write_file(&h.tree.join("a.jpg"), b"0123456789");
        std::fs::create_dir(h.tree.join("sub")).unwrap();

        let resume = ResumeIndex::from_paths([h.tree.to_string_lossy().into_owned()]);
        let outcome = scan(&h, &h.tree.clone(), &resume);
        assert!(matches!(outcome, ScanOutcome::Resumed { subdirs: 1, .. }));

        // Subdirectory discovery still happened
        assert_eq!(h.queue.len(), 1);

        // But nothing was hashed or recorded
        assert_eq!(h.stats.files_hashed.load(Ordering::Relaxed), 0);
        let db_path = h.db_path.clone();
        h.writer.finish("completed").unwrap();
        let conn = Connection::open(&db_path).unwrap();
        let files: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(files, 0);
    }

    #[test]
    fn test_ignored_directory_not_enqueued_but_counted() {
        let h = harness(&["*.backupdb"]);
        std::fs::create_dir(h.tree.join("photos.backupdb")).unwrap();
        std::fs::create_dir(h.tree.join("keep")).unwrap();

        let outcome = scan(&h, &h.tree.clone(), &ResumeIndex::empty());
        match outcome {
            ScanOutcome::Scanned { subdirs, .. } => assert_eq!(subdirs, 2),
            other => panic!("expected Scanned, got {:?}", other),
        }

        // Only the non-ignored subdirectory was enqueued
        let receiver = h.queue.receiver();
        let next = receiver.recv_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(next.path, h.tree.join("keep"));
        assert!(receiver.recv_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_vanished_directory_records_failure() {
        let h = harness(&[]);
        let gone = h.tree.join("vanished");

        let outcome = scan(&h, &gone, &ResumeIndex::empty());
        assert!(matches!(outcome, ScanOutcome::Failed { .. }));
        assert_eq!(h.stats.failures.load(Ordering::Relaxed), 1);

        let db_path = h.db_path.clone();
        h.writer.finish("completed").unwrap();
        let conn = Connection::open(&db_path).unwrap();
        let (count, message): (i64, String) = conn
            .query_row(
                "SELECT COUNT(*), MAX(error_message) FROM failures",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert!(message.contains("vanished"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_recorded_not_followed() {
        let h = harness(&[]);
        write_file(&h.tree.join("real.jpg"), b"content");
        std::os::unix::fs::symlink("real.jpg", h.tree.join("link")).unwrap();

        let outcome = scan(&h, &h.tree.clone(), &ResumeIndex::empty());
        match outcome {
            ScanOutcome::Scanned {
                files, symlinks, ..
            } => {
                assert_eq!(files, 1);
                assert_eq!(symlinks, 1);
            }
            other => panic!("expected Scanned, got {:?}", other),
        }

        let db_path = h.db_path.clone();
        let tree = h.tree.clone();
        h.writer.finish("completed").unwrap();
        let conn = Connection::open(&db_path).unwrap();
        let target: String = conn
            .query_row(
                "SELECT target FROM symlinks WHERE abs_path = ?1",
                [tree.join("link").to_string_lossy().into_owned()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(target, "real.jpg");

        // The link itself must not show up as a hashed file
        let files: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_worker_pool_exits_on_idle_timeout() {
        let h = harness(&[]);
        write_file(&h.tree.join("a.txt"), b"aaa");

        let config = Arc::new(h.config.clone());
        let resume = Arc::new(ResumeIndex::empty());
        let shutdown = Arc::new(AtomicBool::new(false));
        let fingerprinter: Arc<dyn Fingerprinter> = Arc::new(Blake3Fingerprinter);

        h.queue.seed(h.tree.clone()).unwrap();

        let workers: Vec<Worker> = (0..2)
            .map(|id| {
                Worker::spawn(
                    id,
                    Arc::clone(&config),
                    h.queue.receiver(),
                    h.queue.sender(),
                    h.writer.handle(),
                    Arc::clone(&resume),
                    Arc::clone(&fingerprinter),
                    Arc::clone(&shutdown),
                )
                .unwrap()
            })
            .collect();

        let totals_before_join = loop {
            if workers.iter().all(|w| w.is_finished()) {
                break aggregate_stats(&workers);
            }
            thread::sleep(Duration::from_millis(20));
        };
        assert_eq!(totals_before_join.dirs_scanned, 1);
        assert_eq!(totals_before_join.files_hashed, 1);

        for worker in workers {
            worker.join().unwrap();
        }
        h.writer.finish("completed").unwrap();
    }
}
