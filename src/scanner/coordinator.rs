//! Scan coordinator - orchestrates the parallel catalog run
//!
//! The coordinator is responsible for:
//! - Ensuring the store schema and loading the resume index
//! - Setting up the work queue, the writer, and the worker pool
//! - Seeding the root paths
//! - Monitoring the pool and updating progress
//! - Joining workers, stopping the writer, and reporting final stats
//!
//! The run ends when every worker has independently exited after its
//! own idle timeout (or the shutdown flag was raised); only then is the
//! writer told to drain and stop.

use crate::config::ScanConfig;
use crate::content::{Blake3Fingerprinter, Fingerprinter};
use crate::db::{keys, CatalogWriter, ResumeIndex};
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::scanner::queue::WorkQueue;
use crate::scanner::worker::{aggregate_stats, Worker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often the monitor loop samples the pool
const MONITOR_INTERVAL: Duration = Duration::from_millis(200);

/// Monitor ticks between queue-depth log lines
const QUEUE_LOG_EVERY: u32 = 50;

/// Result of a completed run
#[derive(Debug)]
pub struct ScanResult {
    /// Directories fully scanned this run
    pub dirs_scanned: u64,

    /// Directories skipped via the resume index
    pub dirs_resumed: u64,

    /// Files hashed
    pub files_hashed: u64,

    /// Bytes hashed (sum of file sizes)
    pub bytes_hashed: u64,

    /// Symlinks recorded
    pub symlinks_found: u64,

    /// Directories that failed
    pub failures: u64,

    /// Records committed by the writer
    pub records_written: u64,

    /// Wall time of the run
    pub duration: Duration,

    /// Whether the run ran to quiescence (vs was interrupted)
    pub completed: bool,
}

/// Progress snapshot for display
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Directories processed (scanned + resumed)
    pub dirs: u64,

    /// Files hashed
    pub files: u64,

    /// Bytes hashed
    pub bytes: u64,

    /// Directories that failed
    pub failures: u64,

    /// Current work queue depth
    pub queue_len: usize,

    /// Workers still running
    pub live_workers: usize,

    /// Total workers
    pub total_workers: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Files hashed per second
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }
}

/// Coordinates the parallel catalog run
pub struct ScanCoordinator {
    /// Configuration
    config: Arc<ScanConfig>,

    /// Work queue for directory tasks
    queue: WorkQueue,

    /// Store writer
    writer: CatalogWriter,

    /// Directories completed in prior runs
    resume: Arc<ResumeIndex>,

    /// Worker threads
    workers: Vec<Worker>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl ScanCoordinator {
    /// Create a new coordinator
    ///
    /// Loads the resume index before the writer thread starts so the
    /// snapshot read happens on a quiet store.
    pub fn new(config: ScanConfig) -> Result<Self> {
        let config = Arc::new(config);

        let resume = Arc::new(ResumeIndex::load(&config.output_path)?);
        if !resume.is_empty() {
            info!(
                done_dirs = resume.len(),
                "Resume index loaded, completed directories will not be rehashed"
            );
        }

        let queue = WorkQueue::new(config.queue_capacity);

        let writer = CatalogWriter::new(
            &config.output_path,
            config.batch_size,
            config.writer_queue_capacity,
        )?;

        Ok(Self {
            config,
            queue,
            writer,
            resume,
            workers: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run the catalog scan
    pub fn run(mut self, progress: Option<&ProgressReporter>) -> Result<ScanResult> {
        let start_time = Instant::now();

        info!(
            roots = ?self.config.roots,
            workers = self.config.worker_count,
            output = %self.config.output_path.display(),
            "Starting catalog run"
        );

        self.record_run_metadata()?;

        // Seed the queue with the root directories
        for root in &self.config.roots {
            self.queue
                .seed(root.clone())
                .map_err(|_| crate::error::WorkerError::QueueClosed { id: 0 })?;
        }

        self.spawn_workers()?;

        // Wait for every worker to exit on its own idle timeout
        self.monitor_pool(progress, start_time);

        let totals = self.join_workers();
        let interrupted = self.shutdown.load(Ordering::SeqCst);

        // All workers are gone; tell the writer to drain and stop. The
        // handle outlives finish() so the final stats are readable after
        // the last batch has committed.
        let sink = self.writer.handle();
        let status = if interrupted { "interrupted" } else { "completed" };
        self.writer.finish(status)?;
        let records_written = sink.stats().records_written();

        let duration = start_time.elapsed();

        info!(
            dirs = totals.dirs_scanned,
            resumed = totals.dirs_resumed,
            files = totals.files_hashed,
            bytes = totals.bytes_hashed,
            failures = totals.failures,
            duration_secs = duration.as_secs(),
            status,
            "Catalog run finished"
        );

        Ok(ScanResult {
            dirs_scanned: totals.dirs_scanned,
            dirs_resumed: totals.dirs_resumed,
            files_hashed: totals.files_hashed,
            bytes_hashed: totals.bytes_hashed,
            symlinks_found: totals.symlinks_found,
            failures: totals.failures,
            records_written,
            duration,
            completed: !interrupted,
        })
    }

    /// Spawn worker threads
    fn spawn_workers(&mut self) -> Result<()> {
        let fingerprinter: Arc<dyn Fingerprinter> = Arc::new(Blake3Fingerprinter);

        for id in 0..self.config.worker_count {
            let worker = Worker::spawn(
                id,
                Arc::clone(&self.config),
                self.queue.receiver(),
                self.queue.sender(),
                self.writer.handle(),
                Arc::clone(&self.resume),
                Arc::clone(&fingerprinter),
                Arc::clone(&self.shutdown),
            )?;
            self.workers.push(worker);
        }

        info!(count = self.workers.len(), "Workers spawned");
        Ok(())
    }

    /// Poll the pool until every worker has exited
    fn monitor_pool(&self, progress: Option<&ProgressReporter>, start_time: Instant) {
        let mut tick: u32 = 0;

        loop {
            let live = self.workers.iter().filter(|w| !w.is_finished()).count();
            if live == 0 {
                return;
            }

            tick = tick.wrapping_add(1);
            if tick % QUEUE_LOG_EVERY == 0 {
                debug!(
                    queue = self.queue.len(),
                    live_workers = live,
                    "Scan in progress"
                );
            }

            if let Some(reporter) = progress {
                let totals = aggregate_stats(&self.workers);
                reporter.update(&ScanProgress {
                    dirs: totals.dirs_scanned + totals.dirs_resumed,
                    files: totals.files_hashed,
                    bytes: totals.bytes_hashed,
                    failures: totals.failures,
                    queue_len: self.queue.len(),
                    live_workers: live,
                    total_workers: self.workers.len(),
                    elapsed: start_time.elapsed(),
                });
            }

            thread::sleep(MONITOR_INTERVAL);
        }
    }

    /// Join all worker threads and collect final stats
    fn join_workers(&mut self) -> crate::scanner::worker::AggregatedStats {
        let totals = aggregate_stats(&self.workers);

        let workers = std::mem::take(&mut self.workers);
        for worker in workers {
            if let Err(e) = worker.join() {
                warn!(error = %e, "Worker failed to join cleanly");
            }
        }

        totals
    }

    /// Record run metadata in scan_info
    fn record_run_metadata(&self) -> Result<()> {
        let conn = rusqlite::Connection::open(&self.config.output_path)
            .map_err(crate::error::DbError::from)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(crate::error::DbError::from)?;
        let roots = self
            .config
            .roots
            .iter()
            .map(|r| r.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        crate::db::set_scan_info(&conn, keys::ROOT_PATHS, &roots)?;
        crate::db::set_scan_info(&conn, keys::WORKER_COUNT, &self.config.worker_count.to_string())?;
        Ok(())
    }
}
