//! Concurrent traversal engine
//!
//! A fixed pool of scanner workers consumes directory paths from a
//! shared work queue, re-enqueueing subdirectories as it discovers
//! them, and the coordinator supervises the pool from seed to
//! quiescence.

pub mod coordinator;
pub mod queue;
pub mod worker;

pub use coordinator::{ScanCoordinator, ScanProgress, ScanResult};
pub use queue::{DirTask, WorkQueue, WorkReceiver, WorkSender};
pub use worker::{aggregate_stats, AggregatedStats, Worker, WorkerStats};
