//! Work queue for pending directory paths
//!
//! A multi-producer multi-consumer channel shared by every scanner
//! worker. Capacity is optional: unbounded means enqueue never blocks;
//! a bound makes enqueue block when full, which acts as admission
//! control against pathologically wide trees. No ordering is
//! guaranteed - traversal order is irrelevant to correctness.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A task to scan one directory
#[derive(Debug, Clone)]
pub struct DirTask {
    /// Absolute path of the directory
    pub path: PathBuf,
}

impl DirTask {
    /// Create a new directory task
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks enqueued
    pub enqueued: AtomicU64,

    /// Total tasks dequeued
    pub dequeued: AtomicU64,
}

/// Work queue shared by all scanner workers
pub struct WorkQueue {
    /// Sender for adding tasks
    sender: Sender<DirTask>,

    /// Receiver for getting tasks
    receiver: Receiver<DirTask>,

    /// Configured capacity (None = unbounded)
    capacity: Option<usize>,

    /// Queue statistics
    stats: Arc<QueueStats>,
}

impl WorkQueue {
    /// Create a new work queue
    ///
    /// `None` gives an unbounded queue whose enqueue never blocks;
    /// `Some(n)` bounds it at `n` pending tasks.
    pub fn new(capacity: Option<usize>) -> Self {
        let (sender, receiver) = match capacity {
            Some(n) => bounded(n),
            None => unbounded(),
        };

        Self {
            sender,
            receiver,
            capacity,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a sender for this queue (clone one per worker)
    pub fn sender(&self) -> WorkSender {
        WorkSender {
            sender: self.sender.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get a receiver for this queue (clone one per worker)
    pub fn receiver(&self) -> WorkReceiver {
        WorkReceiver {
            receiver: self.receiver.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Seed the queue with a root directory
    pub fn seed(&self, path: PathBuf) -> Result<(), ()> {
        self.sender().send(DirTask::new(path))
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Get configured capacity
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

/// Handle for enqueueing tasks
#[derive(Clone)]
pub struct WorkSender {
    sender: Sender<DirTask>,
    stats: Arc<QueueStats>,
}

impl WorkSender {
    /// Enqueue a task
    ///
    /// Never blocks on an unbounded queue; blocks when a bounded queue
    /// is full (backpressure). Errs only if the queue is disconnected.
    pub fn send(&self, task: DirTask) -> Result<(), ()> {
        self.sender.send(task).map_err(|_| ())?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Handle for dequeueing tasks
#[derive(Clone)]
pub struct WorkReceiver {
    receiver: Receiver<DirTask>,
    stats: Arc<QueueStats>,
}

impl WorkReceiver {
    /// Dequeue with a timeout
    ///
    /// Returns `None` on timeout or disconnection; a timeout is not an
    /// error, it is how workers observe quiescence.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DirTask> {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_basic() {
        let queue = WorkQueue::new(None);

        queue.seed("/pics".into()).unwrap();
        assert!(!queue.is_empty());
        assert_eq!(queue.len(), 1);

        let receiver = queue.receiver();
        let task = receiver.recv_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(task.path, PathBuf::from("/pics"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_timeout_on_empty() {
        let queue = WorkQueue::new(None);
        let receiver = queue.receiver();

        let start = std::time::Instant::now();
        assert!(receiver.recv_timeout(Duration::from_millis(50)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_bounded_capacity() {
        let queue = WorkQueue::new(Some(2));
        assert_eq!(queue.capacity(), Some(2));

        let sender = queue.sender();
        sender.send(DirTask::new("/a".into())).unwrap();
        sender.send(DirTask::new("/b".into())).unwrap();
        assert_eq!(queue.len(), 2);

        // A third send would block; drain from another worker first
        let receiver = queue.receiver();
        let handle = std::thread::spawn(move || {
            sender.send(DirTask::new("/c".into())).unwrap();
        });
        let task = receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(task.path, PathBuf::from("/a"));
        handle.join().unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_queue_stats() {
        let queue = WorkQueue::new(None);
        let sender = queue.sender();
        let receiver = queue.receiver();

        sender.send(DirTask::new("/a".into())).unwrap();
        sender.send(DirTask::new("/b".into())).unwrap();
        receiver.recv_timeout(Duration::from_millis(10)).unwrap();

        let stats = queue.stats();
        assert_eq!(stats.enqueued.load(Ordering::Relaxed), 2);
        assert_eq!(stats.dequeued.load(Ordering::Relaxed), 1);
    }
}
