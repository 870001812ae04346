//! Error types for hashwalk
//!
//! This module defines a structured error hierarchy that covers:
//! - Filesystem enumeration, stat, and hashing errors
//! - SQLite store errors
//! - Configuration and CLI errors
//! - Worker thread errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include the path and what failed
//! - Preserve error chains for debugging

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for the hashwalk application
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Filesystem errors
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),

    /// Store errors
    #[error("Store error: {0}")]
    Db(#[from] DbError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations outside the scan itself)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Filesystem errors raised while scanning a single directory
#[derive(Error, Debug)]
pub enum FsError {
    /// Directory enumeration failed
    #[error("Failed to read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Stat on an entry failed
    #[error("Failed to stat '{path}': {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Symlink target resolution failed
    #[error("Failed to read link target of '{path}': {source}")]
    ReadLink {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Content fingerprinting failed
    #[error("Failed to hash '{path}': {source}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FsError {
    /// The path the failed operation was applied to
    pub fn path(&self) -> &Path {
        match self {
            FsError::ReadDir { path, .. }
            | FsError::Stat { path, .. }
            | FsError::ReadLink { path, .. }
            | FsError::Hash { path, .. } => path,
        }
    }

    /// Check if this error is an expected per-directory condition
    /// (permission denied, entry vanished) rather than a general I/O fault
    pub fn is_recoverable(&self) -> bool {
        use std::io::ErrorKind;
        let source = match self {
            FsError::ReadDir { source, .. }
            | FsError::Stat { source, .. }
            | FsError::ReadLink { source, .. }
            | FsError::Hash { source, .. } => source,
        };
        matches!(
            source.kind(),
            ErrorKind::NotFound | ErrorKind::PermissionDenied
        )
    }
}

/// Store errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to create the store file
    #[error("Failed to create store at '{path}': {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// Commit kept failing after bounded retries
    #[error("Store commit failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: rusqlite::Error,
    },

    /// Writer channel closed unexpectedly
    #[error("Store writer channel closed unexpectedly")]
    ChannelClosed,

    /// Writer thread panicked or died without a result
    #[error("Store writer thread failed: {0}")]
    WriterThread(String),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid batch size
    #[error("Invalid batch size {size}: must be between {min} and {max}")]
    InvalidBatchSize {
        size: usize,
        min: usize,
        max: usize,
    },

    /// Invalid ignore glob
    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    InvalidIgnorePattern { pattern: String, reason: String },

    /// Root path missing or not a directory
    #[error("Invalid root path '{path}': {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker thread could not be spawned
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("Worker {id} panicked")]
    Panicked { id: usize },

    /// Work queue disconnected while the worker was running
    #[error("Worker {id}: work queue closed unexpectedly")]
    QueueClosed { id: usize },

    /// Sink channel disconnected - the store writer is gone
    #[error("Worker {id}: sink channel closed, store writer is gone")]
    SinkClosed { id: usize },
}

/// Result type alias for CatalogError
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type alias for FsError
pub type FsResult<T> = std::result::Result<T, FsError>;

/// Result type alias for DbError
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Outcome of one directory pass by a scanner worker
#[derive(Debug)]
pub enum ScanOutcome {
    /// Directory fully scanned: files hashed, records emitted
    Scanned {
        path: PathBuf,
        files: u64,
        subdirs: u64,
        symlinks: u64,
    },

    /// Directory was already in the resume index; only subdirectory
    /// discovery was performed
    Resumed { path: PathBuf, subdirs: u64 },

    /// Directory could not be scanned; a failure record was emitted
    Failed { path: PathBuf, error: FsError },
}

impl ScanOutcome {
    /// Returns true if this outcome represents a full scan
    pub fn is_scanned(&self) -> bool {
        matches!(self, ScanOutcome::Scanned { .. })
    }

    /// Returns the path associated with this outcome
    pub fn path(&self) -> &Path {
        match self {
            ScanOutcome::Scanned { path, .. } => path,
            ScanOutcome::Resumed { path, .. } => path,
            ScanOutcome::Failed { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_fs_error_recoverable() {
        let perm_denied = FsError::ReadDir {
            path: "/test".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(perm_denied.is_recoverable());

        let broken = FsError::Hash {
            path: "/test/file".into(),
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "short read"),
        };
        assert!(!broken.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let fs_err = FsError::Stat {
            path: "/missing".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        let catalog_err: CatalogError = fs_err.into();
        assert!(matches!(catalog_err, CatalogError::Fs(_)));
    }

    #[test]
    fn test_outcome_path() {
        let outcome = ScanOutcome::Resumed {
            path: "/data".into(),
            subdirs: 3,
        };
        assert_eq!(outcome.path(), Path::new("/data"));
        assert!(!outcome.is_scanned());
    }
}
