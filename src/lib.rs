//! hashwalk - Concurrent File-Tree Cataloger
//!
//! A tool that catalogs a large file tree (a picture collection, an
//! archive volume) into SQLite, computing a content fingerprint for
//! every file, for later dedup and reorganisation tooling.
//!
//! # Features
//!
//! - **Parallel Scanning**: A fixed pool of worker threads consumes a
//!   shared work queue of directory paths, re-enqueueing subdirectories
//!   as they are discovered.
//!
//! - **Single-Writer Store**: Every store mutation from every worker is
//!   serialized through one dedicated writer thread, so workers never
//!   contend on SQLite.
//!
//! - **Resumable**: Directories completed in a prior run are not
//!   rehashed; their subtrees are still walked so new children are
//!   discovered.
//!
//! - **Failure Isolation**: One unreadable directory becomes a row in
//!   the failures table and the run keeps going.
//!
//! # Architecture
//!
//! ```text
//!  seed roots
//!      │
//!      ▼
//! ┌──────────────────┐     ┌─────────────────────────────────┐
//! │    Work Queue    │◄────┤  subdirectories re-enqueued     │
//! │  (directory      │     │                                 │
//! │   paths, MPMC)   ├────►│  Scanner Workers (N threads)    │
//! └──────────────────┘     │  enumerate · classify · hash    │
//!                          └───────────────┬─────────────────┘
//!                                          │ records
//!                                          ▼
//!                          ┌─────────────────────────────────┐
//!                          │   Sink Queue → Writer thread    │
//!                          │   batched REPLACE transactions  │
//!                          └───────────────┬─────────────────┘
//!                                          ▼
//!                                 ┌──────────────────┐
//!                                 │  SQLite catalog  │
//!                                 └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Catalog a picture collection
//! hashwalk ~/Pictures -o pictures.db
//!
//! # Find duplicate files afterwards
//! sqlite3 pictures.db "SELECT content_hash, COUNT(*) c, GROUP_CONCAT(abs_path)
//!                      FROM files GROUP BY content_hash HAVING c > 1"
//! ```

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod fs;
pub mod progress;
pub mod scanner;

pub use config::{CliArgs, ScanConfig};
pub use error::{CatalogError, Result};
pub use scanner::{ScanCoordinator, ScanResult};
