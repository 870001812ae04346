//! Catalog store: schema, single-writer sink, and resume index
//!
//! All store mutations flow through exactly one writer thread; see
//! `writer` for the serialization contract. `resume` provides the
//! read-once snapshot of directories completed in a prior run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Scanner Workers (N)                    │
//! │  - emit StoreOp records via SinkHandle              │
//! └─────────────────────┬───────────────────────────────┘
//!                       │ StoreOp
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │              CatalogWriter thread                   │
//! │  - buffers ops, commits batched transactions        │
//! │  - periodic commit on idle, drains on Stop          │
//! └─────────────────────┬───────────────────────────────┘
//!                       │
//!                       ▼
//!             ┌──────────────────┐
//!             │   SQLite store   │
//!             │  (catalog.db)    │
//!             └──────────────────┘
//! ```

pub mod resume;
pub mod schema;
pub mod writer;

pub use resume::ResumeIndex;
pub use schema::{create_database, create_indexes, get_scan_info, keys, set_scan_info};
pub use writer::{CatalogWriter, SinkHandle, StoreOp, WriterStats};
