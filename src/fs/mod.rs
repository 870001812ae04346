//! Local filesystem enumeration
//!
//! The scanner consumes exactly two primitives from this module:
//! `read_dir_entries`, which enumerates a directory once and classifies
//! each entry, and `read_link_target`, which resolves a symlink without
//! following it. Symlinks are never followed anywhere in this module, so
//! link cycles and cross-mount loops cannot trap the traversal.

pub mod types;

pub use types::{
    extension_of, DirTally, DirectoryRecord, EntryKind, FailureRecord, FileRecord, FsDirEntry,
    SymlinkRecord,
};

use crate::error::{FsError, FsResult};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Convert a `SystemTime` to Unix seconds (negative before the epoch)
pub fn system_time_to_unix(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Enumerate a directory's entries exactly once
///
/// Each entry is classified via its file type without following symlinks.
/// Regular files are additionally stat'ed for size and mtime; directories
/// and symlinks are not. Any error during enumeration or stat aborts the
/// whole pass - the caller records one failure for the directory.
pub fn read_dir_entries(path: &Path) -> FsResult<Vec<FsDirEntry>> {
    let read_dir = std::fs::read_dir(path).map_err(|e| FsError::ReadDir {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut entries = Vec::new();
    for item in read_dir {
        let item = item.map_err(|e| FsError::ReadDir {
            path: path.to_path_buf(),
            source: e,
        })?;

        let name = item.file_name().to_string_lossy().into_owned();
        let file_type = item.file_type().map_err(|e| FsError::Stat {
            path: item.path(),
            source: e,
        })?;
        let kind = EntryKind::from_file_type(&file_type);

        // Only files need size and mtime; skipping the extra stat for
        // directories and symlinks matters on large trees.
        let (size, mtime) = if kind.is_file() {
            let meta = item.metadata().map_err(|e| FsError::Stat {
                path: item.path(),
                source: e,
            })?;
            (meta.len(), meta.modified().ok().map(system_time_to_unix))
        } else {
            (0, None)
        };

        entries.push(FsDirEntry {
            name,
            kind,
            size,
            mtime,
        });
    }

    Ok(entries)
}

/// Resolve a symlink's raw target without following it
pub fn read_link_target(path: &Path) -> FsResult<String> {
    let target = std::fs::read_link(path).map_err(|e| FsError::ReadLink {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(target.to_string_lossy().into_owned())
}
