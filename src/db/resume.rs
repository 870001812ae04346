//! Resume index: directories completed in a prior run
//!
//! Loaded exactly once, before any worker starts, from the directories
//! relation. The snapshot is immutable for the whole run and is shared
//! read-only across workers, so it needs no synchronization. Resume is
//! directory-level: a directory found here is not re-hashed, but its
//! subtree is still walked so newly appeared children are discovered.

use crate::db::schema;
use crate::error::DbResult;
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;

/// Immutable snapshot of directory paths already marked done
#[derive(Debug, Default)]
pub struct ResumeIndex {
    dirs: HashSet<String>,
}

impl ResumeIndex {
    /// Load the index from the catalog store
    ///
    /// Opens a short-lived connection of its own, ensuring the schema
    /// first so a fresh store yields an empty index.
    pub fn load(db_path: &Path) -> DbResult<Self> {
        let conn = Connection::open(db_path)?;
        schema::create_database(&conn)?;

        let mut stmt = conn.prepare("SELECT abs_path FROM directories")?;
        let dirs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self { dirs })
    }

    /// An empty index (fresh catalog)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index from explicit paths
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dirs: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Check whether a directory was fully scanned in a prior run
    pub fn is_done(&self, abs_path: &str) -> bool {
        self.dirs.contains(abs_path)
    }

    /// Number of directories in the index
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// True when no prior run state exists
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}
