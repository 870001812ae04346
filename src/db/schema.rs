//! Catalog schema definitions and creation
//!
//! Four relations, each keyed by absolute path with replace-on-conflict
//! upsert semantics: a rescan fully overwrites prior values, never merges.
//! A fifth key/value table carries run metadata.

use crate::error::DbResult;
use rusqlite::Connection;

/// Current schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// Hashed regular files
const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    abs_path TEXT PRIMARY KEY,
    base_name TEXT NOT NULL,
    dir_name TEXT NOT NULL,
    extension TEXT NOT NULL,      -- text after the final dot, '' if none
    size INTEGER NOT NULL,
    mtime INTEGER,                -- Unix seconds
    content_hash TEXT NOT NULL
)
"#;

/// Completed directory passes; presence of a row marks the directory done
const CREATE_DIRECTORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS directories (
    abs_path TEXT PRIMARY KEY,
    file_count INTEGER NOT NULL,
    dir_count INTEGER NOT NULL,
    symlink_count INTEGER NOT NULL,
    last_scanned_at INTEGER NOT NULL   -- Unix seconds
)
"#;

/// Symlinks with their raw (unfollowed) targets
const CREATE_SYMLINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS symlinks (
    abs_path TEXT PRIMARY KEY,
    target TEXT NOT NULL
)
"#;

/// Per-directory unrecoverable errors
const CREATE_FAILURES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS failures (
    abs_path TEXT PRIMARY KEY,
    timestamp INTEGER NOT NULL,        -- Unix seconds
    error_message TEXT NOT NULL
)
"#;

/// Run metadata
const CREATE_SCAN_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS scan_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
"#;

/// Indexes for the dedup/reorg queries the catalog exists to serve.
/// Created after the scan so inserts stay cheap.
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_files_hash ON files(content_hash)",
    "CREATE INDEX IF NOT EXISTS idx_files_extension ON files(extension)",
    "CREATE INDEX IF NOT EXISTS idx_files_dir ON files(dir_name)",
    "CREATE INDEX IF NOT EXISTS idx_files_size ON files(size)",
];

/// SQLite pragmas for write throughput during the scan
const WRITE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;
PRAGMA cache_size = -64000;      -- 64MB cache
PRAGMA temp_store = MEMORY;
"#;

/// SQLite pragmas applied after the scan completes
const READ_PRAGMAS: &str = r#"
PRAGMA synchronous = FULL;
"#;

/// Create and configure the catalog for writing
pub fn create_database(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(WRITE_PRAGMAS)?;

    conn.execute(CREATE_FILES_TABLE, [])?;
    conn.execute(CREATE_DIRECTORIES_TABLE, [])?;
    conn.execute(CREATE_SYMLINKS_TABLE, [])?;
    conn.execute(CREATE_FAILURES_TABLE, [])?;
    conn.execute(CREATE_SCAN_INFO_TABLE, [])?;

    Ok(())
}

/// Create indexes (called after the scan for better insert performance)
pub fn create_indexes(conn: &Connection) -> DbResult<()> {
    for sql in CREATE_INDEXES {
        conn.execute(sql, [])?;
    }
    Ok(())
}

/// Apply read-optimized settings
pub fn optimize_for_reads(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(READ_PRAGMAS)?;

    // Update statistics for the query planner
    conn.execute("ANALYZE", [])?;

    Ok(())
}

/// Store run metadata
pub fn set_scan_info(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO scan_info (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// Get run metadata
pub fn get_scan_info(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM scan_info WHERE key = ?1",
        [key],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Metadata keys used by the scanner
pub mod keys {
    /// Schema version
    pub const SCHEMA_VERSION: &str = "schema_version";

    /// hashwalk version that produced the catalog
    pub const SCANNER_VERSION: &str = "scanner_version";

    /// Run status: "running", "completed", "interrupted"
    pub const STATUS: &str = "status";

    /// Timestamp when the run started (RFC 3339)
    pub const START_TIME: &str = "start_time";

    /// Timestamp when the run ended (RFC 3339)
    pub const END_TIME: &str = "end_time";

    /// Root paths of the run, newline separated
    pub const ROOT_PATHS: &str = "root_paths";

    /// Number of scanner workers used
    pub const WORKER_COUNT: &str = "worker_count";
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_create_database() {
        let conn = Connection::open_in_memory().unwrap();
        create_database(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in ["files", "directories", "symlinks", "failures", "scan_info"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_create_database_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_database(&conn).unwrap();
        create_database(&conn).unwrap();
    }

    #[test]
    fn test_scan_info() {
        let conn = Connection::open_in_memory().unwrap();
        create_database(&conn).unwrap();

        set_scan_info(&conn, keys::STATUS, "running").unwrap();
        assert_eq!(
            get_scan_info(&conn, keys::STATUS).unwrap(),
            Some("running".to_string())
        );

        set_scan_info(&conn, keys::STATUS, "completed").unwrap();
        assert_eq!(
            get_scan_info(&conn, keys::STATUS).unwrap(),
            Some("completed".to_string())
        );

        assert_eq!(get_scan_info(&conn, "nonexistent").unwrap(), None);
    }

    #[test]
    fn test_create_indexes() {
        let conn = Connection::open_in_memory().unwrap();
        create_database(&conn).unwrap();
        create_indexes(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_files_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_replace_semantics() {
        let conn = Connection::open_in_memory().unwrap();
        create_database(&conn).unwrap();

        for hash in ["aaa", "bbb"] {
            conn.execute(
                "REPLACE INTO files VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params!["/p/a.jpg", "a.jpg", "/p", "jpg", 10, 0, hash],
            )
            .unwrap();
        }

        let (count, hash): (i64, String) = conn
            .query_row(
                "SELECT COUNT(*), MAX(content_hash) FROM files",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(hash, "bbb");
    }
}
