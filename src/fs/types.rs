//! Entry and record types for the catalog
//!
//! `FsDirEntry` is what directory enumeration yields; the four record
//! structs are what the scanner emits and the writer persists, one
//! relation each, keyed by absolute path.

use std::path::Path;

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Anything else (device, fifo, socket, unknown)
    Other,
}

impl EntryKind {
    /// Classify a `std::fs::FileType` without following symlinks
    pub fn from_file_type(ft: &std::fs::FileType) -> Self {
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryKind::File
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryKind::Directory
    }

    /// Check if this is a symbolic link
    pub fn is_symlink(&self) -> bool {
        *self == EntryKind::Symlink
    }
}

/// A single entry yielded by directory enumeration
///
/// Size and mtime are populated for regular files only; directories and
/// symlinks carry their classification and name, which is all the scanner
/// needs for them.
#[derive(Debug, Clone)]
pub struct FsDirEntry {
    /// Entry name (not full path)
    pub name: String,

    /// Entry kind, determined without following symlinks
    pub kind: EntryKind,

    /// File size in bytes (0 for non-files)
    pub size: u64,

    /// Last modification time as Unix seconds (files only)
    pub mtime: Option<i64>,
}

/// Per-directory tally of direct entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirTally {
    /// Regular files directly in this directory
    pub file_count: u64,

    /// Subdirectories directly in this directory
    pub dir_count: u64,

    /// Symlinks directly in this directory
    pub symlink_count: u64,
}

/// Extension of a file name: the text after the final dot, empty when the
/// name contains no dot
///
/// ```
/// use hashwalk::fs::extension_of;
///
/// assert_eq!(extension_of("photo.JPG"), "JPG");
/// assert_eq!(extension_of("archive.tar.gz"), "gz");
/// assert_eq!(extension_of("README"), "");
/// assert_eq!(extension_of(".bashrc"), "bashrc");
/// ```
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) => name[idx + 1..].to_string(),
        None => String::new(),
    }
}

/// A hashed regular file, ready for the files relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path (primary key)
    pub abs_path: String,

    /// Base name of the file
    pub base_name: String,

    /// Absolute path of the containing directory
    pub dir_name: String,

    /// Extension without the dot, empty if none
    pub extension: String,

    /// Size in bytes
    pub size: u64,

    /// Last modification time as Unix seconds
    pub mtime: Option<i64>,

    /// Content fingerprint (hex digest)
    pub content_hash: String,
}

impl FileRecord {
    /// Build a record from an absolute path and the already-collected stat
    /// data, deriving base name, parent directory, and extension
    pub fn new(abs_path: &Path, size: u64, mtime: Option<i64>, content_hash: String) -> Self {
        let base_name = abs_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir_name = abs_path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            abs_path: abs_path.to_string_lossy().into_owned(),
            extension: extension_of(&base_name),
            base_name,
            dir_name,
            size,
            mtime,
            content_hash,
        }
    }
}

/// A completed directory pass, ready for the directories relation
///
/// Presence of a row for a path marks that directory as done for resume
/// purposes; counts are the exact tally of its direct entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Absolute path (primary key)
    pub abs_path: String,

    /// Direct regular files
    pub file_count: u64,

    /// Direct subdirectories
    pub dir_count: u64,

    /// Direct symlinks
    pub symlink_count: u64,

    /// Time of this pass as Unix seconds
    pub last_scanned_at: i64,
}

/// A symlink and its resolved target, ready for the symlinks relation
///
/// The target is read with readlink semantics; it is never followed and
/// never hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkRecord {
    /// Absolute path (primary key)
    pub abs_path: String,

    /// Raw link target
    pub target: String,
}

/// An unrecoverable per-directory error, ready for the failures relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Absolute path of the directory that failed (primary key)
    pub abs_path: String,

    /// Time of the failure as Unix seconds
    pub timestamp: i64,

    /// Human-readable error description
    pub error_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.jpg"), "jpg");
        assert_eq!(extension_of("b.PNG"), "PNG");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of(".hidden"), "hidden");
        assert_eq!(extension_of("trailing."), "");
    }

    #[test]
    fn test_file_record_derivation() {
        let path = PathBuf::from("/pics/2024/beach.jpg");
        let record = FileRecord::new(&path, 1024, Some(1700000000), "abc123".into());

        assert_eq!(record.abs_path, "/pics/2024/beach.jpg");
        assert_eq!(record.base_name, "beach.jpg");
        assert_eq!(record.dir_name, "/pics/2024");
        assert_eq!(record.extension, "jpg");
        assert_eq!(record.size, 1024);
        assert_eq!(record.content_hash, "abc123");
    }

    #[test]
    fn test_entry_kind_helpers() {
        assert!(EntryKind::File.is_file());
        assert!(EntryKind::Directory.is_dir());
        assert!(EntryKind::Symlink.is_symlink());
        assert!(!EntryKind::Other.is_file());
    }

    #[test]
    fn test_dir_tally_default() {
        let tally = DirTally::default();
        assert_eq!(tally.file_count, 0);
        assert_eq!(tally.dir_count, 0);
        assert_eq!(tally.symlink_count, 0);
    }
}
