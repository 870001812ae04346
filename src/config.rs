//! Configuration types for hashwalk
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Glob-based ignore pattern compilation

use crate::error::ConfigError;
use clap::Parser;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use std::time::Duration;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Batch size limits for the store writer
const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 100_000;

/// Concurrent file-tree cataloger with content fingerprints
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hashwalk",
    version,
    about = "Catalog a file tree into SQLite with a content fingerprint per file",
    long_about = "Walks one or more directory trees in parallel, fingerprints every file's \
                  content, and records files, directories, and symlinks in a SQLite catalog \
                  for later dedup and reorganisation tooling.\n\n\
                  Re-running against the same catalog skips rehashing of directories that \
                  were already completed, while still discovering newly added subdirectories.",
    after_help = "EXAMPLES:\n    \
        hashwalk ~/Pictures -o pictures.db\n    \
        hashwalk /mnt/photos /mnt/backup -w 16\n    \
        hashwalk ~/Pictures --ignore '*.backupdb' --ignore '.cache'\n    \
        hashwalk ~/Pictures --queue-size 100000   # bound memory on very wide trees"
)]
pub struct CliArgs {
    /// Root directories to catalog
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Output catalog file
    #[arg(short, long, default_value = "catalog.db", value_name = "FILE")]
    pub output: PathBuf,

    /// Number of scanner worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Work queue capacity; 0 means unbounded
    #[arg(long, default_value = "0", value_name = "NUM")]
    pub queue_size: usize,

    /// Writer queue capacity; 0 means unbounded
    #[arg(long, default_value = "1000", value_name = "NUM")]
    pub writer_queue_size: usize,

    /// Seconds a worker waits on an empty queue before finishing
    #[arg(long, default_value = "60", value_name = "SECS")]
    pub idle_timeout: u64,

    /// Store writer batch size
    #[arg(short = 'b', long, default_value = "1000", value_name = "NUM")]
    pub batch_size: usize,

    /// Ignore directories whose name matches this glob (can be repeated).
    /// `*.backupdb` is skipped by default: Time Machine backup bundles use
    /// directory hard links that make rescanning them pointless.
    #[arg(long = "ignore", value_name = "GLOB", default_value = "*.backupdb", action = clap::ArgAction::Append)]
    pub ignore_patterns: Vec<String>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (per-directory logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    // Hashing is I/O bound on most storage, so oversubscribe the cores
    num_cpus::get() * 2
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Canonicalized absolute root paths
    pub roots: Vec<PathBuf>,

    /// Output catalog path
    pub output_path: PathBuf,

    /// Number of scanner workers
    pub worker_count: usize,

    /// Work queue capacity (None = unbounded)
    pub queue_capacity: Option<usize>,

    /// Writer queue capacity (None = unbounded)
    pub writer_queue_capacity: Option<usize>,

    /// Idle window after which a worker finishes
    pub idle_timeout: Duration,

    /// Store writer batch size
    pub batch_size: usize,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,

    /// Compiled ignore globs, matched against directory names
    pub ignore: GlobSet,

    /// Source patterns for the compiled set (for logging and metadata)
    pub ignore_patterns: Vec<String>,
}

impl ScanConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        if args.batch_size < MIN_BATCH_SIZE || args.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize {
                size: args.batch_size,
                min: MIN_BATCH_SIZE,
                max: MAX_BATCH_SIZE,
            });
        }

        // Resolve roots to absolute form; every queued path derives from
        // these, so the whole catalog is keyed on absolute paths
        let mut roots = Vec::with_capacity(args.paths.len());
        for path in &args.paths {
            let canonical = path
                .canonicalize()
                .map_err(|e| ConfigError::InvalidRoot {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            if !canonical.is_dir() {
                return Err(ConfigError::InvalidRoot {
                    path: path.clone(),
                    reason: "not a directory".into(),
                });
            }
            roots.push(canonical);
        }

        if let Some(parent) = args.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidOutputPath {
                    path: args.output.clone(),
                    reason: format!("Parent directory '{}' does not exist", parent.display()),
                });
            }
        }

        let ignore = compile_ignore_patterns(&args.ignore_patterns)?;

        Ok(Self {
            roots,
            output_path: args.output,
            worker_count: args.workers,
            queue_capacity: capacity_option(args.queue_size),
            writer_queue_capacity: capacity_option(args.writer_queue_size),
            idle_timeout: Duration::from_secs(args.idle_timeout),
            batch_size: args.batch_size,
            show_progress: !args.quiet,
            verbose: args.verbose,
            ignore,
            ignore_patterns: args.ignore_patterns,
        })
    }

    /// Check if a directory name matches an ignore pattern
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.is_match(name)
    }
}

/// Translate a CLI capacity value: 0 means unbounded
fn capacity_option(size: usize) -> Option<usize> {
    if size == 0 {
        None
    } else {
        Some(size)
    }
}

/// Compile glob patterns into a matcher over directory names
pub fn compile_ignore_patterns(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidIgnorePattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ConfigError::InvalidIgnorePattern {
            pattern: patterns.join(","),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn base_args(root: PathBuf) -> CliArgs {
        CliArgs {
            paths: vec![root],
            output: PathBuf::from("catalog.db"),
            workers: 4,
            queue_size: 0,
            writer_queue_size: 1000,
            idle_timeout: 60,
            batch_size: 1000,
            ignore_patterns: vec!["*.backupdb".into()],
            quiet: true,
            verbose: false,
        }
    }

    #[test]
    fn test_valid_config() {
        let dir = tempdir().unwrap();
        let config = ScanConfig::from_args(base_args(dir.path().to_path_buf())).unwrap();

        assert_eq!(config.worker_count, 4);
        assert_eq!(config.queue_capacity, None);
        assert_eq!(config.writer_queue_capacity, Some(1000));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert!(config.roots[0].is_absolute());
    }

    #[test]
    fn test_invalid_worker_count() {
        let dir = tempdir().unwrap();
        let mut args = base_args(dir.path().to_path_buf());
        args.workers = 0;
        assert!(matches!(
            ScanConfig::from_args(args),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
    }

    #[test]
    fn test_missing_root() {
        let dir = tempdir().unwrap();
        let args = base_args(dir.path().join("does-not-exist"));
        assert!(matches!(
            ScanConfig::from_args(args),
            Err(ConfigError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("plain.txt");
        std::fs::write(&file_path, b"x").unwrap();
        let args = base_args(file_path);
        assert!(matches!(
            ScanConfig::from_args(args),
            Err(ConfigError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn test_bad_ignore_pattern() {
        let err = compile_ignore_patterns(&["[".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIgnorePattern { .. }));
    }

    #[test]
    fn test_ignore_matching() {
        let dir = tempdir().unwrap();
        let mut args = base_args(dir.path().to_path_buf());
        args.ignore_patterns = vec!["*.backupdb".into(), ".cache".into()];
        let config = ScanConfig::from_args(args).unwrap();

        assert!(config.is_ignored("photos.backupdb"));
        assert!(config.is_ignored(".cache"));
        assert!(!config.is_ignored("photos"));
        assert!(!config.is_ignored("cache"));
    }
}
