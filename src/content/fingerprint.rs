//! Content fingerprinting using BLAKE3
//!
//! A fingerprint is a fixed-length hex digest over a file's full byte
//! content, used as a stable identity key for duplicate detection. The
//! scanner only sees the `Fingerprinter` trait, so the digest algorithm
//! can be swapped without touching the traversal engine.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer size for streaming file content through the hasher
const CHUNK_SIZE: usize = 64 * 1024;

/// A content-fingerprint function: full file bytes to a fixed-length
/// hex digest string
pub trait Fingerprinter: Send + Sync {
    /// Hash the file at `path` by streaming its content
    fn fingerprint_file(&self, path: &Path) -> io::Result<String>;
}

/// Default fingerprinter: BLAKE3, streamed in 64 KiB chunks
///
/// Produces a 64-character hex digest. BLAKE3 is fast enough that the
/// scan stays I/O bound on ordinary storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Fingerprinter;

impl Fingerprinter for Blake3Fingerprinter {
    fn fingerprint_file(&self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = blake3::Hasher::new();
        let mut buf = [0u8; CHUNK_SIZE];

        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// Compute the fingerprint of an in-memory buffer
///
/// Matches `Blake3Fingerprinter::fingerprint_file` over the same bytes;
/// handy for verification in tests and downstream tooling.
///
/// # Example
///
/// ```
/// use hashwalk::content::fingerprint_bytes;
///
/// let digest = fingerprint_bytes(b"Hello, World!");
/// assert_eq!(digest.len(), 64); // 256-bit hash = 32 bytes = 64 hex chars
/// ```
pub fn fingerprint_bytes(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}
