//! Content identity for catalog entries

pub mod fingerprint;

pub use fingerprint::{fingerprint_bytes, Blake3Fingerprinter, Fingerprinter};
