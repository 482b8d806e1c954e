//! Content hashing and hash verification of game files.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// SHA-256 of a file as lowercase hex, streamed so large archives are not loaded whole.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Outcome of checking a file against its expected hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Ok,
    Mismatch { actual: String },
    Missing,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityChecker;

impl IntegrityChecker {
    pub fn new() -> Self {
        IntegrityChecker
    }

    pub fn digest(&self, path: &Path) -> io::Result<String> {
        hash_file(path)
    }

    /// Compare the file at `path` with `expected`, ignoring hex case.
    ///
    /// A missing file is reported as [`Verification::Missing`]; any other read
    /// failure is returned as an error.
    pub fn verify(&self, path: &Path, expected: &str) -> io::Result<Verification> {
        if !path.is_file() {
            return Ok(Verification::Missing);
        }
        let actual = match hash_file(path) {
            Ok(actual) => actual,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Verification::Missing),
            Err(e) => return Err(e),
        };
        if actual.eq_ignore_ascii_case(expected.trim()) {
            Ok(Verification::Ok)
        } else {
            Ok(Verification::Mismatch { actual })
        }
    }
}
