//! Test fixtures: scratch directories, deterministic payloads and digests.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// Create a scratch directory removed when the handle drops.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn temp_dir() -> io::Result<TempDir> {
    tempfile::Builder::new().prefix("stowage-test-").tempdir()
}

/// Deterministic pseudo-random payload of `len` bytes; the same seed yields the same bytes.
#[must_use]
pub fn payload_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bytes = vec![0_u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

/// Lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: impl AsRef<Path>) -> io::Result<String> {
    std::fs::read(path).map(|bytes| sha256_hex(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_are_deterministic_per_seed() {
        assert_eq!(payload_bytes(64, 9), payload_bytes(64, 9));
        assert_ne!(payload_bytes(64, 9), payload_bytes(64, 10));
        assert!(payload_bytes(0, 1).is_empty());
    }

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_digest_matches_bytes() -> io::Result<()> {
        let dir = temp_dir()?;
        let path = dir.path().join("payload.bin");
        let bytes = payload_bytes(1_000, 4);
        std::fs::write(&path, &bytes)?;
        assert_eq!(sha256_file(&path)?, sha256_hex(&bytes));
        Ok(())
    }
}
