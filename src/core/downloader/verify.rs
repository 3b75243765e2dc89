use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use crate::core::error::{InstallerError, InstallerResult};

/// Read size while hashing.
const BLOCK_SIZE: usize = 8192;

/// Result of checking a downloaded file against the configured digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// No digest configured; the file was not read.
    NotConfigured,
    Match,
    Mismatch { actual: String },
    ComputeError(String),
}

impl Verification {
    /// Whether setup may continue without asking the user.
    pub fn passed(&self) -> bool {
        matches!(self, Verification::NotConfigured | Verification::Match)
    }
}

/// Lowercase hex SHA-256 of a file, read block by block.
pub fn sha256_file(path: &Path) -> InstallerResult<String> {
    let mut file = File::open(path).map_err(|e| InstallerError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BLOCK_SIZE];

    loop {
        let n = file.read(&mut buf).map_err(|e| InstallerError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compares the SHA-256 of `file` with `expected_hex` (case-insensitive).
///
/// Hashing runs on the blocking pool.
pub async fn verify(file: &Path, expected_hex: &str) -> Verification {
    let expected = expected_hex.trim().to_ascii_lowercase();
    if expected.is_empty() {
        debug!("No checksum configured, skipping verification of {:?}", file);
        return Verification::NotConfigured;
    }

    let path: PathBuf = file.to_path_buf();
    let computed = tokio::task::spawn_blocking(move || sha256_file(&path)).await;

    match computed {
        Ok(Ok(actual)) if actual == expected => {
            debug!("Checksum verified for {:?}", file);
            Verification::Match
        }
        Ok(Ok(actual)) => {
            warn!(
                "Checksum mismatch for {:?}: expected {}, got {}",
                file, expected, actual
            );
            Verification::Mismatch { actual }
        }
        Ok(Err(e)) => {
            error!("Failed to hash {:?}: {}", file, e);
            Verification::ComputeError(e.to_string())
        }
        Err(e) => {
            error!("Hashing task failed: {}", e);
            Verification::ComputeError(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello world")
    const HELLO: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[tokio::test]
    async fn empty_digest_passes_without_reading() {
        let tmp = tempfile::tempdir().unwrap();
        // The file does not even exist.
        let outcome = verify(&tmp.path().join("absent.jar"), "").await;
        assert_eq!(outcome, Verification::NotConfigured);
        assert!(outcome.passed());
    }

    #[tokio::test]
    async fn matching_digest_any_case() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("client.jar");
        std::fs::write(&file, b"hello world").unwrap();

        assert_eq!(verify(&file, HELLO).await, Verification::Match);
        assert_eq!(
            verify(&file, &HELLO.to_ascii_uppercase()).await,
            Verification::Match
        );
    }

    #[tokio::test]
    async fn mismatch_reports_actual_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("client.jar");
        std::fs::write(&file, b"hello world!").unwrap();

        match verify(&file, HELLO).await {
            Verification::Mismatch { actual } => {
                assert_eq!(actual.len(), 64);
                assert_ne!(actual, HELLO);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_file_is_a_compute_error() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = verify(&tmp.path().join("absent.jar"), HELLO).await;
        assert!(matches!(outcome, Verification::ComputeError(_)));
        assert!(!outcome.passed());
    }

    #[test]
    fn hashing_is_deterministic_across_block_boundaries() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("big.bin");
        let data: Vec<u8> = (0..3 * BLOCK_SIZE + 17).map(|i| (i % 97) as u8).collect();
        std::fs::write(&file, &data).unwrap();

        let first = sha256_file(&file).unwrap();
        let second = sha256_file(&file).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, hex::encode(Sha256::digest(&data)));
    }

    #[test]
    fn known_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("hello.txt");
        std::fs::write(&file, b"hello world").unwrap();
        assert_eq!(sha256_file(&file).unwrap(), HELLO);
    }
}
