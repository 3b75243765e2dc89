//! Payload transfer and integrity check.

pub mod client;
pub mod verify;

pub use client::{DownloadOutcome, DownloadRequest, Downloader, CHUNK_SIZE};
pub use verify::{sha256_file, verify, Verification};
