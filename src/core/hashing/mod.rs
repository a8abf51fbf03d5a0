// ─── Content hashing ───
// MD5 verification of extracted files against the catalog's digest list.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::Deserialize;
use tracing::debug;

use crate::core::error::{InstallerError, InstallerResult};

/// One (relative file path, MD5 hex digest) pair from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct FileHash {
    pub file: String,
    pub hash: String,
}

/// Outcome of verifying one unit's extracted files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Every expected digest matched.
    Verified,
    /// First file whose digest did not match (or which was missing).
    Mismatch(PathBuf),
    /// No digests were supplied; nothing was checked.
    Unverified,
}

/// MD5 of a byte slice as a lowercase hex string.
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Verify extracted files under `root` against the expected digest list.
///
/// Fail-fast: stops at the first mismatch. A named file that does not exist
/// is a mismatch, not an IO error — the archive simply did not contain what
/// the catalog promised. Other read failures surface as [`InstallerError::Io`].
pub async fn verify_files(root: &Path, expected: &[FileHash]) -> InstallerResult<VerifyResult> {
    if expected.is_empty() {
        return Ok(VerifyResult::Unverified);
    }

    for entry in expected {
        let path = root.join(&entry.file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(VerifyResult::Mismatch(PathBuf::from(&entry.file)));
            }
            Err(source) => return Err(InstallerError::Io { path, source }),
        };

        let actual = md5_hex(&bytes);
        if !actual.eq_ignore_ascii_case(&entry.hash) {
            debug!(
                "Digest mismatch for {}: expected {}, got {}",
                entry.file, entry.hash, actual
            );
            return Ok(VerifyResult::Mismatch(PathBuf::from(&entry.file)));
        }
    }

    Ok(VerifyResult::Verified)
}
