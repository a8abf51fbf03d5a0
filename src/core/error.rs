use std::path::PathBuf;
use thiserror::Error;

/// Catalog resolution failures.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("identifier not found in catalog: {0}")]
    NotFound(String),

    #[error("catalog unreachable: {0}")]
    Unavailable(String),

    #[error("malformed catalog response for {identifier}: {reason}")]
    MalformedResponse { identifier: String, reason: String },
}

/// Download failures for a single fetch item.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("fetch failed for {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("fetch cancelled for {url}")]
    Cancelled { url: String },
}

/// Archive extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("archive entry escapes target directory: {0}")]
    PathTraversal(String),

    #[error("write failed at {path:?}: {source}")]
    IoFailure {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Central error type for the installation pipeline.
/// Every component-level failure is carried up as a typed variant.
#[derive(Debug, Error)]
pub enum InstallerError {
    // ── Components ──────────────────────────────────────
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("MD5 mismatch for {path:?}")]
    HashMismatch { path: PathBuf },

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Control ─────────────────────────────────────────
    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type InstallerResult<T> = Result<T, InstallerError>;
