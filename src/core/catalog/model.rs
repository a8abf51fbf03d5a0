use std::path::PathBuf;

use serde::Deserialize;

use crate::core::hashing::FileHash;

/// One catalog record: an identifier plus its version-ordered download list.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub versions: Vec<CatalogVersion>,
}

/// A single downloadable version of a catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogVersion {
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    /// Relative file paths and their MD5 digests; empty means the catalog
    /// supplies no digests and verification is skipped.
    #[serde(rename = "hashMd5", default)]
    pub hashes: Vec<FileHash>,
}

/// One remote source for one install unit. Produced fresh per resolution,
/// never persisted.
#[derive(Debug, Clone)]
pub struct DownloadDescriptor {
    pub url: String,
    pub expected_hashes: Vec<FileHash>,
    /// Human-readable source label for logging.
    pub label: String,
}

/// The unit of atomic installation: one map or one mod version. Either every
/// file of the unit lands verified on disk, or none remain after the attempt.
#[derive(Debug, Clone)]
pub struct InstallUnit {
    /// Opaque catalog key.
    pub identifier: String,
    /// Human label for progress reporting.
    pub display_name: String,
    /// Ordered fallback sources; the first successful fetch wins.
    pub descriptors: Vec<DownloadDescriptor>,
    /// Extraction root relative to the install directory. `None` extracts
    /// into the install directory itself (mods); maps extract into their
    /// own folder under the custom-levels directory.
    pub subdir: Option<PathBuf>,
}

impl InstallUnit {
    /// Ordered URL list across all descriptors, for the downloader.
    pub fn urls(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.url.clone()).collect()
    }

    /// Descriptor that served `url`. Falls back to the first descriptor
    /// when the URL is not recognized.
    pub fn descriptor_for(&self, url: &str) -> Option<&DownloadDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.url == url)
            .or_else(|| self.descriptors.first())
    }

    /// Expected digests for the descriptor that served `url`.
    pub fn expected_hashes_for(&self, url: &str) -> &[FileHash] {
        self.descriptor_for(url)
            .map(|d| d.expected_hashes.as_slice())
            .unwrap_or(&[])
    }
}
