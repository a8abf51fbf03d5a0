// ─── Installation pipeline ───
// Orchestrates resolve → download → extract → verify per install unit.
// A unit either installs completely or leaves the target directory as it
// was; the first failing unit aborts the rest of the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::{pin_mut, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::archive;
use crate::core::cancel::CancelToken;
use crate::core::catalog::{CatalogResolver, InstallUnit};
use crate::core::downloader::{BatchDownloader, FetchItem};
use crate::core::error::{FetchError, InstallerError, InstallerResult};
use crate::core::hashing::{self, VerifyResult};
use crate::core::progress::{Phase, Progress};

/// Per-directory run locks. Two installation runs against the same install
/// directory must never interleave their writes.
#[derive(Debug, Clone, Default)]
struct DirLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl DirLocks {
    async fn lock(&self, dir: &Path) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Evict idle entries so the map does not grow forever. An entry
            // whose only Arc is the map's own copy has no holder and no
            // waiter; clones are only taken while the map mutex is held, so
            // the count cannot change under us here.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(dir.to_path_buf()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Drives install units through
/// `Resolved → Downloading → Extracting → Verifying → Installed | Failed`.
///
/// Cloning shares the resolver, the HTTP client and the per-directory locks,
/// so clones still serialize runs against the same directory.
#[derive(Clone)]
pub struct InstallationPipeline {
    resolver: Arc<dyn CatalogResolver>,
    downloader: BatchDownloader,
    locks: DirLocks,
}

impl InstallationPipeline {
    pub fn new(resolver: Arc<dyn CatalogResolver>, client: reqwest::Client) -> Self {
        Self {
            resolver,
            downloader: BatchDownloader::new(client),
            locks: DirLocks::default(),
        }
    }

    /// Resolve every identifier eagerly, in order. All-or-nothing: the first
    /// resolution failure fails the whole call and nothing is downloaded.
    pub async fn resolve_units(
        &self,
        identifiers: &[String],
        progress: &Progress,
        cancel: &CancelToken,
    ) -> InstallerResult<Vec<InstallUnit>> {
        progress.phase(Phase::Resolving);
        let mut units = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            if cancel.is_cancelled() {
                return Err(InstallerError::Cancelled);
            }
            units.push(self.resolver.resolve(identifier).await?);
        }
        Ok(units)
    }

    /// Resolve and install `identifiers` into `install_dir`. The mod-install
    /// entry point: units extract into the install directory root.
    pub async fn install(
        &self,
        install_dir: &Path,
        identifiers: &[String],
        progress: &Progress,
        cancel: &CancelToken,
    ) -> InstallerResult<()> {
        let units = match self.resolve_units(identifiers, progress, cancel).await {
            Ok(units) => units,
            Err(e) => {
                warn!("Resolution failed: {}", e);
                progress.phase(Phase::Failed);
                return Err(e);
            }
        };
        self.install_units(install_dir, units, progress, cancel).await
    }

    /// Install already-resolved units sequentially. Always ends by emitting
    /// a final `Completed` or `Failed` phase. Holds the per-directory run
    /// lock for the whole run.
    pub async fn install_units(
        &self,
        install_dir: &Path,
        units: Vec<InstallUnit>,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> InstallerResult<()> {
        let _guard = self.locks.lock(install_dir).await;

        let result = self.run_units(install_dir, units, progress, cancel).await;
        match &result {
            Ok(()) => progress.phase(Phase::Completed),
            Err(e) => {
                warn!("Installation run failed: {}", e);
                progress.phase(Phase::Failed);
            }
        }
        result
    }

    async fn run_units(
        &self,
        install_dir: &Path,
        units: Vec<InstallUnit>,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> InstallerResult<()> {
        let items: Vec<FetchItem> = units
            .iter()
            .map(|unit| FetchItem {
                display_name: unit.display_name.clone(),
                urls: unit.urls(),
            })
            .collect();

        let outcomes = self.downloader.fetch_sequence(items, progress, cancel);
        pin_mut!(outcomes);

        for unit in &units {
            progress.phase(Phase::Downloading);
            let Some(outcome) = outcomes.next().await else {
                return Err(InstallerError::Other(format!(
                    "download sequence ended before '{}'",
                    unit.display_name
                )));
            };

            let bytes = outcome.result.map_err(|e| match e {
                FetchError::Cancelled { .. } => InstallerError::Cancelled,
                e => InstallerError::Fetch(e),
            })?;

            self.install_unit_bytes(install_dir, unit, &outcome.url, &bytes, progress, cancel)
                .await?;
            let source = unit
                .descriptor_for(&outcome.url)
                .map(|d| d.label.as_str())
                .unwrap_or("unknown source");
            info!("Installed '{}' from {}", unit.display_name, source);
        }

        Ok(())
    }

    /// Extract one fetched archive and gate it on the expected digests.
    /// Any failure after bytes hit the disk rolls the unit back.
    async fn install_unit_bytes(
        &self,
        install_dir: &Path,
        unit: &InstallUnit,
        source_url: &str,
        bytes: &[u8],
        progress: &Progress,
        cancel: &CancelToken,
    ) -> InstallerResult<()> {
        if cancel.is_cancelled() {
            return Err(InstallerError::Cancelled);
        }
        progress.phase(Phase::Installing);

        let target = match &unit.subdir {
            Some(subdir) => install_dir.join(subdir),
            None => install_dir.to_path_buf(),
        };
        tokio::fs::create_dir_all(&target)
            .await
            .map_err(|source| InstallerError::Io {
                path: target.clone(),
                source,
            })?;

        let written = match archive::extract(&target, bytes) {
            Ok(written) => written,
            Err(e) => {
                // Extraction already removed its partial writes; drop the
                // unit's now-empty folder chain too.
                rollback_unit(install_dir, &target, &[]);
                return Err(e.into());
            }
        };

        if cancel.is_cancelled() {
            rollback_unit(install_dir, &target, &written);
            return Err(InstallerError::Cancelled);
        }

        let expected = unit.expected_hashes_for(source_url);
        match hashing::verify_files(&target, expected).await? {
            VerifyResult::Verified => Ok(()),
            VerifyResult::Unverified => {
                debug!(
                    "No digests supplied for '{}', skipping verification",
                    unit.display_name
                );
                Ok(())
            }
            VerifyResult::Mismatch(path) => {
                rollback_unit(install_dir, &target, &written);
                Err(InstallerError::HashMismatch { path })
            }
        }
    }
}

/// Delete the files a failed unit wrote and prune any directories that are
/// empty afterwards, up to (but excluding) the install directory itself.
fn rollback_unit(install_dir: &Path, target: &Path, written: &[PathBuf]) {
    for relative in written {
        let _ = std::fs::remove_file(target.join(relative));
    }

    // Innermost directories first so empty chains collapse.
    let mut dirs: Vec<PathBuf> = written
        .iter()
        .filter_map(|relative| relative.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect();
    dirs.sort();
    dirs.dedup();
    dirs.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
    for dir in dirs {
        let mut current: Option<&Path> = Some(dir.as_path());
        while let Some(d) = current {
            if d.as_os_str().is_empty() {
                break;
            }
            let _ = std::fs::remove_dir(target.join(d));
            current = d.parent();
        }
    }

    // Remove the unit's own folder chain if it is empty now.
    let mut current = target.to_path_buf();
    while current != *install_dir && current.starts_with(install_dir) {
        if std::fs::remove_dir(&current).is_err() {
            break;
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_on_the_same_directory_are_serialized() {
        let locks = DirLocks::default();
        let dir = PathBuf::from("install");

        let guard = locks.lock(&dir).await;
        let contender = {
            let locks = locks.clone();
            let dir = dir.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&dir).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn idle_lock_entries_are_evicted() {
        let locks = DirLocks::default();
        let guard = locks.lock(Path::new("first")).await;
        drop(guard);

        let _held = locks.lock(Path::new("second")).await;

        let map = locks.inner.lock().await;
        assert!(!map.contains_key(Path::new("first")));
        assert!(map.contains_key(Path::new("second")));
    }

    #[test]
    fn rollback_removes_files_and_empty_directories() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("CustomLevels").join("abcd (Song)");
        std::fs::create_dir_all(target.join("audio")).unwrap();
        std::fs::write(target.join("info.dat"), b"{}").unwrap();
        std::fs::write(target.join("audio/song.ogg"), b"audio").unwrap();

        rollback_unit(
            root.path(),
            &target,
            &[PathBuf::from("info.dat"), PathBuf::from("audio/song.ogg")],
        );

        assert!(!target.exists());
        assert!(!root.path().join("CustomLevels").exists());
        assert!(root.path().exists());
    }

    #[test]
    fn rollback_keeps_directories_with_foreign_files() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().to_path_buf();
        std::fs::write(target.join("mine.dll"), b"x").unwrap();
        std::fs::write(target.join("theirs.dll"), b"y").unwrap();

        rollback_unit(root.path(), &target, &[PathBuf::from("mine.dll")]);

        assert!(!target.join("mine.dll").exists());
        assert!(target.join("theirs.dll").exists());
    }
}
