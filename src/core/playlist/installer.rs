use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::{info, warn};

use super::model::Playlist;
use crate::core::cancel::CancelToken;
use crate::core::catalog::InstallUnit;
use crate::core::downloader::BatchDownloader;
use crate::core::error::{FetchError, InstallerError, InstallerResult};
use crate::core::pipeline::InstallationPipeline;
use crate::core::progress::{Phase, Progress};

const PLAYLISTS_DIR: &str = "Playlists";
const CUSTOM_LEVELS_DIR: &str = "Beat Saber_Data/CustomLevels";

/// Installs playlists: persists the manifest, resolves every song against
/// the catalog and drives the pipeline over the resolved units.
pub struct PlaylistInstaller {
    downloader: BatchDownloader,
    pipeline: InstallationPipeline,
}

impl PlaylistInstaller {
    pub fn new(client: Client, pipeline: InstallationPipeline) -> Self {
        Self {
            downloader: BatchDownloader::new(client),
            pipeline,
        }
    }

    /// Download a playlist manifest and install its maps. Returns `false` on
    /// any failure; the persisted manifest is kept either way so the user
    /// can retry.
    pub async fn install_from_url(
        &self,
        install_dir: &Path,
        url: &str,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> bool {
        let result = self.run_from_url(install_dir, url, progress, cancel).await;
        finish(result)
    }

    /// Install a playlist from a local manifest file. The manifest is copied
    /// into the playlists directory before anything else happens.
    pub async fn install_from_file(
        &self,
        install_dir: &Path,
        file_path: &Path,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> bool {
        let result = self
            .run_from_file(install_dir, file_path, progress, cancel)
            .await;
        finish(result)
    }

    async fn run_from_url(
        &self,
        install_dir: &Path,
        url: &str,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> InstallerResult<()> {
        let bytes = self
            .downloader
            .fetch(url, cancel)
            .await
            .map_err(|e| fail(progress, fetch_error(e)))?;

        let file_name = manifest_file_name(url);
        self.persist_manifest(install_dir, &file_name, &bytes)
            .await
            .map_err(|e| fail(progress, e))?;

        self.install_manifest(install_dir, &bytes, progress, cancel)
            .await
    }

    async fn run_from_file(
        &self,
        install_dir: &Path,
        file_path: &Path,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> InstallerResult<()> {
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|source| {
                fail(
                    progress,
                    InstallerError::Io {
                        path: file_path.to_path_buf(),
                        source,
                    },
                )
            })?;

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "playlist.bplist".to_string());
        self.persist_manifest(install_dir, &file_name, &bytes)
            .await
            .map_err(|e| fail(progress, e))?;

        self.install_manifest(install_dir, &bytes, progress, cancel)
            .await
    }

    /// Parse the manifest, resolve every song eagerly (all-or-nothing), then
    /// hand the units to the pipeline. The pipeline emits the final phase
    /// for its own failures; earlier failures emit it here.
    async fn install_manifest(
        &self,
        install_dir: &Path,
        manifest_bytes: &[u8],
        progress: &Progress,
        cancel: &CancelToken,
    ) -> InstallerResult<()> {
        let playlist: Playlist = serde_json::from_slice(manifest_bytes)
            .map_err(|e| fail(progress, InstallerError::Json(e)))?;
        info!(
            "Installing playlist '{}' ({} songs)",
            playlist.title,
            playlist.songs.len()
        );

        let identifiers: Vec<String> =
            playlist.songs.iter().map(|song| song.id.clone()).collect();
        let mut units = self
            .pipeline
            .resolve_units(&identifiers, progress, cancel)
            .await
            .map_err(|e| fail(progress, e))?;

        for unit in &mut units {
            unit.subdir = Some(map_subdir(unit));
        }

        self.pipeline
            .install_units(install_dir, units, progress, cancel)
            .await
    }

    /// Write the manifest bytes verbatim under `<installDir>/Playlists`.
    /// This happens before any resolution, so a failed install still leaves
    /// the manifest behind.
    async fn persist_manifest(
        &self,
        install_dir: &Path,
        file_name: &str,
        bytes: &[u8],
    ) -> InstallerResult<PathBuf> {
        let playlists_dir = install_dir.join(PLAYLISTS_DIR);
        tokio::fs::create_dir_all(&playlists_dir)
            .await
            .map_err(|source| InstallerError::Io {
                path: playlists_dir.clone(),
                source,
            })?;

        let path = playlists_dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| InstallerError::Io {
                path: path.clone(),
                source,
            })?;

        info!("Persisted playlist manifest to {:?}", path);
        Ok(path)
    }
}

fn finish(result: InstallerResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Playlist installation failed: {}", e);
            false
        }
    }
}

/// Emit the final `Failed` phase for errors that never reach the pipeline.
fn fail(progress: &Progress, error: InstallerError) -> InstallerError {
    progress.phase(Phase::Failed);
    error
}

fn fetch_error(error: FetchError) -> InstallerError {
    match error {
        FetchError::Cancelled { .. } => InstallerError::Cancelled,
        e => InstallerError::Fetch(e),
    }
}

/// Per-map extraction folder under the custom-levels directory,
/// `<id> (<name>)` with filesystem-reserved characters replaced.
fn map_subdir(unit: &InstallUnit) -> PathBuf {
    let folder = sanitize(&format!("{} ({})", unit.identifier, unit.display_name));
    PathBuf::from(CUSTOM_LEVELS_DIR).join(folder)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// Last path segment of the manifest URL, query and fragment stripped.
fn manifest_file_name(url: &str) -> String {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    match trimmed.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => "playlist.bplist".to_string(),
    }
}
