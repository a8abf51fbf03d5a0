// ─── Archive extraction ───
// Extracts a downloaded zip into a target directory, rejecting entries that
// would escape it. Returns the relative paths of every file written.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::ExtractError;

/// Extract `archive_bytes` (a zip container) into `target_dir`.
///
/// Entry names are validated up front: if any entry resolves outside
/// `target_dir`, the whole call fails with [`ExtractError::PathTraversal`]
/// before a single byte reaches disk. Existing files are overwritten
/// (last-install-wins) and intermediate directories are created as needed.
/// A write failure partway removes the files this call already wrote, so a
/// failed extraction never leaves a partial unit behind.
pub fn extract(target_dir: &Path, archive_bytes: &[u8]) -> Result<Vec<PathBuf>, ExtractError> {
    let cursor = std::io::Cursor::new(archive_bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| ExtractError::CorruptArchive(e.to_string()))?;

    // Pass 1: validate every entry name before touching the filesystem.
    let mut entries: Vec<(usize, PathBuf, bool)> = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive
            .by_index(i)
            .map_err(|e| ExtractError::CorruptArchive(e.to_string()))?;
        let raw_name = file.name().to_string();
        let Some(relative) = file.enclosed_name() else {
            return Err(ExtractError::PathTraversal(raw_name));
        };
        entries.push((i, relative, file.is_dir()));
    }

    // Pass 2: write.
    let mut written = Vec::new();
    let mut created_dirs: Vec<PathBuf> = Vec::new();
    for (index, relative, is_dir) in entries {
        let dest = target_dir.join(&relative);

        if is_dir {
            if let Err(source) = std::fs::create_dir_all(&dest) {
                cleanup_partial(target_dir, &written, &created_dirs);
                return Err(ExtractError::IoFailure { path: dest, source });
            }
            created_dirs.push(relative);
            continue;
        }

        if let Some(parent) = relative.parent().filter(|p| !p.as_os_str().is_empty()) {
            let parent_dest = target_dir.join(parent);
            if let Err(source) = std::fs::create_dir_all(&parent_dest) {
                cleanup_partial(target_dir, &written, &created_dirs);
                return Err(ExtractError::IoFailure {
                    path: parent_dest,
                    source,
                });
            }
            created_dirs.push(parent.to_path_buf());
        }

        let mut file = archive
            .by_index(index)
            .map_err(|e| ExtractError::CorruptArchive(e.to_string()))?;
        let mut bytes = Vec::with_capacity(file.size() as usize);
        if let Err(e) = file.read_to_end(&mut bytes) {
            cleanup_partial(target_dir, &written, &created_dirs);
            return Err(ExtractError::CorruptArchive(e.to_string()));
        }

        if let Err(source) = std::fs::write(&dest, &bytes) {
            cleanup_partial(target_dir, &written, &created_dirs);
            return Err(ExtractError::IoFailure { path: dest, source });
        }

        written.push(relative);
    }

    debug!(
        "Extracted {} files into {:?}",
        written.len(),
        target_dir
    );
    Ok(written)
}

/// Undo a partial extraction: delete the files written so far, then any
/// directories this call created that are empty afterwards, innermost first.
fn cleanup_partial(target_dir: &Path, written: &[PathBuf], created_dirs: &[PathBuf]) {
    for relative in written {
        let _ = std::fs::remove_file(target_dir.join(relative));
    }

    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in created_dirs {
        let mut current: Option<&Path> = Some(dir.as_path());
        while let Some(d) = current {
            if d.as_os_str().is_empty() {
                break;
            }
            dirs.push(d.to_path_buf());
            current = d.parent();
        }
    }
    dirs.sort();
    dirs.dedup();
    dirs.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
    for dir in dirs {
        let _ = std::fs::remove_dir(target_dir.join(dir));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[
            ("info.dat", b"{}"),
            ("audio/song.ogg", b"audio"),
        ]);

        let written = extract(dir.path(), &bytes).unwrap();
        assert_eq!(
            written,
            vec![PathBuf::from("info.dat"), PathBuf::from("audio/song.ogg")]
        );
        assert_eq!(
            std::fs::read(dir.path().join("audio/song.ogg")).unwrap(),
            b"audio"
        );
    }

    #[test]
    fn overwrites_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("info.dat"), b"old").unwrap();

        let bytes = build_zip(&[("info.dat", b"new")]);
        extract(dir.path(), &bytes).unwrap();
        assert_eq!(std::fs::read(dir.path().join("info.dat")).unwrap(), b"new");
    }

    #[test]
    fn rejects_traversal_before_writing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[
            ("safe.txt", b"ok"),
            ("../evil.txt", b"nope"),
        ]);

        let err = extract(dir.path(), &bytes).unwrap_err();
        assert!(matches!(err, ExtractError::PathTraversal(_)));
        // The valid entry preceding the traversal entry must not exist either.
        assert!(!dir.path().join("safe.txt").exists());
        assert!(!dir.path().parent().unwrap().join("evil.txt").exists());
    }

    #[test]
    fn failed_write_cleans_up_partial_extraction() {
        let dir = tempfile::tempdir().unwrap();
        // "a" lands as a file first, then "a/b.txt" needs "a" as a directory,
        // so the second entry fails to write.
        let bytes = build_zip(&[("a", b"x"), ("a/b.txt", b"y")]);

        let err = extract(dir.path(), &bytes).unwrap_err();
        assert!(matches!(err, ExtractError::IoFailure { .. }));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn garbage_bytes_are_a_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract(dir.path(), b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::CorruptArchive(_)));
    }
}
