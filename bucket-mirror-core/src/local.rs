//! Local side of the mirror: listing the sync root and mapping keys back to paths.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{MirrorError, Result};

/// Lists every non-directory entry under `root` as a key relative to `root`.
///
/// Keys always use `/` as separator so they compare equal to object keys.
/// Directories are omitted. Symlinks are never followed; a link (to a file or
/// a directory), socket or FIFO is reported as a present key of its own.
pub fn scan_dir(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|source| MirrorError::LocalScan {
            root: root.to_path_buf(),
            source,
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            debug!(path = %entry.path().display(), "Listing non-regular entry as present");
        }

        match entry.path().strip_prefix(root) {
            Ok(relative) => files.push(path_to_key(relative)),
            Err(_) => {
                debug!(path = %entry.path().display(), "Skipping entry outside of sync root");
            }
        }
    }

    info!(root = %root.display(), files = files.len(), "Scanned local files");
    Ok(files)
}

/// Joins the components of a relative path with `/`.
pub fn path_to_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolves an object key to a destination path under `root`.
///
/// Keys are split on `/` only. Anything that would land outside `root`
/// (absolute keys, `..`, empty segments) is refused.
pub fn key_to_path(root: &Path, key: &str) -> Result<PathBuf> {
    if key.is_empty() || key.starts_with('/') {
        return Err(MirrorError::UnsafeKey(key.to_string()));
    }

    let mut path = root.to_path_buf();
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(MirrorError::UnsafeKey(key.to_string()));
        }
        let mut parts = Path::new(segment).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(_)), None) => path.push(segment),
            _ => return Err(MirrorError::UnsafeKey(key.to_string())),
        }
    }
    Ok(path)
}

/// Refuses a destination reached through a symbolic link anywhere below `root`.
///
/// Every existing component from `root` down to `dest` is checked without
/// following links. The first missing component ends the walk.
pub async fn refuse_links(root: &Path, dest: &Path, key: &str) -> Result<()> {
    let relative = dest
        .strip_prefix(root)
        .map_err(|_| MirrorError::UnsafeKey(key.to_string()))?;

    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match tokio::fs::symlink_metadata(&current).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(MirrorError::SymlinkInPath {
                    key: key.to_string(),
                    link: current,
                });
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(MirrorError::io(current, e)),
        }
    }
    Ok(())
}
