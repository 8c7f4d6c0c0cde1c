//! The rendered site on local disk.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::error::PublishError;

/// Directories never shipped to the remote repository.
const SKIPPED_DIRS: &[&str] = &[".git"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFile {
    pub absolute: PathBuf,
    /// `/`-separated path relative to the bundle root.
    pub relative: String,
}

#[derive(Debug, Clone)]
pub struct SiteBundle {
    root: PathBuf,
}

impl SiteBundle {
    /// Opens `root`, which must be an existing directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, PublishError> {
        let root = root.into();
        match fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => Ok(Self { root }),
            Ok(_) => Err(PublishError::InvalidInput(format!(
                "{} is not a directory",
                root.display()
            ))),
            Err(_) => Err(PublishError::InvalidInput(format!(
                "site directory {} does not exist",
                root.display()
            ))),
        }
    }

    /// All files below the root, sorted by relative path. Symlinks are
    /// followed, so a linked file ships with its target's content.
    pub async fn files(&self) -> Result<Vec<SiteFile>, PublishError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || walk(&root))
            .await
            .map_err(|e| PublishError::Bundle {
                path: self.root.clone(),
                source: std::io::Error::other(e),
            })?
    }

    /// Deletes the bundle from disk.
    pub async fn remove(self) -> std::io::Result<()> {
        fs::remove_dir_all(&self.root).await
    }
}

fn walk(root: &Path) -> Result<Vec<SiteFile>, PublishError> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        let file_type = entry.file_type();
        if file_type.is_file() {
            files.push(SiteFile {
                relative: relative_path(root, entry.path())?,
                absolute: entry.into_path(),
            });
        } else if !file_type.is_dir() {
            debug!(path = %entry.path().display(), "skipping special file");
        }
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && SKIPPED_DIRS.iter().any(|s| entry.file_name() == *s)
}

fn walk_error(root: &Path, err: walkdir::Error) -> PublishError {
    let path = err.path().unwrap_or(root).to_path_buf();
    PublishError::Bundle {
        path,
        source: err.into(),
    }
}

fn relative_path(root: &Path, path: &Path) -> Result<String, PublishError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        PublishError::InvalidInput(format!("{} escapes the site root", path.display()))
    })?;

    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().map(str::to_string).ok_or_else(|| {
                PublishError::InvalidInput(format!("non UTF-8 file name {}", path.display()))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("/"))
}
