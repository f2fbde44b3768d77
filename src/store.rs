use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::Builder;

use crate::error::SyncError;

/// Where a run leaves the packages it assembled, for post-hoc inspection.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: Utf8PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Replaces the snapshot with `items` as one pretty-printed JSON array.
    pub fn write<T: Serialize>(&self, items: &[T]) -> Result<(), SyncError> {
        let content = serde_json::to_vec_pretty(items)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        write_atomic(&self.path, &content)
    }
}

/// Writes through a temporary file in the destination directory and renames
/// it into place, so readers never observe a partial file.
pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), SyncError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    let temp = Builder::new()
        .prefix("rrk-ckan")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| SyncError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    Ok(())
}
