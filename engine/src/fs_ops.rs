//! Filesystem operations module.
//!
//! This module turns a directory tree into the item table the fit strategies
//! work on:
//! - regular files map to their size in bytes
//! - symbolic links are items of size zero and are never followed
//! - directories are walked but are not items themselves

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::model::ItemTable;

/// Build a size map for every file below `root`.
///
/// Entries are visited in file-name order within each directory, so the
/// table order (which first-fit depends on) is reproducible between runs.
///
/// # Errors
/// Returns `EnumerationFailed` if `root` itself cannot be read.
/// Unreadable subdirectories and entries are logged and skipped.
pub fn collect_size_map(root: &Path) -> Result<ItemTable<PathBuf>, EngineError> {
    let mut table = ItemTable::new();

    recurse(root, &mut table)?;
    tracing::debug!(
        root = %root.display(),
        items = table.len(),
        bytes = table.total_size(),
        "size map collected"
    );
    Ok(table)
}

fn recurse(path: &Path, table: &mut ItemTable<PathBuf>) -> Result<(), EngineError> {
    let entries = fs::read_dir(path).map_err(|e| EngineError::EnumerationFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut entries: Vec<_> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                None
            }
        })
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        // DirEntry::metadata does not traverse links
        add_entry(entry.path(), entry.metadata(), table);
    }
    Ok(())
}

/// Add one directory entry to `table`, descending into directories.
///
/// A failure here only costs this entry; siblings are still visited.
fn add_entry(path: PathBuf, metadata: io::Result<fs::Metadata>, table: &mut ItemTable<PathBuf>) {
    let metadata = match metadata {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable entry");
            return;
        }
    };
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        table.insert(path, 0);
    } else if file_type.is_dir() {
        if let Err(e) = recurse(&path, table) {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable directory");
        }
    } else if file_type.is_file() {
        table.insert(path, metadata.len());
    }
}
