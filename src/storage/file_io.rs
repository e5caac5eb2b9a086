//! JSON snapshot files
//!
//! The mirror snapshot is rewritten after every sync. A crash mid-write must
//! leave the previous snapshot readable, so writes go through a sibling temp
//! file that replaces the target in one rename.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::NynabError;

/// Load a snapshot, or `T::default()` on first run when no file exists yet
///
/// An unreadable or corrupt file is a `Storage` error, never a silent reset.
pub fn read_json<T, P>(path: P) -> Result<T, NynabError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| NynabError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| NynabError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Replace a snapshot with `data`
///
/// Missing parent directories are created. Readers see either the old
/// snapshot or the new one.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), NynabError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            NynabError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory as the target, so the rename stays on one filesystem
    let temp_path = path.with_extension("json.tmp");

    let file = File::create(&temp_path)
        .map_err(|e| NynabError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, data)
        .map_err(|e| NynabError::Storage(format!("Failed to serialize data: {}", e)))?;

    writer
        .flush()
        .map_err(|e| NynabError::Storage(format!("Failed to flush data: {}", e)))?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| NynabError::Storage(format!("Failed to sync data: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        NynabError::Storage(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}
