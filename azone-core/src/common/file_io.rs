//! JSON record files with atomic replacement
//!
//! Every durable record in this crate is a small JSON document. Writes go to
//! a temporary sibling in the same directory, are flushed to disk and then
//! renamed over the target, so a reader only ever sees the old or the new
//! file in full.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{AzoneError, AzoneResult};

/// Serialize `data` as pretty JSON and atomically replace `path` with it.
pub fn write_json_atomic<T, P>(path: P, data: &T, context: &str) -> AzoneResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    debug!("Writing {} to {:?}", context, path);

    let json = serde_json::to_vec_pretty(data)
        .map_err(|e| AzoneError::corrupt(path, format!("failed to serialize {}: {}", context, e)))?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_directory(parent)?;

    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| AzoneError::io(format!("create temporary {}", context), parent, e))?;
    temp.write_all(&json)
        .map_err(|e| AzoneError::io(format!("write {}", context), temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| AzoneError::io(format!("sync {}", context), temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| AzoneError::io(format!("replace {}", context), path, e.error))?;

    Ok(())
}

/// Read and deserialize a JSON record written by [`write_json_atomic`].
pub fn read_json<T, P>(path: P, context: &str) -> AzoneResult<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    debug!("Reading {} from {:?}", context, path);

    let content = std::fs::read_to_string(path)
        .map_err(|e| AzoneError::io(format!("read {}", context), path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| AzoneError::corrupt(path, format!("failed to parse {}: {}", context, e)))
}

pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().is_file()
}

/// Create directory (and parents) if it doesn't exist
pub fn ensure_directory<P: AsRef<Path>>(path: P) -> AzoneResult<()> {
    let path = path.as_ref();
    if !path.is_dir() {
        std::fs::create_dir_all(path)
            .map_err(|e| AzoneError::io("create directory", path, e))?;
    }
    Ok(())
}
