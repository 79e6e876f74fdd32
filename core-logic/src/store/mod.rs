//! # Result Stores
//!
//! [`ResultStore`] backends: one JSON document per wallet on disk (default),
//! a SQLite table, or an in-memory map.

mod json_files;
mod memory;
mod sqlite;

pub use json_files::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::{CheckerConfig, StoreBackend};
use crate::error::StoreError;
use crate::traits::ResultStore;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Opens the backend selected in the config.
pub async fn open(config: &CheckerConfig) -> Result<Arc<dyn ResultStore>, StoreError> {
    match config.store {
        StoreBackend::Json => Ok(Arc::new(JsonFileStore::open(&config.paths.results_dir).await?)),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.paths.sqlite).await?)),
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write-temp, fsync, rename. Readers see either the old file or the new one.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let io_err = |e: std::io::Error| StoreError::Io {
        path: path.display().to_string(),
        msg: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }
    }

    // unique per writer so two tasks saving the same key never share a temp file
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(format!(".{}.{}.tmp", std::process::id(), seq));
    let temp_path = path.with_file_name(temp_name);

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .await
        .map_err(io_err)?;
    file.write_all(contents).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(io_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_atomic_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("result.csv");

        write_atomic(&path, b"a much longer first version\n").await.unwrap();
        write_atomic(&path, b"short\n").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"short\n");
        let names: Vec<String> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["result.csv".to_string()]);
    }
}
