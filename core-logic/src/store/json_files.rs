use super::write_atomic;
use crate::error::StoreError;
use crate::traits::ResultStore;
use crate::types::{Wallet, WalletRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// One pretty-printed JSON document per wallet: `<dir>/<wallet>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|e| StoreError::Io {
            path: dir.display().to_string(),
            msg: e.to_string(),
        })?;
        info!("JSON result store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, wallet: &Wallet) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(wallet)))
    }
}

/// Wallet ids are opaque: percent-encode everything outside `[A-Za-z0-9._~-]`
/// (`%` included) so distinct ids never share a file. A leading dot is
/// encoded too, and the empty id maps to a bare `%`.
fn file_stem(wallet: &Wallet) -> String {
    let encoded = urlencoding::encode(wallet.as_str());
    if let Some(rest) = encoded.strip_prefix('.') {
        return format!("%2E{}", rest);
    }
    if encoded.is_empty() {
        return "%".to_string();
    }
    encoded.into_owned()
}

#[async_trait]
impl ResultStore for JsonFileStore {
    async fn put(&self, record: &WalletRecord) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(&record.payload).map_err(|e| {
            StoreError::Serialization {
                key: record.wallet.to_string(),
                msg: e.to_string(),
            }
        })?;
        let path = self.path_for(&record.wallet);
        write_atomic(&path, &body).await?;
        debug!("Saved {} -> {}", record.wallet, path.display());
        Ok(())
    }

    async fn get(&self, wallet: &Wallet) -> Result<Option<WalletRecord>, StoreError> {
        let path = self.path_for(wallet);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    msg: e.to_string(),
                })
            }
        };
        let payload: Value =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
                key: wallet.to_string(),
                msg: e.to_string(),
            })?;

        // case-insensitive filesystems can still fold two ids onto one file
        if let Some(owner) = payload.get("wallet_address").and_then(Value::as_str) {
            if owner != wallet.as_str() {
                warn!(
                    "{} holds the record of {}, not {}",
                    path.display(),
                    owner,
                    wallet
                );
                return Ok(None);
            }
        }
        Ok(Some(WalletRecord::new(wallet.clone(), payload)))
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let io_err = |e: std::io::Error| StoreError::Io {
            path: self.dir.display().to_string(),
            msg: e.to_string(),
        };

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_err(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if !entry.file_type().await.map_err(io_err)?.is_file() {
                continue;
            }
            let is_record = path.extension().map(|ext| ext == "json").unwrap_or(false);
            let is_temp = path.extension().map(|ext| ext == "tmp").unwrap_or(false);
            if is_record || is_temp {
                fs::remove_file(&path).await.map_err(io_err)?;
                if is_record {
                    removed += 1;
                }
            }
        }
        info!("Removed {} wallet records from {}", removed, self.dir.display());
        Ok(removed)
    }
}
