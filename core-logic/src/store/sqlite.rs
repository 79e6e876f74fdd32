use crate::error::StoreError;
use crate::traits::ResultStore;
use crate::types::{Wallet, WalletRecord};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default)]
pub struct StoreMetrics {
    pub total_queries: AtomicU64,
    pub total_errors: AtomicU64,
}

/// SQLite-backed store, one row per wallet in `wallet_records`.
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    metrics: StoreMetrics,
}

impl SqliteStore {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;
    pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

    pub async fn open(db_path: &str) -> Result<Self, StoreError> {
        let io_err = |e: std::io::Error| StoreError::Io {
            path: db_path.to_string(),
            msg: e.to_string(),
        };

        let path = Path::new(db_path);
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(io_err)?;
                }
            }
            std::fs::File::create(path).map_err(io_err)?;
            info!("Created new database file: {}", db_path);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(Self::DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_millis(Self::DEFAULT_TIMEOUT_MS))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode=WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA synchronous=NORMAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout=5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(&format!("sqlite://{}", db_path))
            .await
            .map_err(|e| StoreError::QueryFailed { msg: e.to_string() })?;

        let store = Self {
            pool,
            metrics: StoreMetrics::default(),
        };
        store.init_schema().await?;
        info!(
            "Result database initialized with pool size {} (WAL Mode)",
            Self::DEFAULT_MAX_CONNECTIONS
        );
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|_| StoreError::PoolExhausted {
                max_size: Self::DEFAULT_MAX_CONNECTIONS,
            })?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS wallet_records (
                wallet TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::QueryFailed { msg: e.to_string() })?;

        Ok(())
    }

    fn track<T>(&self, result: Result<T, sqlx::Error>) -> Result<T, StoreError> {
        self.metrics.total_queries.fetch_add(1, Ordering::SeqCst);
        result.map_err(|e| {
            self.metrics.total_errors.fetch_add(1, Ordering::SeqCst);
            StoreError::QueryFailed { msg: e.to_string() }
        })
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn put(&self, record: &WalletRecord) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(&record.payload).map_err(|e| StoreError::Serialization {
                key: record.wallet.to_string(),
                msg: e.to_string(),
            })?;

        let result = sqlx::query(
            "INSERT INTO wallet_records (wallet, payload, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(wallet) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
        )
        .bind(record.wallet.as_str())
        .bind(payload)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await;

        self.track(result).map(|_| ())
    }

    async fn get(&self, wallet: &Wallet) -> Result<Option<WalletRecord>, StoreError> {
        let result = sqlx::query("SELECT payload FROM wallet_records WHERE wallet = ?")
            .bind(wallet.as_str())
            .fetch_optional(&self.pool)
            .await;

        let Some(row) = self.track(result)? else {
            return Ok(None);
        };
        let raw: String = row
            .try_get("payload")
            .map_err(|e| StoreError::QueryFailed { msg: e.to_string() })?;
        let payload = serde_json::from_str(&raw).map_err(|e| StoreError::Serialization {
            key: wallet.to_string(),
            msg: e.to_string(),
        })?;
        Ok(Some(WalletRecord::new(wallet.clone(), payload)))
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM wallet_records")
            .execute(&self.pool)
            .await;
        let done = self.track(result)?;
        info!("Removed {} wallet records from database", done.rows_affected());
        Ok(done.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sqlite_upsert_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("wallets.db");
        let store = SqliteStore::open(db_path.to_str().unwrap()).await.unwrap();
        let wallet = Wallet::from("0xAAA");

        assert!(store.get(&wallet).await.unwrap().is_none());

        store
            .put(&WalletRecord::new(wallet.clone(), json!({"v": 1})))
            .await
            .unwrap();
        store
            .put(&WalletRecord::new(wallet.clone(), json!({"v": 2})))
            .await
            .unwrap();

        let record = store.get(&wallet).await.unwrap().unwrap();
        assert_eq!(record.payload, json!({"v": 2}));

        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(!store.contains(&wallet).await.unwrap());
        assert_eq!(store.metrics().total_errors.load(Ordering::SeqCst), 0);
        store.close().await;
    }
}
