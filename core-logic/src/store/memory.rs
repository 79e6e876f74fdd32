use crate::error::StoreError;
use crate::traits::ResultStore;
use crate::types::{Wallet, WalletRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Wallet, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn put(&self, record: &WalletRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.wallet.clone(), record.payload.clone());
        Ok(())
    }

    async fn get(&self, wallet: &Wallet) -> Result<Option<WalletRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(wallet)
            .map(|payload| WalletRecord::new(wallet.clone(), payload.clone())))
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        let removed = records.len();
        records.clear();
        Ok(removed)
    }
}
