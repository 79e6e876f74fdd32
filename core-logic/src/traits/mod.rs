use crate::error::StoreError;
use crate::error_log::ErrorEntry;
use crate::types::{FetchResult, ProcessingOutcome, Proxy, Wallet, WalletRecord};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Performs one lookup for a wallet through a proxy.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Single attempt. Implementations must abort the request once `cancel` fires.
    async fn fetch(&self, wallet: &Wallet, proxy: &Proxy, cancel: &CancellationToken)
        -> FetchResult;
}

/// Durable per-wallet record storage, last write wins.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Atomic per wallet: readers never observe a partial record.
    async fn put(&self, record: &WalletRecord) -> Result<(), StoreError>;

    async fn get(&self, wallet: &Wallet) -> Result<Option<WalletRecord>, StoreError>;

    async fn contains(&self, wallet: &Wallet) -> Result<bool, StoreError> {
        Ok(self.get(wallet).await?.is_some())
    }

    /// Removes every record, returns how many were deleted.
    async fn clear(&self) -> Result<usize, StoreError>;
}

/// Append-only failure log.
pub trait ErrorSink: Send + Sync {
    fn append(&self, entry: ErrorEntry);
}

/// Live progress surface for the scheduler.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, total: usize);

    fn advance(&self, outcome: &ProcessingOutcome, completed: usize, total: usize);

    fn finish(&self);
}

/// Maps stored records to report rows.
pub trait ReportSchema: Send + Sync {
    fn headers(&self) -> Vec<&'static str>;

    fn row(&self, record: &WalletRecord) -> Vec<String>;
}
