//! # Core Logic - Wallet Stats Pipeline
//!
//! Checks a list of wallets against a statistics API through a proxy pool,
//! retrying failed lookups on fresh proxies and persisting one record per
//! wallet. The HTTP client and report columns live in the binary crate; this
//! crate only sees them through [`traits`].
//!
//! ## Modules
//!
//! - [`config`] - Checker settings and validation
//! - [`error`] - Typed error handling with thiserror
//! - [`error_log`] - Append-only failure log
//! - [`export`] - CSV report in input order
//! - [`metrics`] - Run counters and latency summary
//! - [`pipeline`] - Proxy pool, retry policy, scheduler and reconciler
//! - [`progress`] - Progress reporters
//! - [`store`] - Result store backends
//! - [`traits`] - Core trait definitions
//! - [`types`] - Wallet, proxy and outcome types

pub mod config;
pub mod error;
pub mod error_log;
pub mod export;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod traits;
pub mod types;
pub(crate) mod utils;

pub use config::{CheckerConfig, PathsConfig, StoreBackend};
pub use error::{ConfigError, CoreError, ErrorClass, NetworkError, StoreError};
pub use error_log::{ErrorEntry, FileErrorLog, MemoryErrorLog};
pub use export::{export_report, ExportSummary};
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use pipeline::{
    Checker, PipelineContext, ProxyPool, ProxySource, ReconcileReport, Reconciler, RetryOutcome,
    RetryPolicy, RunSummary, Scheduler, SchedulerSettings, SleepRange, WalletState,
    WalletTracker, WalletWorker,
};
pub use progress::{ConsoleProgress, SilentProgress};
pub use store::{JsonFileStore, MemoryStore, SqliteStore};
pub use traits::{ErrorSink, Fetcher, ProgressReporter, ReportSchema, ResultStore};
pub use types::{FailureReason, FetchResult, ProcessingOutcome, Proxy, Wallet, WalletRecord};

pub use utils::{
    setup_logger, ProxyManager, WalletList, WalletManager, RUN_SUMMARY_TARGET,
    WALLET_RESULT_TARGET,
};
