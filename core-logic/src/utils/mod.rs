//! # Utilities Module
//!
//! Input loaders and logging setup for the core-logic crate.

pub(crate) mod logger;
pub(crate) mod proxy_manager;
pub(crate) mod wallet_manager;

pub use logger::{setup_logger, RUN_SUMMARY_TARGET, WALLET_RESULT_TARGET};
pub use proxy_manager::ProxyManager;
pub use wallet_manager::{WalletList, WalletManager};
