//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for core-logic operations.
///
/// Only [`CoreError::Config`] is fatal for a run; every per-attempt failure is
/// caught inside the retry policy and never surfaces here.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Network(NetworkError),

    #[error("Invalid state transition for wallet #{index} ({wallet}): {from} -> {to}")]
    InvalidTransition {
        index: usize,
        wallet: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("Export to {path} failed: {msg}")]
    Export { path: String, msg: String },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl CoreError {
    /// True for errors that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::Config(_))
    }
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        CoreError::Store(e)
    }
}

impl From<NetworkError> for CoreError {
    fn from(e: NetworkError) -> Self {
        CoreError::Network(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Reserve proxy list is empty: no replacement proxy available")]
    NoReserveProxies,

    #[error("Invalid proxy '{raw}': {reason}")]
    InvalidProxy { raw: String, reason: String },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Classification of a failed attempt, used for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Proxy, connection and timeout failures.
    TransientNetwork,
    /// Bad status, empty body, wallet-not-indexed signal.
    TransientProtocol,
}

/// Network and API errors for a single fetch attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Proxy {proxy} error: {reason}")]
    ProxyFailure { proxy: String, reason: String },

    #[error("Request error to {endpoint}: {reason}")]
    Request { endpoint: String, reason: String },

    #[error("HTTP error: {status_code} - {body}")]
    HttpError { status_code: u16, body: String },

    #[error("Empty response content from {endpoint}")]
    EmptyBody { endpoint: String },

    #[error("Wallet {wallet} not found, retrying...")]
    WalletNotIndexed { wallet: String },

    #[error("Request cancelled")]
    Cancelled,
}

impl NetworkError {
    pub fn class(&self) -> ErrorClass {
        match self {
            NetworkError::Timeout { .. }
            | NetworkError::ProxyFailure { .. }
            | NetworkError::Request { .. }
            | NetworkError::Cancelled => ErrorClass::TransientNetwork,
            NetworkError::HttpError { .. }
            | NetworkError::EmptyBody { .. }
            | NetworkError::WalletNotIndexed { .. } => ErrorClass::TransientProtocol,
        }
    }
}

/// Result store errors
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("I/O error on {path}: {msg}")]
    Io { path: String, msg: String },

    #[error("Failed to (de)serialize record for {key}: {msg}")]
    Serialization { key: String, msg: String },

    #[error("Connection pool exhausted (max: {max_size})")]
    PoolExhausted { max_size: u32 },

    #[error("Query failed: {msg}")]
    QueryFailed { msg: String },
}
