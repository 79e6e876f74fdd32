//! # Error Log
//!
//! Append-only failure log injected into every pipeline component.
//! [`FileErrorLog`] writes one line per entry through a non-blocking
//! `tracing-appender` worker, [`MemoryErrorLog`] keeps entries in memory.

use crate::error::ConfigError;
use crate::traits::ErrorSink;
use crate::types::{Proxy, Wallet};
use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};

/// One failure line: who, through which proxy, which attempt, what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    pub wallet: Option<Wallet>,
    pub proxy: Option<String>,
    /// (attempt, budget)
    pub attempt: Option<(u32, u32)>,
    pub message: String,
}

impl ErrorEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            wallet: None,
            proxy: None,
            attempt: None,
            message: message.into(),
        }
    }

    pub fn for_wallet(wallet: &Wallet, message: impl Into<String>) -> Self {
        Self::new(message).with_wallet(wallet)
    }

    pub fn with_wallet(mut self, wallet: &Wallet) -> Self {
        self.wallet = Some(wallet.clone());
        self
    }

    pub fn with_proxy(mut self, proxy: &Proxy) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    pub fn with_attempt(mut self, attempt: u32, budget: u32) -> Self {
        self.attempt = Some((attempt, budget));
        self
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(wallet) = &self.wallet {
            write!(f, "[wallet {}] ", wallet)?;
        }
        if let Some(proxy) = &self.proxy {
            write!(f, "[proxy {}] ", proxy)?;
        }
        if let Some((attempt, budget)) = self.attempt {
            write!(f, "[attempt {}/{}] ", attempt, budget)?;
        }
        f.write_str(&self.message)
    }
}

/// File-backed sink. Each entry is handed to the writer thread as one buffer,
/// so lines from concurrent workers never interleave.
pub struct FileErrorLog {
    writer: NonBlocking,
    _guard: WorkerGuard,
}

impl FileErrorLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let io_err = |e: std::io::Error| ConfigError::IoError {
            path: path.display().to_string(),
            msg: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;

        let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(file);

        Ok(Self {
            writer,
            _guard: guard,
        })
    }
}

impl ErrorSink for FileErrorLog {
    fn append(&self, entry: ErrorEntry) {
        let line = format!("{} {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), entry);
        let mut writer = self.writer.clone();
        if let Err(e) = writer.write_all(line.as_bytes()) {
            warn!("Failed to append to error log: {}", e);
        }
    }
}

/// In-memory sink, handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryErrorLog {
    entries: Mutex<Vec<ErrorEntry>>,
}

impl MemoryErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ErrorEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for MemoryErrorLog {
    fn append(&self, entry: ErrorEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}
