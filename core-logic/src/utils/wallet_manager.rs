use crate::types::{Proxy, Wallet};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Input wallets with their position-correlated primary proxies.
#[derive(Debug, Clone, Default)]
pub struct WalletList {
    pub wallets: Vec<Wallet>,
    /// Same length as `wallets`; `None` for a blank or invalid proxy cell.
    pub primary: Vec<Option<Proxy>>,
}

impl WalletList {
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

pub struct WalletManager;

impl WalletManager {
    /// Reads `wallet.csv`: a header row, then wallet in column 0 and an
    /// optional primary proxy in column 1. Order is preserved and duplicates
    /// are kept.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<WalletList> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open wallet list {}", path.display()))?;

        let mut list = WalletList::default();
        for (line, row) in reader.records().enumerate() {
            let row = row.with_context(|| format!("Failed to read {}", path.display()))?;
            let Some(wallet) = row.get(0).filter(|s| !s.is_empty()) else {
                continue;
            };

            let proxy = match row.get(1).filter(|s| !s.is_empty()) {
                Some(raw) => match Proxy::parse(raw) {
                    Ok(proxy) => Some(proxy),
                    Err(e) => {
                        warn!(
                            "Wallet {} (row {}): {}, a reserve proxy will be used",
                            wallet,
                            line + 2,
                            e
                        );
                        None
                    }
                },
                None => None,
            };

            list.wallets.push(Wallet::from(wallet));
            list.primary.push(proxy);
        }

        info!(
            "Loaded {} wallets ({} with a primary proxy) from {}",
            list.len(),
            list.primary.iter().filter(|p| p.is_some()).count(),
            path.display()
        );
        Ok(list)
    }
}
