use crate::types::Proxy;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

pub struct ProxyManager;

impl ProxyManager {
    /// Loads the reserve list: no header, one proxy per row in column 0.
    /// Blank rows and `#` comments are skipped, unparseable rows are logged
    /// and dropped. A missing file yields an empty reserve.
    pub fn load_reserve(path: impl AsRef<Path>) -> Result<Vec<Proxy>> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found. Running without reserve proxies.", path.display());
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut proxies = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.with_context(|| format!("Failed to read {}", path.display()))?;
            let Some(raw) = row.get(0).filter(|s| !s.is_empty()) else {
                continue;
            };
            match Proxy::parse(raw) {
                Ok(proxy) => proxies.push(proxy),
                Err(e) => warn!("Skipping reserve proxy on row {}: {}", line + 1, e),
            }
        }

        info!("Loaded {} reserve proxies from {}", proxies.len(), path.display());
        Ok(proxies)
    }
}
