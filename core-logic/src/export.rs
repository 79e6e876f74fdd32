//! Tabular report export.
//!
//! Rows follow input wallet order, never completion order. Wallets without a
//! stored record are left out of the file.

use crate::error::CoreError;
use crate::store::write_atomic;
use crate::traits::{ReportSchema, ResultStore};
use crate::types::Wallet;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: usize,
    pub missing: usize,
}

/// Builds the whole CSV in memory, then swaps it into place atomically.
pub async fn export_report(
    wallets: &[Wallet],
    store: &dyn ResultStore,
    schema: &dyn ReportSchema,
    path: impl AsRef<Path>,
) -> Result<ExportSummary, CoreError> {
    let path = path.as_ref();
    let export_err = |msg: String| CoreError::Export {
        path: path.display().to_string(),
        msg,
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(schema.headers())
        .map_err(|e| export_err(e.to_string()))?;

    let mut summary = ExportSummary::default();
    for wallet in wallets {
        let record = match store.get(wallet).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                summary.missing += 1;
                continue;
            }
            Err(e) => {
                warn!("Skipping {} in report: {}", wallet, e);
                summary.missing += 1;
                continue;
            }
        };
        writer
            .write_record(schema.row(&record))
            .map_err(|e| export_err(e.to_string()))?;
        summary.rows += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| export_err(e.to_string()))?;
    write_atomic(path, &bytes).await?;

    info!(
        target: "run_summary",
        "Exported {} rows to {} ({} wallets without data)",
        summary.rows,
        path.display(),
        summary.missing
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::WalletRecord;
    use serde_json::json;

    struct AddressOnly;

    impl ReportSchema for AddressOnly {
        fn headers(&self) -> Vec<&'static str> {
            vec!["wallet_address", "score"]
        }

        fn row(&self, record: &WalletRecord) -> Vec<String> {
            vec![
                record.wallet.to_string(),
                record.payload["score"]
                    .as_i64()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            ]
        }
    }

    #[tokio::test]
    async fn test_rows_follow_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        // stored in reverse order on purpose
        for (id, score) in [("0xCCC", 3), ("0xBBB", 2), ("0xAAA", 1)] {
            store
                .put(&WalletRecord::new(Wallet::from(id), json!({"score": score})))
                .await
                .unwrap();
        }
        let wallets: Vec<Wallet> = ["0xAAA", "0xMISSING", "0xBBB", "0xCCC"]
            .into_iter()
            .map(Wallet::from)
            .collect();
        let path = dir.path().join("out").join("result.csv");

        let summary = export_report(&wallets, &store, &AddressOnly, &path)
            .await
            .unwrap();
        assert_eq!(summary, ExportSummary { rows: 3, missing: 1 });

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "wallet_address,score\n0xAAA,1\n0xBBB,2\n0xCCC,3\n"
        );
    }
}
