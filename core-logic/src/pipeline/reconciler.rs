use super::proxy_pool::ProxySource;
use super::retry::RetryPolicy;
use super::tracker::WalletTracker;
use super::PipelineContext;
use crate::error::CoreError;
use crate::error_log::ErrorEntry;
use crate::types::Wallet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Wallets that had no record and got one during the sweep
    pub recovered: Vec<Wallet>,
    pub permanently_failed: Vec<Wallet>,
    /// Wallets left untouched because the run was cancelled mid-sweep
    pub skipped: Vec<Wallet>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.permanently_failed.is_empty() && self.skipped.is_empty()
    }
}

/// Sequential post-pass over wallets that have no stored record.
pub struct Reconciler {
    ctx: PipelineContext,
    policy: RetryPolicy,
    tracker: Arc<WalletTracker>,
}

impl Reconciler {
    pub fn new(ctx: PipelineContext, policy: RetryPolicy, tracker: Arc<WalletTracker>) -> Self {
        Self {
            ctx,
            policy,
            tracker,
        }
    }

    /// Walks `wallets` in input order. The store decides what is missing;
    /// each gap gets one more retry budget starting from a reserve proxy.
    pub async fn sweep(
        &self,
        wallets: &[Wallet],
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, CoreError> {
        let mut report = ReconcileReport::default();

        for (index, wallet) in wallets.iter().enumerate() {
            if cancel.is_cancelled() {
                report.skipped.push(wallet.clone());
                continue;
            }

            let stored = match self.ctx.store.contains(wallet).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("Store lookup failed for {}, treating as missing: {}", wallet, e);
                    false
                }
            };
            if stored {
                continue;
            }

            if let Err(e) = self.tracker.begin_reconcile(index) {
                warn!("Skipping reconcile for {}: {}", wallet, e);
                report.skipped.push(wallet.clone());
                continue;
            }

            info!("Reconciling wallet {} ({}/{})", wallet, index + 1, wallets.len());

            let outcome = match self
                .policy
                .execute(&self.ctx, wallet, ProxySource::Reserve, cancel)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    let _ = self.tracker.complete(index, false, 0);
                    return Err(e);
                }
            };

            self.tracker
                .complete(index, outcome.is_success(), outcome.attempts())?;

            if outcome.is_success() {
                self.ctx.metrics.record_reconciled(true);
                info!(target: "wallet_result", "Wallet {} SUCCESS on reconcile", wallet);
                report.recovered.push(wallet.clone());
            } else if cancel.is_cancelled() {
                report.skipped.push(wallet.clone());
            } else {
                self.ctx.metrics.record_reconciled(false);
                let total_attempts = self.tracker.attempts(index);
                self.ctx.sink.append(ErrorEntry::for_wallet(
                    wallet,
                    format!(
                        "Wallet {} permanently failed after {} attempts (budget {})",
                        wallet,
                        total_attempts,
                        self.policy.attempts()
                    ),
                ));
                info!(target: "wallet_result", "Wallet {} FAILED permanently", wallet);
                report.permanently_failed.push(wallet.clone());
            }
        }

        Ok(report)
    }
}
