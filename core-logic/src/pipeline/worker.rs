use super::proxy_pool::ProxySource;
use super::retry::{RetryOutcome, RetryPolicy};
use super::tracker::WalletTracker;
use super::PipelineContext;
use crate::error::CoreError;
use crate::types::{FailureReason, ProcessingOutcome, Wallet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Owns one wallet for its whole first-pass lifecycle.
#[derive(Clone)]
pub struct WalletWorker {
    ctx: PipelineContext,
    policy: RetryPolicy,
    tracker: Arc<WalletTracker>,
}

impl WalletWorker {
    pub fn new(ctx: PipelineContext, policy: RetryPolicy, tracker: Arc<WalletTracker>) -> Self {
        Self {
            ctx,
            policy,
            tracker,
        }
    }

    /// Primary slot first, then reserve proxies until success or the budget runs out.
    pub async fn process(
        &self,
        index: usize,
        wallet: &Wallet,
        cancel: &CancellationToken,
    ) -> Result<ProcessingOutcome, CoreError> {
        self.tracker.begin(index)?;

        let outcome = match self
            .policy
            .execute(&self.ctx, wallet, ProxySource::Primary(index), cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                // leave the slot reconcilable before propagating
                let _ = self.tracker.complete(index, false, 0);
                return Err(e);
            }
        };

        self.tracker
            .complete(index, outcome.is_success(), outcome.attempts())?;

        Ok(match outcome {
            RetryOutcome::Succeeded { attempts } => {
                ProcessingOutcome::succeeded(wallet.clone(), attempts)
            }
            RetryOutcome::Exhausted { attempts } => {
                ProcessingOutcome::failed(wallet.clone(), attempts, FailureReason::Exhausted)
            }
            RetryOutcome::Cancelled { attempts } => {
                ProcessingOutcome::failed(wallet.clone(), attempts, FailureReason::Cancelled)
            }
        })
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn tracker(&self) -> &Arc<WalletTracker> {
        &self.tracker
    }
}
