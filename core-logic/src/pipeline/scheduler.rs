use super::worker::WalletWorker;
use crate::error::CoreError;
use crate::error_log::ErrorEntry;
use crate::traits::ProgressReporter;
use crate::types::{FailureReason, ProcessingOutcome, Wallet};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Worker permits
    pub concurrency: usize,
    /// Outer deadline per wallet task, measured from permit acquisition
    pub task_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            concurrency: 10,
            task_timeout: Duration::from_secs(10),
        }
    }
}

/// Dispatches every wallet exactly once across a bounded pool of tokio tasks.
pub struct Scheduler {
    worker: WalletWorker,
    settings: SchedulerSettings,
    progress: Arc<dyn ProgressReporter>,
}

impl Scheduler {
    pub fn new(
        worker: WalletWorker,
        settings: SchedulerSettings,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            worker,
            settings,
            progress,
        }
    }

    /// Runs the first pass. Returns one outcome per input wallet, in completion
    /// order. A fatal configuration error cancels the remaining tasks and is
    /// returned instead.
    pub async fn run(
        &self,
        wallets: &[Wallet],
        cancel: &CancellationToken,
    ) -> Result<Vec<ProcessingOutcome>, CoreError> {
        let total = wallets.len();
        let run_token = cancel.child_token();
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut set = JoinSet::new();

        info!(
            "Starting {} wallet tasks with {} workers...",
            total, self.settings.concurrency
        );
        self.progress.start(total);

        for (index, wallet) in wallets.iter().cloned().enumerate() {
            let worker = self.worker.clone();
            let semaphore = semaphore.clone();
            let token = run_token.clone();
            let deadline = self.settings.task_timeout;
            let span = tracing::info_span!("wallet", idx = index);

            set.spawn(
                async move {
                    let result = AssertUnwindSafe(run_task(
                        &worker, semaphore, index, &wallet, token, deadline,
                    ))
                    .catch_unwind()
                    .await;
                    (index, wallet, result)
                }
                .instrument(span),
            );
        }

        let ctx = self.worker.context();
        let mut seen = vec![false; total];
        let mut outcomes = Vec::with_capacity(total);

        while let Some(joined) = set.join_next().await {
            let (index, wallet, result) = match joined {
                Ok(v) => v,
                Err(e) => {
                    error!("A wallet task failed to join: {:?}", e);
                    continue;
                }
            };
            seen[index] = true;

            let outcome = match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) if e.is_fatal() => {
                    error!("Aborting run: {}", e);
                    ctx.sink.append(ErrorEntry::for_wallet(&wallet, e.to_string()));
                    run_token.cancel();
                    set.shutdown().await;
                    self.progress.finish();
                    return Err(e);
                }
                Ok(Err(e)) => {
                    ctx.sink.append(ErrorEntry::for_wallet(
                        &wallet,
                        format!("Failed to process wallet {}: {}", wallet, e),
                    ));
                    ProcessingOutcome::failed(
                        wallet.clone(),
                        self.worker.tracker().attempts(index),
                        FailureReason::Exhausted,
                    )
                }
                Err(_) => {
                    // slot is InFlight after a panic; hand it to the reconciler
                    let _ = self.worker.tracker().complete(index, false, 0);
                    ctx.sink.append(ErrorEntry::for_wallet(
                        &wallet,
                        format!("Failed to process wallet {}: worker panicked", wallet),
                    ));
                    ProcessingOutcome::failed(wallet.clone(), 0, FailureReason::Panicked)
                }
            };

            if outcome.failure == Some(FailureReason::TimedOut) {
                ctx.metrics.record_timeout();
                ctx.sink.append(ErrorEntry::for_wallet(
                    &wallet,
                    format!("Timeout error for wallet {}", wallet),
                ));
            }

            self.record(outcome, &mut outcomes, total);
        }

        // tasks lost without a result still owe an outcome
        for (index, wallet) in wallets.iter().enumerate() {
            if !seen[index] {
                warn!("Wallet {} produced no outcome", wallet);
                self.record(
                    ProcessingOutcome::failed(wallet.clone(), 0, FailureReason::Panicked),
                    &mut outcomes,
                    total,
                );
            }
        }

        self.progress.finish();
        Ok(outcomes)
    }

    fn record(
        &self,
        outcome: ProcessingOutcome,
        outcomes: &mut Vec<ProcessingOutcome>,
        total: usize,
    ) {
        let ctx = self.worker.context();
        ctx.metrics.record_wallet(outcome.success);
        info!(
            target: "wallet_result",
            "Wallet {} {} after {} attempt(s)",
            outcome.wallet,
            if outcome.success { "SUCCESS" } else { "FAILED" },
            outcome.attempts
        );
        self.progress.advance(&outcome, outcomes.len() + 1, total);
        outcomes.push(outcome);
    }
}

async fn run_task(
    worker: &WalletWorker,
    semaphore: Arc<Semaphore>,
    index: usize,
    wallet: &Wallet,
    run_token: CancellationToken,
    deadline: Duration,
) -> Result<ProcessingOutcome, CoreError> {
    let _permit = tokio::select! {
        biased;
        _ = run_token.cancelled() => {
            return Ok(ProcessingOutcome::failed(wallet.clone(), 0, FailureReason::Cancelled));
        }
        permit = semaphore.acquire_owned() => permit.map_err(|e| CoreError::Unknown {
            message: format!("worker pool closed: {}", e),
        })?,
    };

    let task_token = run_token.child_token();
    let work = worker.process(index, wallet, &task_token);
    tokio::pin!(work);

    tokio::select! {
        result = &mut work => result,
        _ = tokio::time::sleep(deadline) => {
            task_token.cancel();
            // the worker observes the token and returns promptly
            let attempts = match work.await {
                Err(e) if e.is_fatal() => return Err(e),
                Ok(outcome) => outcome.attempts,
                Err(_) => worker.tracker().attempts(index),
            };
            Ok(ProcessingOutcome::failed(wallet.clone(), attempts, FailureReason::TimedOut))
        }
    }
}
