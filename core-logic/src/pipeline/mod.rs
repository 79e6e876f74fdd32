//! # Wallet Pipeline
//!
//! Scheduler pass over every wallet followed by a reconcile sweep over the
//! wallets the store still lacks. Both passes share one [`RetryPolicy`].

pub mod proxy_pool;
pub mod reconciler;
pub mod retry;
pub mod scheduler;
pub mod tracker;
pub mod worker;

pub use proxy_pool::{ProxyPool, ProxySource};
pub use reconciler::{ReconcileReport, Reconciler};
pub use retry::{RetryOutcome, RetryPolicy, SleepRange};
pub use scheduler::{Scheduler, SchedulerSettings};
pub use tracker::{TrackerCounts, WalletState, WalletTracker};
pub use worker::WalletWorker;

use crate::error::CoreError;
use crate::metrics::RunMetrics;
use crate::traits::{ErrorSink, Fetcher, ProgressReporter, ResultStore};
use crate::types::{ProcessingOutcome, Wallet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared handles every pipeline component works through.
#[derive(Clone)]
pub struct PipelineContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub store: Arc<dyn ResultStore>,
    pub sink: Arc<dyn ErrorSink>,
    pub pool: Arc<ProxyPool>,
    pub metrics: Arc<RunMetrics>,
}

impl PipelineContext {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ResultStore>,
        sink: Arc<dyn ErrorSink>,
        pool: ProxyPool,
    ) -> Self {
        Self {
            fetcher,
            store,
            sink,
            pool: Arc::new(pool),
            metrics: Arc::new(RunMetrics::default()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<RunMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcomes: Vec<ProcessingOutcome>,
    pub reconcile: ReconcileReport,
    pub counts: TrackerCounts,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn first_pass_success(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn first_pass_failed(&self) -> usize {
        self.outcomes.len() - self.first_pass_success()
    }
}

/// Full check: scheduler pass then reconcile sweep over one wallet list.
pub struct Checker {
    ctx: PipelineContext,
    policy: RetryPolicy,
    settings: SchedulerSettings,
    progress: Arc<dyn ProgressReporter>,
}

impl Checker {
    pub fn new(
        ctx: PipelineContext,
        policy: RetryPolicy,
        settings: SchedulerSettings,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            ctx,
            policy,
            settings,
            progress,
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub async fn run(
        &self,
        wallets: &[Wallet],
        cancel: &CancellationToken,
    ) -> Result<RunSummary, CoreError> {
        let start_time = std::time::Instant::now();
        let tracker = Arc::new(WalletTracker::new(wallets));

        let worker = WalletWorker::new(self.ctx.clone(), self.policy.clone(), tracker.clone());
        let scheduler = Scheduler::new(worker, self.settings, self.progress.clone());
        let outcomes = scheduler.run(wallets, cancel).await?;

        let reconciler = Reconciler::new(self.ctx.clone(), self.policy.clone(), tracker.clone());
        let reconcile = reconciler.sweep(wallets, cancel).await?;

        let summary = RunSummary {
            outcomes,
            reconcile,
            counts: tracker.counts(),
            elapsed: start_time.elapsed(),
        };

        info!(
            target: "run_summary",
            "Total Time: {:.1}s | First pass: {} ok / {} failed | Recovered: {} | Permanently failed: {}",
            summary.elapsed.as_secs_f64(),
            summary.first_pass_success(),
            summary.first_pass_failed(),
            summary.reconcile.recovered.len(),
            summary.reconcile.permanently_failed.len()
        );

        Ok(summary)
    }
}
