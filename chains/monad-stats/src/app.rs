use crate::client::LayerHubClient;
use crate::report::MonadStatsSchema;
use anyhow::{bail, Context, Result};
use core_logic::{
    export_report, store, CheckerConfig, Checker, ConsoleProgress, ErrorSink, FileErrorLog,
    PipelineContext, ProgressReporter, ProxyManager, ProxyPool, RunMetrics, RunSummary,
    SchedulerSettings, WalletManager,
};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Creates the input and output directories a fresh checkout is missing.
pub fn ensure_paths(config: &CheckerConfig) -> Result<()> {
    let paths = &config.paths;
    let dirs = [
        Path::new(&paths.wallets).parent(),
        Path::new(&paths.reserve_proxies).parent(),
        Some(Path::new(&paths.results_dir)),
        Path::new(&paths.report).parent(),
        Path::new(&paths.error_log).parent(),
    ];
    for dir in dirs.into_iter().flatten() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }
    Ok(())
}

/// Check every wallet, reconcile the gaps, then write the report.
pub async fn run_stats(
    config: &CheckerConfig,
    metrics: Arc<RunMetrics>,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    run_stats_with(config, metrics, Arc::new(ConsoleProgress::new()), cancel).await
}

pub async fn run_stats_with(
    config: &CheckerConfig,
    metrics: Arc<RunMetrics>,
    progress: Arc<dyn ProgressReporter>,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    ensure_paths(config)?;

    let list = WalletManager::load_csv(&config.paths.wallets)?;
    if list.is_empty() {
        bail!("No wallets found in {}", config.paths.wallets);
    }
    let reserve = ProxyManager::load_reserve(&config.paths.reserve_proxies)?;
    let pool = ProxyPool::new(list.primary.clone(), reserve);
    info!(
        "{} wallets, {} primary proxies, {} reserve proxies",
        list.len(),
        pool.primary_len(),
        pool.reserve_len()
    );

    let store = store::open(config)
        .await
        .context("Failed to open result store")?;
    let sink: Arc<dyn ErrorSink> = Arc::new(
        FileErrorLog::open(&config.paths.error_log).context("Failed to open error log")?,
    );
    let fetcher = Arc::new(LayerHubClient::new(
        config.api_base_url.clone(),
        config.request_timeout(),
    ));

    let ctx = PipelineContext::new(fetcher, store.clone(), sink, pool).with_metrics(metrics);
    let checker = Checker::new(
        ctx,
        config.retry_policy()?,
        SchedulerSettings {
            concurrency: config.threads,
            task_timeout: config.task_timeout(),
        },
        progress,
    );

    let summary = checker.run(&list.wallets, cancel).await?;

    if cancel.is_cancelled() {
        info!(target: "run_summary", "Run cancelled, skipping report export");
        return Ok(summary);
    }

    export_report(
        &list.wallets,
        store.as_ref(),
        &MonadStatsSchema,
        &config.paths.report,
    )
    .await?;
    Ok(summary)
}

/// Rebuild the report from whatever the store holds.
pub async fn export_only(config: &CheckerConfig) -> Result<usize> {
    let list = WalletManager::load_csv(&config.paths.wallets)?;
    let store = store::open(config)
        .await
        .context("Failed to open result store")?;
    let summary = export_report(
        &list.wallets,
        store.as_ref(),
        &MonadStatsSchema,
        &config.paths.report,
    )
    .await?;
    Ok(summary.rows)
}

/// Delete every stored wallet record.
pub async fn clear(config: &CheckerConfig) -> Result<usize> {
    let store = store::open(config)
        .await
        .context("Failed to open result store")?;
    let removed = store.clear().await?;
    info!(target: "run_summary", "Cleared {} wallet records", removed);
    Ok(removed)
}
