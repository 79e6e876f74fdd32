use super::proxy_pool::ProxySource;
use super::PipelineContext;
use crate::error::{ConfigError, CoreError, NetworkError};
use crate::error_log::ErrorEntry;
use crate::types::{FetchResult, Wallet, WalletRecord};
use rand::Rng;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Uniform sleep interval between attempts, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepRange {
    low: f64,
    high: f64,
}

impl SleepRange {
    pub fn new(low: f64, high: f64) -> Result<Self, ConfigError> {
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low > high {
            return Err(ConfigError::InvalidValue {
                field: "sleep_between_replace_proxy".to_string(),
                reason: format!("expected 0 <= low <= high, got [{}, {}]", low, high),
            });
        }
        Ok(Self { low, high })
    }

    /// No pause between attempts.
    pub fn none() -> Self {
        Self {
            low: 0.0,
            high: 0.0,
        }
    }

    pub fn pick(&self) -> Duration {
        if self.high <= self.low {
            return Duration::from_secs_f64(self.low);
        }
        Duration::from_secs_f64(rand::thread_rng().gen_range(self.low..=self.high))
    }
}

/// How a retry loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match *self {
            RetryOutcome::Succeeded { attempts }
            | RetryOutcome::Exhausted { attempts }
            | RetryOutcome::Cancelled { attempts } => attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }
}

/// Bounded retry with proxy rotation, shared by the concurrent worker and the
/// sequential reconcile sweep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    sleep: SleepRange,
}

impl RetryPolicy {
    pub fn new(attempts: u32, sleep: SleepRange) -> Self {
        Self {
            attempts: attempts.max(1),
            sleep,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn sleep_range(&self) -> SleepRange {
        self.sleep
    }

    /// Runs up to `attempts` fetches for one wallet.
    ///
    /// Every failed attempt appends exactly one line to the error sink. A
    /// success is persisted before returning; a failed write counts as a
    /// failed attempt. Only an empty reserve (no replacement proxy) is an error.
    pub async fn execute(
        &self,
        ctx: &PipelineContext,
        wallet: &Wallet,
        source: ProxySource,
        cancel: &CancellationToken,
    ) -> Result<RetryOutcome, CoreError> {
        let mut proxy = ctx.pool.select(source)?;

        for attempt in 1..=self.attempts {
            if cancel.is_cancelled() {
                return Ok(RetryOutcome::Cancelled {
                    attempts: attempt - 1,
                });
            }

            let started = Instant::now();
            let result = ctx.fetcher.fetch(wallet, &proxy, cancel).await;

            let failure = match result {
                FetchResult::Success(payload) => {
                    let record = WalletRecord::new(wallet.clone(), payload);
                    match ctx.store.put(&record).await {
                        Ok(()) => {
                            ctx.metrics.record_attempt(started.elapsed(), true);
                            debug!(
                                target: "wallet_result",
                                "Wallet {} SUCCESS via {} (attempt {}/{})",
                                wallet, proxy, attempt, self.attempts
                            );
                            return Ok(RetryOutcome::Succeeded { attempts: attempt });
                        }
                        Err(e) => format!("Failed to persist result: {}", e),
                    }
                }
                FetchResult::NotFound => NetworkError::WalletNotIndexed {
                    wallet: wallet.to_string(),
                }
                .to_string(),
                FetchResult::Transient(e) | FetchResult::Fatal(e) => {
                    if cancel.is_cancelled() {
                        return Ok(RetryOutcome::Cancelled { attempts: attempt });
                    }
                    e.to_string()
                }
            };

            ctx.metrics.record_attempt(started.elapsed(), false);
            ctx.sink.append(
                ErrorEntry::for_wallet(wallet, failure)
                    .with_proxy(&proxy)
                    .with_attempt(attempt, self.attempts),
            );

            if attempt == self.attempts {
                break;
            }

            let pause = self.sleep.pick();
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(RetryOutcome::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(pause) => {}
            }

            proxy = ctx.pool.random_reserve()?;
        }

        Ok(RetryOutcome::Exhausted {
            attempts: self.attempts,
        })
    }
}
