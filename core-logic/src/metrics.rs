use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_ms: u64,
    pub wallets: WalletMetrics,
    pub attempts: AttemptMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletMetrics {
    pub processed: u64,
    pub success: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub recovered: u64,
    pub permanently_failed: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptMetrics {
    pub total: u64,
    pub failed: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

/// Run counters shared by the scheduler, the reconciler and the retry policy.
#[derive(Debug)]
pub struct RunMetrics {
    wallets_processed: AtomicU64,
    wallets_success: AtomicU64,
    wallets_failed: AtomicU64,
    wallets_timed_out: AtomicU64,
    wallets_recovered: AtomicU64,
    wallets_permanently_failed: AtomicU64,
    attempts: AtomicU64,
    attempts_failed: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_min_ms: AtomicU64,
    latency_max_ms: AtomicU64,
    start_time: Instant,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self {
            wallets_processed: AtomicU64::new(0),
            wallets_success: AtomicU64::new(0),
            wallets_failed: AtomicU64::new(0),
            wallets_timed_out: AtomicU64::new(0),
            wallets_recovered: AtomicU64::new(0),
            wallets_permanently_failed: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            attempts_failed: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_min_ms: AtomicU64::new(u64::MAX),
            latency_max_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl RunMetrics {
    pub fn record_attempt(&self, latency: Duration, success: bool) {
        let latency_ms = latency.as_millis() as u64;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::SeqCst);
        self.latency_min_ms.fetch_min(latency_ms, Ordering::SeqCst);
        self.latency_max_ms.fetch_max(latency_ms, Ordering::SeqCst);
        if !success {
            self.attempts_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_wallet(&self, success: bool) {
        self.wallets_processed.fetch_add(1, Ordering::SeqCst);
        if success {
            self.wallets_success.fetch_add(1, Ordering::SeqCst);
        } else {
            self.wallets_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_timeout(&self) {
        self.wallets_timed_out.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_reconciled(&self, recovered: bool) {
        if recovered {
            self.wallets_recovered.fetch_add(1, Ordering::SeqCst);
        } else {
            self.wallets_permanently_failed
                .fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let processed = self.wallets_processed.load(Ordering::SeqCst);
        let success = self.wallets_success.load(Ordering::SeqCst);
        let attempts = self.attempts.load(Ordering::SeqCst);
        let latency_sum = self.latency_sum_ms.load(Ordering::SeqCst);
        let min_latency = self.latency_min_ms.load(Ordering::SeqCst);

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            uptime_ms: self.start_time.elapsed().as_millis() as u64,
            wallets: WalletMetrics {
                processed,
                success,
                failed: self.wallets_failed.load(Ordering::SeqCst),
                timed_out: self.wallets_timed_out.load(Ordering::SeqCst),
                recovered: self.wallets_recovered.load(Ordering::SeqCst),
                permanently_failed: self.wallets_permanently_failed.load(Ordering::SeqCst),
                success_rate: if processed > 0 {
                    success as f64 / processed as f64 * 100.0
                } else {
                    0.0
                },
            },
            attempts: AttemptMetrics {
                total: attempts,
                failed: self.attempts_failed.load(Ordering::SeqCst),
                avg_latency_ms: if attempts > 0 {
                    latency_sum as f64 / attempts as f64
                } else {
                    0.0
                },
                min_latency_ms: if min_latency == u64::MAX {
                    0
                } else {
                    min_latency
                },
                max_latency_ms: self.latency_max_ms.load(Ordering::SeqCst),
            },
        }
    }

    pub fn to_json(&self) -> String {
        let snapshot = self.snapshot();
        serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".to_string())
    }

    pub async fn export_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = self.to_json();
        tokio::fs::write(path, json).await
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn wallets_success(&self) -> u64 {
        self.wallets_success.load(Ordering::SeqCst)
    }

    pub fn wallets_failed(&self) -> u64 {
        self.wallets_failed.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
