use crate::error::ConfigError;
use crate::pipeline::{RetryPolicy, SleepRange};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Checker settings, usually read from `config/general_config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Number of wallets processed concurrently
    pub threads: usize,
    /// Sleep range in seconds between proxy replacements
    pub sleep_between_replace_proxy: [f64; 2],
    /// Attempt budget per wallet
    pub limit_replace_proxy: u32,
    /// Outer deadline for one scheduled wallet task
    pub task_timeout_secs: u64,
    /// Timeout for a single HTTP request
    pub request_timeout_secs: u64,
    pub api_base_url: String,
    pub store: StoreBackend,
    pub paths: PathsConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            threads: 10,
            sleep_between_replace_proxy: [1.0, 3.0],
            limit_replace_proxy: 10,
            task_timeout_secs: 10,
            request_timeout_secs: 10,
            api_base_url: "https://layerhub.xyz".to_string(),
            store: StoreBackend::Json,
            paths: PathsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub wallets: String,
    pub reserve_proxies: String,
    pub results_dir: String,
    pub report: String,
    pub error_log: String,
    pub logs_dir: String,
    pub sqlite: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            wallets: "data/wallet.csv".to_string(),
            reserve_proxies: "data/reserv_proxy.csv".to_string(),
            results_dir: "results/wallet_json_data".to_string(),
            report: "results/result.csv".to_string(),
            error_log: "results/logs/log".to_string(),
            logs_dir: "logs".to_string(),
            sqlite: "results/wallets.db".to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "threads".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.limit_replace_proxy == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limit_replace_proxy".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.task_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "task_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "api_base_url".to_string(),
            });
        }
        self.sleep_range()?;
        Ok(())
    }

    pub fn sleep_range(&self) -> Result<SleepRange, ConfigError> {
        let [low, high] = self.sleep_between_replace_proxy;
        SleepRange::new(low, high)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        Ok(RetryPolicy::new(self.limit_replace_proxy, self.sleep_range()?))
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
