use anyhow::{Context, Result};
use config::{Config, Environment, File};
use core_logic::CheckerConfig;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/general_config.toml";
pub const ENV_PREFIX: &str = "MONAD_STATS";

/// Reads the TOML file (if present) and `MONAD_STATS__*` overrides, e.g.
/// `MONAD_STATS__THREADS=20` or `MONAD_STATS__PATHS__REPORT=out.csv`.
pub fn load(path: &str) -> Result<CheckerConfig> {
    let mut builder = Config::builder();

    if Path::new(path).exists() {
        builder = builder.add_source(File::with_name(path));
    } else {
        warn!("{} not found, using default settings", path);
    }

    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read config {}", path))?;

    let config: CheckerConfig = settings
        .try_deserialize()
        .with_context(|| format!("Invalid config {}", path))?;
    config.validate().context("Config validation failed")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("general_config.toml");
        std::fs::write(
            &path,
            "threads = 3\nsleep_between_replace_proxy = [0.5, 1.5]\n\n[paths]\nreport = \"out.csv\"\n",
        )
        .unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.sleep_between_replace_proxy, [0.5, 1.5]);
        assert_eq!(config.paths.report, "out.csv");
        assert_eq!(config.limit_replace_proxy, 10);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load("does/not/exist.toml").unwrap();
        assert_eq!(config.threads, 10);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "threads = 0\n").unwrap();
        assert!(load(path.to_str().unwrap()).is_err());
    }
}
