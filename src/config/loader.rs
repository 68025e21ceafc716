//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;
use crate::domain::leaderboard::{MAX_LEADERBOARD_SIZE, MIN_LEADERBOARD_SIZE};

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    sample_interval = config.sampler.interval_seconds,
    retention_days = config.retention.days,
    snapshot = config.snapshot.enabled,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-zero intervals (a zero period would spin the scheduler)
/// - Leaderboard size within its clamp range
/// - Usable storage and economy settings
fn validate_config(config: &AppConfig) -> Result<()> {
  // Scheduling
  anyhow::ensure!(
    config.sampler.interval_seconds > 0,
    "sampler.interval_seconds must be positive"
  );
  anyhow::ensure!(
    config.snapshot.interval_seconds > 0,
    "snapshot.interval_seconds must be positive"
  );
  anyhow::ensure!(
    (MIN_LEADERBOARD_SIZE..=MAX_LEADERBOARD_SIZE).contains(&config.snapshot.top_n),
    "snapshot.top_n must be in [{}, {}], got {}",
    MIN_LEADERBOARD_SIZE,
    MAX_LEADERBOARD_SIZE,
    config.snapshot.top_n
  );

  // Retention
  anyhow::ensure!(config.retention.days > 0, "retention.days must be positive");
  anyhow::ensure!(
    config.retention.purge_interval_hours > 0,
    "retention.purge_interval_hours must be positive"
  );

  // Storage
  anyhow::ensure!(!config.storage.path.is_empty(), "storage.path must not be empty");
  anyhow::ensure!(config.storage.pool_size > 0, "storage.pool_size must be positive");
  anyhow::ensure!(
    config.storage.operation_timeout_ms > 0,
    "storage.operation_timeout_ms must be positive"
  );

  // Queries
  anyhow::ensure!(
    config.query.history_raw_limit > 0 && config.query.display_limit > 0,
    "query limits must be positive"
  );

  // Economy API
  anyhow::ensure!(
    !config.economy.base_url.is_empty(),
    "economy.base_url must not be empty"
  );
  anyhow::ensure!(
    config.economy.max_concurrent > 0,
    "economy.max_concurrent must be positive"
  );

  Ok(())
}
