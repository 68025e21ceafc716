//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Intervals, retention and storage tuning are externalized here;
//! nothing is hardcoded in the usecases layer.

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before any task is spawned.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Change-detection sampling.
  #[serde(default)]
  pub sampler: SamplerConfig,
  /// Top-N snapshot mode.
  #[serde(default)]
  pub snapshot: SnapshotConfig,
  /// History retention and purge scheduling.
  #[serde(default)]
  pub retention: RetentionConfig,
  /// SQLite storage.
  #[serde(default)]
  pub storage: StorageConfig,
  /// Read-side query limits.
  #[serde(default)]
  pub query: QueryConfig,
  /// Economy engine HTTP API.
  pub economy: EconomyConfig,
  /// Health, metrics and command HTTP server.
  #[serde(default)]
  pub http: HttpConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Log per-identity sampling detail.
  #[serde(default)]
  pub debug: bool,
}

impl ServiceConfig {
  /// Effective filter directive when `RUST_LOG` is not set.
  pub fn log_filter(&self) -> &str {
    if self.debug { "debug" } else { &self.log_level }
  }
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
      debug: false,
    }
  }
}

/// Change-detection sampler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
  /// Seconds between sampling runs.
  #[serde(default = "default_sample_interval")]
  pub interval_seconds: u64,
}

impl Default for SamplerConfig {
  fn default() -> Self {
    Self {
      interval_seconds: default_sample_interval(),
    }
  }
}

/// Top-N snapshot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
  /// Run the snapshot task at all.
  #[serde(default)]
  pub enabled: bool,
  /// Seconds between snapshots.
  #[serde(default = "default_snapshot_interval")]
  pub interval_seconds: u64,
  /// Identities recorded per snapshot; also the default leaderboard size.
  #[serde(default = "default_top_n")]
  pub top_n: usize,
}

impl Default for SnapshotConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      interval_seconds: default_snapshot_interval(),
      top_n: default_top_n(),
    }
  }
}

/// Retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
  /// Maximum age of a history row in days.
  #[serde(default = "default_retention_days")]
  pub days: u32,
  /// Hours between purge runs.
  #[serde(default = "default_purge_interval")]
  pub purge_interval_hours: u64,
  /// Delay before the first purge (seconds).
  #[serde(default = "default_purge_delay")]
  pub initial_delay_seconds: u64,
}

impl Default for RetentionConfig {
  fn default() -> Self {
    Self {
      days: default_retention_days(),
      purge_interval_hours: default_purge_interval(),
      initial_delay_seconds: default_purge_delay(),
    }
  }
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
  /// Database file path.
  #[serde(default = "default_db_path")]
  pub path: String,
  /// Maximum pooled connections.
  #[serde(default = "default_pool_size")]
  pub pool_size: u32,
  /// SQLite busy timeout per connection (milliseconds).
  #[serde(default = "default_busy_timeout")]
  pub busy_timeout_ms: u64,
  /// Upper bound for one storage operation (milliseconds).
  #[serde(default = "default_operation_timeout")]
  pub operation_timeout_ms: u64,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      path: default_db_path(),
      pool_size: default_pool_size(),
      busy_timeout_ms: default_busy_timeout(),
      operation_timeout_ms: default_operation_timeout(),
    }
  }
}

/// Query limits.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
  /// Raw rows fetched per history query.
  #[serde(default = "default_raw_limit")]
  pub history_raw_limit: usize,
  /// Compressed changes shown per history query.
  #[serde(default = "default_display_limit")]
  pub display_limit: usize,
}

impl Default for QueryConfig {
  fn default() -> Self {
    Self {
      history_raw_limit: default_raw_limit(),
      display_limit: default_display_limit(),
    }
  }
}

/// Economy API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EconomyConfig {
  /// Base URL of the economy HTTP API.
  pub base_url: String,
  /// Request timeout (milliseconds).
  #[serde(default = "default_economy_timeout")]
  pub timeout_ms: u64,
  /// Maximum concurrent requests.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  /// Retries on transient errors.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
  /// Bind address for health, metrics and commands.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      bind_address: default_bind_address(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "balance-tracker".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_sample_interval() -> u64 {
  300
}

fn default_snapshot_interval() -> u64 {
  3_600
}

fn default_top_n() -> usize {
  100
}

fn default_retention_days() -> u32 {
  60
}

fn default_purge_interval() -> u64 {
  24
}

fn default_purge_delay() -> u64 {
  13_824 // 0.16 of a day
}

fn default_db_path() -> String {
  "data/balances.db".to_string()
}

fn default_pool_size() -> u32 {
  4
}

fn default_busy_timeout() -> u64 {
  5_000
}

fn default_operation_timeout() -> u64 {
  5_000
}

fn default_raw_limit() -> usize {
  crate::domain::history::DEFAULT_RAW_LIMIT
}

fn default_display_limit() -> usize {
  crate::domain::history::DEFAULT_DISPLAY_LIMIT
}

fn default_economy_timeout() -> u64 {
  5_000
}

fn default_max_concurrent() -> usize {
  8
}

fn default_max_retries() -> u32 {
  2
}

fn default_bind_address() -> String {
  "0.0.0.0:9090".to_string()
}
