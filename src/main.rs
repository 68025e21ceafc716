//! Balance Tracker - Entry Point
//!
//! Initializes configuration, logging and the balance store, then runs
//! the periodic sampling, snapshot and purge tasks until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from the first CLI argument) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Open the SQLite ledger, fatal on failure
//! 4. Warm the balance cache from the last-known table
//! 5. Create the economy HTTP client (BalanceSource + NameResolver), probe reachability
//! 6. Spawn the HTTP server (probes, metrics, commands)
//! 7. Spawn sampler, optional top-N snapshot and retention purge tasks
//! 8. Wait for SIGINT → graceful shutdown (stop tasks → close store → exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use balance_tracker::adapters::economy::{EconomyClientConfig, HttpEconomyClient};
use balance_tracker::adapters::http::{self, ServerState};
use balance_tracker::adapters::metrics::MetricsRegistry;
use balance_tracker::adapters::persistence::SqliteLedger;
use balance_tracker::config;
use balance_tracker::ports::ledger::Ledger;
use balance_tracker::usecases::retention::next_run_at;
use balance_tracker::usecases::scheduler::run_every;
use balance_tracker::usecases::{
  BalanceCache, BalanceCommands, BalanceSampler, QueryService, RetentionPurger,
};

const SECONDS_PER_HOUR: u64 = 3_600;

#[tokio::main]
async fn main() -> Result<()> {
  // ── 1. Load configuration ───────────────────────────────
  let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
  let config = config::loader::load_config(&config_path)
    .context("Failed to load configuration")?;

  // ── 2. Initialize structured JSON logging ───────────────
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.service.log_filter())),
    )
    .json()
    .init();

  info!(
    name = %config.service.name,
    version = env!("CARGO_PKG_VERSION"),
    debug = config.service.debug,
    "Starting Balance Tracker"
  );

  // ── 3. Open the balance store (fatal on failure) ────────
  let ledger = Arc::new(
    SqliteLedger::open(&config.storage).context("Failed to connect to database")?,
  );

  // ── 4. Warm the cache ───────────────────────────────────
  let cache = Arc::new(BalanceCache::new());
  cache.warm_load(ledger.as_ref()).await;

  let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics")?);
  metrics.set_cache_size(cache.len());

  // ── 5. Economy client ───────────────────────────────────
  let economy = Arc::new(
    HttpEconomyClient::new(EconomyClientConfig::from(&config.economy))
      .context("Failed to create economy client")?,
  );
  if economy.health_check().await {
    info!(base_url = %config.economy.base_url, "Economy API reachable");
  } else {
    warn!(
      base_url = %config.economy.base_url,
      "Economy API unreachable at startup, balance checks will keep retrying"
    );
  }

  // ── 6. Shutdown channels + HTTP server ──────────────────
  let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
  let (ready_tx, ready_rx) = watch::channel(true);

  let query = QueryService::new(
    Arc::clone(&ledger),
    Arc::clone(&economy),
    Arc::clone(&cache),
    config.query.history_raw_limit,
    config.query.display_limit,
    config.snapshot.top_n,
  );
  let server_state = Arc::new(ServerState {
    commands: Arc::new(BalanceCommands::new(query)),
    metrics: Arc::clone(&metrics),
    ready: ready_rx,
  });
  let http_handle = tokio::spawn(http::serve(
    config.http.bind_address.clone(),
    server_state,
    shutdown_tx.subscribe(),
  ));

  // ── 7. Periodic tasks ───────────────────────────────────
  let sampler = Arc::new(BalanceSampler::new(
    Arc::clone(&economy),
    Arc::clone(&ledger),
    Arc::clone(&cache),
  ));

  let mut tasks = Vec::new();

  {
    let sampler = Arc::clone(&sampler);
    let metrics = Arc::clone(&metrics);
    let cache = Arc::clone(&cache);
    tasks.push(tokio::spawn(run_every(
      "balance_check",
      Duration::ZERO,
      Duration::from_secs(config.sampler.interval_seconds),
      shutdown_tx.subscribe(),
      move || {
        let sampler = Arc::clone(&sampler);
        let metrics = Arc::clone(&metrics);
        let cache = Arc::clone(&cache);
        async move {
          let report = sampler.sample_once().await;
          metrics.observe_sample(&report);
          metrics.set_cache_size(cache.len());
        }
      },
    )));
  }

  if config.snapshot.enabled {
    let sampler = Arc::clone(&sampler);
    let metrics = Arc::clone(&metrics);
    let top_n = config.snapshot.top_n;
    tasks.push(tokio::spawn(run_every(
      "top_balance_snapshot",
      Duration::from_secs(config.snapshot.interval_seconds),
      Duration::from_secs(config.snapshot.interval_seconds),
      shutdown_tx.subscribe(),
      move || {
        let sampler = Arc::clone(&sampler);
        let metrics = Arc::clone(&metrics);
        async move {
          let report = sampler.snapshot_top_once(top_n).await;
          metrics.observe_snapshot(&report);
        }
      },
    )));
  }

  {
    let purger = Arc::new(RetentionPurger::new(Arc::clone(&ledger), config.retention.days));
    let metrics = Arc::clone(&metrics);
    let initial_delay = Duration::from_secs(config.retention.initial_delay_seconds);
    info!(
      retention_days = purger.retention_days(),
      next_run = %next_run_at(initial_delay).format("%b %d, %Y %H:%M:%S"),
      "Purge task scheduled"
    );
    tasks.push(tokio::spawn(run_every(
      "retention_purge",
      initial_delay,
      Duration::from_secs(config.retention.purge_interval_hours * SECONDS_PER_HOUR),
      shutdown_tx.subscribe(),
      move || {
        let purger = Arc::clone(&purger);
        let metrics = Arc::clone(&metrics);
        async move {
          metrics.observe_purge(purger.purge_once().await);
        }
      },
    )));
  }

  info!(tasks = tasks.len(), "All tasks spawned, tracker is running");

  // ── 8. Wait for SIGINT ──────────────────────────────────
  if let Err(e) = signal::ctrl_c().await {
    error!(error = %e, "Failed to listen for SIGINT, shutting down");
  } else {
    info!("SIGINT received, initiating graceful shutdown");
  }

  // Graceful shutdown: stop → wait → close store
  let _ = ready_tx.send(false);
  let _ = shutdown_tx.send(());
  info!("Shutdown signal broadcast to all tasks");

  for task in tasks {
    let _ = tokio::time::timeout(Duration::from_secs(30), task).await;
  }

  match tokio::time::timeout(Duration::from_secs(5), http_handle).await {
    Ok(Ok(Err(e))) => error!(error = %e, "HTTP server failed"),
    Ok(_) => {}
    Err(_) => error!("HTTP server did not stop in time"),
  }

  ledger.close().await;
  info!("Shutdown complete");
  Ok(())
}
