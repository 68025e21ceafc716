//! Periodic Task Runner
//!
//! Drives one job on a fixed period until shutdown. A run always finishes
//! before the next tick is taken, and ticks missed while a run was in
//! progress are skipped instead of fired in a burst.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::info;

/// Run `job` every `period`, starting after `initial_delay`.
///
/// `period` must be non-zero.
pub async fn run_every<F, Fut>(
  task: &'static str,
  initial_delay: Duration,
  period: Duration,
  mut shutdown_rx: broadcast::Receiver<()>,
  mut job: F,
) where
  F: FnMut() -> Fut,
  Fut: Future<Output = ()>,
{
  let mut ticker = interval_at(Instant::now() + initial_delay, period);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

  info!(
    task,
    initial_delay_secs = initial_delay.as_secs(),
    period_secs = period.as_secs(),
    "Periodic task started"
  );

  loop {
    tokio::select! {
      biased;
      _ = shutdown_rx.recv() => {
        info!(task, "Periodic task received shutdown signal");
        break;
      }
      _ = ticker.tick() => {
        job().await;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[tokio::test(start_paused = true)]
  async fn test_runs_on_period_until_shutdown() {
    let runs = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let counter = Arc::clone(&runs);
    let handle = tokio::spawn(run_every(
      "test",
      Duration::ZERO,
      Duration::from_secs(10),
      shutdown_rx,
      move || {
        let counter = Arc::clone(&counter);
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
        }
      },
    ));

    tokio::time::sleep(Duration::from_secs(35)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 4);
  }

  #[tokio::test(start_paused = true)]
  async fn test_initial_delay_defers_first_run() {
    let runs = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let counter = Arc::clone(&runs);
    let handle = tokio::spawn(run_every(
      "delayed",
      Duration::from_secs(60),
      Duration::from_secs(10),
      shutdown_rx,
      move || {
        let counter = Arc::clone(&counter);
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
        }
      },
    ));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
  }
}
