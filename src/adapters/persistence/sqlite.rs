//! SQLite Ledger - Pooled Durable Balance Storage
//!
//! Implements the `Ledger` port over two tables: `player_balances`
//! (append-only history) and `last_balances` (one row per identity).
//! Every operation checks out its own pooled connection inside
//! `spawn_blocking`, bounded by the configured operation timeout, so a
//! transaction never shares a handle with an unrelated read.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, params};
use tracing::{debug, error, info, instrument, warn};

use super::error::LedgerError;
use crate::config::StorageConfig;
use crate::domain::balance::now_millis;
use crate::domain::{BalanceSample, Identity};
use crate::ports::ledger::{Ledger, RecordOutcome};

const SCHEMA: &str = include_str!("../../../migrations/001_balance_tables.sql");

const INSERT_HISTORY: &str =
    "INSERT INTO player_balances (player_uuid, timestamp, balance) VALUES (?1, ?2, ?3)";

const UPSERT_LAST: &str = "INSERT INTO last_balances (player_uuid, balance) VALUES (?1, ?2)
     ON CONFLICT(player_uuid) DO UPDATE SET balance = excluded.balance";

const SELECT_LAST: &str = "SELECT player_uuid, balance FROM last_balances";

const SELECT_HISTORY: &str = "SELECT timestamp, balance FROM player_balances
     WHERE player_uuid = ?1
     ORDER BY timestamp DESC, id DESC
     LIMIT ?2";

// Latest row per identity is the one with the highest id; timestamps can
// collide within a millisecond.
const SELECT_TOP: &str = "SELECT h.player_uuid, h.balance
     FROM player_balances h
     JOIN (SELECT player_uuid, MAX(id) AS latest_id
           FROM player_balances
           GROUP BY player_uuid) latest
       ON h.id = latest.latest_id
     ORDER BY h.balance DESC, h.player_uuid ASC
     LIMIT ?1";

const DELETE_BEFORE: &str = "DELETE FROM player_balances WHERE timestamp < ?1";

const MILLIS_PER_DAY: i64 = 86_400_000;

/// SQLite-backed ledger behind an r2d2 connection pool.
pub struct SqliteLedger {
    /// `None` once `close` has run.
    pool: RwLock<Option<Pool<SqliteConnectionManager>>>,
    /// Upper bound for a single storage call.
    operation_timeout: Duration,
}

impl SqliteLedger {
    /// Open (or create) the database, build the pool and apply the schema.
    ///
    /// Any failure here is a `LedgerError::Connection`: the service cannot
    /// run without a store.
    pub fn open(config: &StorageConfig) -> Result<Self, LedgerError> {
        let path = Path::new(&config.path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Connection(format!(
                    "cannot create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA journal_mode=WAL;")
        });

        let operation_timeout = Duration::from_millis(config.operation_timeout_ms);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(operation_timeout)
            .build(manager)
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        pool.get()
            .map_err(|e| LedgerError::Connection(e.to_string()))?
            .execute_batch(SCHEMA)
            .map_err(|e| LedgerError::Connection(format!("schema migration failed: {e}")))?;

        info!(
            path = %path.display(),
            pool_size = config.pool_size,
            "Balance store opened"
        );

        Ok(Self {
            pool: RwLock::new(Some(pool)),
            operation_timeout,
        })
    }

    /// Run `f` on a pooled connection off the async runtime, with a timeout.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, LedgerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, LedgerError> + Send + 'static,
    {
        let pool = self.pool.read().clone().ok_or(LedgerError::Closed)?;

        let task = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        });

        match tokio::time::timeout(self.operation_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(LedgerError::Task(join_error.to_string())),
            Err(_) => Err(LedgerError::Timeout {
                operation,
                timeout_ms: self.operation_timeout.as_millis(),
            }),
        }
    }

    /// Record a balance with an explicit timestamp.
    ///
    /// History insert and last-known upsert share one transaction; dropping
    /// an uncommitted `Transaction` rolls it back.
    pub async fn record_balance_at(
        &self,
        identity: Identity,
        balance: f64,
        timestamp_ms: i64,
    ) -> Result<(), LedgerError> {
        let key = identity.to_string();
        self.with_conn("record_balance", move |conn| {
            let tx = conn.transaction().map_err(LedgerError::Transaction)?;
            tx.execute(INSERT_HISTORY, params![key, timestamp_ms, balance])
                .map_err(LedgerError::Transaction)?;
            tx.execute(UPSERT_LAST, params![key, balance])
                .map_err(LedgerError::Transaction)?;
            tx.commit().map_err(LedgerError::Transaction)
        })
        .await
    }

    /// Delete history rows stamped strictly before `cutoff_ms`.
    pub async fn purge_before(&self, cutoff_ms: i64) -> Result<u64, LedgerError> {
        self.with_conn("purge_old_records", move |conn| {
            conn.execute(DELETE_BEFORE, params![cutoff_ms])
                .map(|deleted| deleted as u64)
                .map_err(LedgerError::Query)
        })
        .await
    }

    /// Number of history rows stored for an identity.
    pub async fn history_row_count(&self, identity: Identity) -> Result<u64, LedgerError> {
        let key = identity.to_string();
        self.with_conn("history_row_count", move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM player_balances WHERE player_uuid = ?1",
                params![key],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count.max(0) as u64)
            .map_err(LedgerError::Query)
        })
        .await
    }

    async fn try_last_balances(&self) -> Result<HashMap<Identity, f64>, LedgerError> {
        self.with_conn("last_balances", |conn| {
            let mut stmt = conn.prepare(SELECT_LAST).map_err(LedgerError::Query)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                })
                .map_err(LedgerError::Query)?;

            let mut balances = HashMap::new();
            for row in rows {
                let (key, balance) = row.map_err(LedgerError::Query)?;
                match key.parse::<Identity>() {
                    Ok(identity) => {
                        balances.insert(identity, balance);
                    }
                    Err(e) => warn!(key = %key, error = %e, "Skipping malformed last balance row"),
                }
            }
            Ok(balances)
        })
        .await
    }

    async fn try_balance_history(
        &self,
        identity: Identity,
        raw_limit: usize,
    ) -> Result<Vec<BalanceSample>, LedgerError> {
        let key = identity.to_string();
        let limit = i64::try_from(raw_limit).unwrap_or(i64::MAX);
        self.with_conn("balance_history", move |conn| {
            let mut stmt = conn.prepare(SELECT_HISTORY).map_err(LedgerError::Query)?;
            let samples = stmt
                .query_map(params![key, limit], |row| {
                    Ok(BalanceSample {
                        identity,
                        timestamp_ms: row.get(0)?,
                        balance: row.get(1)?,
                    })
                })
                .map_err(LedgerError::Query)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(LedgerError::Query)?;
            Ok(samples)
        })
        .await
    }

    async fn try_top_balances(&self, limit: usize) -> Result<Vec<(Identity, f64)>, LedgerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn("top_balances", move |conn| {
            let mut stmt = conn.prepare(SELECT_TOP).map_err(LedgerError::Query)?;
            let rows = stmt
                .query_map(params![limit], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                })
                .map_err(LedgerError::Query)?;

            let mut ranked = Vec::new();
            for row in rows {
                let (key, balance) = row.map_err(LedgerError::Query)?;
                match key.parse::<Identity>() {
                    Ok(identity) => ranked.push((identity, balance)),
                    Err(e) => warn!(key = %key, error = %e, "Skipping malformed history row"),
                }
            }
            Ok(ranked)
        })
        .await
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    #[instrument(skip(self, identity), fields(identity = %identity))]
    async fn record_balance(&self, identity: Identity, balance: f64) -> RecordOutcome {
        match self.record_balance_at(identity, balance, now_millis()).await {
            Ok(()) => RecordOutcome::Committed,
            Err(e @ LedgerError::Timeout { .. }) => {
                warn!(balance, error = %e, "Balance write outcome unknown");
                RecordOutcome::TimedOut
            }
            Err(e) => {
                error!(balance, error = %e, "Failed to record balance");
                RecordOutcome::RolledBack
            }
        }
    }

    async fn last_balances(&self) -> HashMap<Identity, f64> {
        self.try_last_balances().await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to load last balances");
            HashMap::new()
        })
    }

    async fn balance_history(&self, identity: Identity, raw_limit: usize) -> Vec<BalanceSample> {
        self.try_balance_history(identity, raw_limit)
            .await
            .unwrap_or_else(|e| {
                error!(identity = %identity, error = %e, "Failed to get balance history");
                Vec::new()
            })
    }

    async fn top_balances(&self, limit: usize) -> Vec<(Identity, f64)> {
        self.try_top_balances(limit).await.unwrap_or_else(|e| {
            error!(limit, error = %e, "Failed to get top balances");
            Vec::new()
        })
    }

    #[instrument(skip(self))]
    async fn purge_old_records(&self, retention_days: u32) -> u64 {
        let cutoff_ms = now_millis() - i64::from(retention_days) * MILLIS_PER_DAY;
        match self.purge_before(cutoff_ms).await {
            Ok(deleted) => {
                info!(deleted, cutoff_ms, "Purged old balance records");
                deleted
            }
            Err(e) => {
                error!(error = %e, "Failed to purge old records");
                0
            }
        }
    }

    async fn close(&self) {
        if self.pool.write().take().is_some() {
            info!("Balance store closed");
        } else {
            debug!("Balance store already closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn open_ledger(dir: &TempDir) -> SqliteLedger {
        let config = StorageConfig {
            path: dir.path().join("balances.db").display().to_string(),
            pool_size: 2,
            busy_timeout_ms: 1_000,
            operation_timeout_ms: 5_000,
        };
        SqliteLedger::open(&config).unwrap()
    }

    fn exec(ledger: &SqliteLedger, sql: &str) {
        let pool = ledger.pool.read().clone().unwrap();
        pool.get().unwrap().execute_batch(sql).unwrap();
    }

    #[tokio::test]
    async fn test_record_writes_history_and_last_known() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        let id = Uuid::new_v4();

        assert_eq!(ledger.record_balance(id, 10.0).await, RecordOutcome::Committed);
        assert_eq!(ledger.record_balance(id, 20.0).await, RecordOutcome::Committed);

        assert_eq!(ledger.history_row_count(id).await.unwrap(), 2);
        let last = ledger.last_balances().await;
        assert_eq!(last.len(), 1);
        assert_eq!(last.get(&id), Some(&20.0));
    }

    #[tokio::test]
    async fn test_failed_upsert_rolls_back_history_insert() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        let id = Uuid::new_v4();

        ledger.record_balance(id, 5.0).await;
        let before = ledger.history_row_count(id).await.unwrap();

        exec(
            &ledger,
            "CREATE TRIGGER fail_last_insert BEFORE INSERT ON last_balances
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;
             CREATE TRIGGER fail_last_update BEFORE UPDATE ON last_balances
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        );

        assert_eq!(ledger.record_balance(id, 99.0).await, RecordOutcome::RolledBack);
        assert_eq!(ledger.history_row_count(id).await.unwrap(), before);
        assert_eq!(ledger.last_balances().await.get(&id), Some(&5.0));

        // The pooled connection is back in auto-commit mode afterwards.
        exec(&ledger, "DROP TRIGGER fail_last_insert; DROP TRIGGER fail_last_update;");
        assert_eq!(ledger.record_balance(id, 99.0).await, RecordOutcome::Committed);
        assert_eq!(ledger.history_row_count(id).await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn test_write_blocked_past_timeout_reports_timed_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("balances.db");
        let ledger = SqliteLedger::open(&StorageConfig {
            path: path.display().to_string(),
            pool_size: 2,
            busy_timeout_ms: 5_000,
            operation_timeout_ms: 100,
        })
        .unwrap();
        let id = Uuid::new_v4();

        let locker = Connection::open(&path).unwrap();
        locker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        assert_eq!(ledger.record_balance(id, 7.0).await, RecordOutcome::TimedOut);

        // The blocked write is still pending and lands once the lock clears.
        locker.execute_batch("COMMIT;").unwrap();
        let mut rows = 0;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if let Ok(count) = ledger.history_row_count(id).await {
                rows = count;
                if rows == 1 {
                    break;
                }
            }
        }
        assert_eq!(rows, 1);
        assert_eq!(ledger.last_balances().await.get(&id), Some(&7.0));
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_limited() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        let id = Uuid::new_v4();

        for i in 0..120_i64 {
            ledger.record_balance_at(id, i as f64, 1_000 + i).await.unwrap();
        }

        let history = ledger.balance_history(id, 100).await;
        assert_eq!(history.len(), 100);
        assert_eq!(history[0].timestamp_ms, 1_119);
        assert!(history.windows(2).all(|w| w[0].timestamp_ms >= w[1].timestamp_ms));
    }

    #[tokio::test]
    async fn test_history_for_unknown_identity_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        assert!(ledger.balance_history(Uuid::new_v4(), 100).await.is_empty());
    }

    #[tokio::test]
    async fn test_purge_keeps_rows_at_cutoff_and_last_known() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        let id = Uuid::new_v4();

        ledger.record_balance_at(id, 1.0, 999).await.unwrap();
        ledger.record_balance_at(id, 2.0, 1_000).await.unwrap();
        ledger.record_balance_at(id, 3.0, 1_001).await.unwrap();

        assert_eq!(ledger.purge_before(1_000).await.unwrap(), 1);
        assert_eq!(ledger.history_row_count(id).await.unwrap(), 2);
        assert_eq!(ledger.last_balances().await.get(&id), Some(&3.0));
    }

    #[tokio::test]
    async fn test_purge_old_records_uses_retention_window() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        let old = Uuid::new_v4();
        let recent = Uuid::new_v4();
        let now = now_millis();

        ledger.record_balance_at(old, 1.0, now - 61 * MILLIS_PER_DAY).await.unwrap();
        ledger.record_balance_at(recent, 2.0, now - 59 * MILLIS_PER_DAY).await.unwrap();

        assert_eq!(ledger.purge_old_records(60).await, 1);
        assert_eq!(ledger.history_row_count(old).await.unwrap(), 0);
        assert_eq!(ledger.history_row_count(recent).await.unwrap(), 1);

        let last = ledger.last_balances().await;
        assert_eq!(last.len(), 2);
        assert_eq!(last.get(&old), Some(&1.0));
    }

    #[tokio::test]
    async fn test_top_balances_uses_latest_row() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        let a = Uuid::from_u128(0xA);
        let b = Uuid::from_u128(0xB);
        let c = Uuid::from_u128(0xC);

        ledger.record_balance_at(a, 900.0, 1).await.unwrap();
        ledger.record_balance_at(a, 300.0, 2).await.unwrap();
        ledger.record_balance_at(b, 500.0, 3).await.unwrap();
        ledger.record_balance_at(c, 100.0, 4).await.unwrap();

        assert_eq!(ledger.top_balances(2).await, vec![(b, 500.0), (a, 300.0)]);
        assert_eq!(ledger.top_balances(10).await.len(), 3);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_degrades() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        let id = Uuid::new_v4();

        ledger.close().await;
        ledger.close().await;

        assert_eq!(ledger.record_balance(id, 1.0).await, RecordOutcome::RolledBack);
        assert!(ledger.last_balances().await.is_empty());
        assert!(ledger.top_balances(5).await.is_empty());
        assert_eq!(ledger.purge_old_records(60).await, 0);
        assert!(matches!(
            ledger.history_row_count(id).await,
            Err(LedgerError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_reopen_preserves_last_known() {
        let dir = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        {
            let ledger = open_ledger(&dir);
            ledger.record_balance(id, 42.5).await;
            ledger.close().await;
        }
        let ledger = open_ledger(&dir);
        assert_eq!(ledger.last_balances().await.get(&id), Some(&42.5));
    }
}
