use thiserror::Error;

/// Storage faults raised inside the SQLite ledger.
///
/// Only `Connection` escapes to callers (at startup). Everything else is
/// logged at the `Ledger` boundary and converted to a safe default.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot open balance store: {0}")]
    Connection(String),

    #[error("balance transaction rolled back: {0}")]
    Transaction(#[source] rusqlite::Error),

    #[error("balance query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u128,
    },

    #[error("storage task failed: {0}")]
    Task(String),

    #[error("balance store is closed")]
    Closed,
}
