//! Persistence Adapters - SQLite Balance Ledger
//!
//! Implements the Ledger port on SQLite through an r2d2 pool.
//! History rows are append-only; last-known rows are upserted in the
//! same transaction.

pub mod error;
pub mod sqlite;

pub use error::LedgerError;
pub use sqlite::SqliteLedger;
