//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain rules with port interfaces to implement the
//! service's workflows. Each use case is a self-contained operation.
//!
//! Use cases:
//! - `BalanceCache`: Last-known balances shared across tasks
//! - `BalanceSampler`: Change-triggered recording and top-N snapshots
//! - `RetentionPurger`: Age-based history deletion
//! - `QueryService`: Compressed history and leaderboard reads
//! - `BalanceCommands`: Textual command replies
//! - `scheduler`: Serialized periodic task loop

pub mod balance_cache;
pub mod commands;
pub mod query_service;
pub mod retention;
pub mod sampler;
pub mod scheduler;

pub use balance_cache::BalanceCache;
pub use commands::BalanceCommands;
pub use query_service::{HistoryOutcome, LeaderboardEntry, QueryService};
pub use retention::RetentionPurger;
pub use sampler::{BalanceSampler, SampleReport, SnapshotReport};
