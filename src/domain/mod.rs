//! Domain layer - Core balance-tracking rules.
//!
//! Pure logic: the significance rule, history compression and leaderboard
//! ranking. No I/O here (hexagonal architecture inner ring).

pub mod balance;
pub mod history;
pub mod leaderboard;

// Re-export core types for convenience
pub use balance::{BalanceSample, ChangeKind, Identity, SIGNIFICANCE_EPSILON};
pub use history::{compress, display_slice};
pub use leaderboard::ValidationError;
