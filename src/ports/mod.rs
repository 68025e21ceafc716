//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `BalanceSource`: Economy engine polled for current balances
//! - `NameResolver`: Display names for identities
//! - `Ledger`: Durable balance history and last-known values

pub mod balance_source;
pub mod ledger;
pub mod name_resolver;

pub use balance_source::BalanceSource;
pub use ledger::{Ledger, RecordOutcome};
pub use name_resolver::NameResolver;
