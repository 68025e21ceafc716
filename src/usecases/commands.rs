//! Balance Commands - Textual Command Surface
//!
//! Turns query outcomes into the status messages shown to users. Every
//! call produces a message; nothing here returns an error.

use chrono::{DateTime, Local};

use super::query_service::{HistoryOutcome, QueryService};
use crate::ports::ledger::Ledger;
use crate::ports::name_resolver::NameResolver;

/// Usage line for the history command.
pub const HISTORY_USAGE: &str = "Usage: /balancehistory <player>";

/// Usage line for the leaderboard command.
pub const LEADERBOARD_USAGE: &str = "Usage: /balancetop [size]";

const TIME_FORMAT: &str = "%b %d, %Y %H:%M:%S";

/// Command handlers over a [`QueryService`].
pub struct BalanceCommands<L: Ledger, N: NameResolver> {
  query: QueryService<L, N>,
}

impl<L: Ledger, N: NameResolver> BalanceCommands<L, N> {
  /// Wrap a query service.
  pub fn new(query: QueryService<L, N>) -> Self {
    Self { query }
  }

  /// `/balancehistory <player>`
  pub async fn history(&self, args: &[&str]) -> String {
    let [name] = args else {
      return HISTORY_USAGE.to_string();
    };

    match self.query.history(name).await {
      HistoryOutcome::PlayerNotFound => format!("Player not found: {name}"),
      HistoryOutcome::NoRecords { .. } => format!("No balance records found for {name}"),
      HistoryOutcome::Changes {
        entries, current, ..
      } => {
        let mut lines = Vec::with_capacity(entries.len() + 2);
        lines.push(format!(
          "Balance changes for {name} (last {} changes):",
          entries.len()
        ));
        for entry in &entries {
          lines.push(format!(
            "- {}: {}",
            format_timestamp(entry.timestamp_ms),
            format_currency(entry.balance)
          ));
        }
        if let Some(current) = current {
          lines.push(format!("Current balance: {}", format_currency(current)));
        }
        lines.join("\n")
      }
    }
  }

  /// `/balancetop [size]`
  pub async fn leaderboard(&self, args: &[&str]) -> String {
    let size = match args {
      [] => None,
      [size] => Some(*size),
      _ => return LEADERBOARD_USAGE.to_string(),
    };

    match self.query.leaderboard(size).await {
      Err(e) => e.to_string(),
      Ok(entries) if entries.is_empty() => "No balance records found".to_string(),
      Ok(entries) => {
        let mut lines = Vec::with_capacity(entries.len() + 1);
        lines.push(format!("Top {} balances:", entries.len()));
        for entry in &entries {
          lines.push(format!(
            "#{} {} - {}",
            entry.rank,
            entry.display_name(),
            format_currency(entry.balance)
          ));
        }
        lines.join("\n")
      }
    }
  }
}

/// Two-decimal dollar rendering.
pub fn format_currency(amount: f64) -> String {
  if amount < 0.0 {
    format!("-${:.2}", amount.abs())
  } else {
    format!("${amount:.2}")
  }
}

/// Local-time rendering of a Unix-millisecond timestamp.
pub fn format_timestamp(timestamp_ms: i64) -> String {
  DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
    || timestamp_ms.to_string(),
    |utc| utc.with_timezone(&Local).format(TIME_FORMAT).to_string(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_currency() {
    assert_eq!(format_currency(1234.5), "$1234.50");
    assert_eq!(format_currency(0.004), "$0.00");
    assert_eq!(format_currency(-3.5), "-$3.50");
  }

  #[test]
  fn test_format_timestamp_is_readable() {
    let text = format_timestamp(1_700_000_000_000);
    assert!(text.contains("2023"), "unexpected timestamp text: {text}");
  }
}
