//! Economy API wire types.

use serde::Deserialize;

use crate::domain::Identity;

/// One entry of `GET /identities`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityRecord {
  /// Account identity.
  pub id: Identity,
  /// Display name, when the economy knows one.
  #[serde(default)]
  pub name: Option<String>,
}

/// Body of `GET /balances/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
  /// Current balance.
  pub balance: f64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_identity_record_name_is_optional() {
    let records: Vec<IdentityRecord> = serde_json::from_str(
      r#"[{"id":"00000000-0000-0000-0000-000000000001","name":"alice"},
          {"id":"00000000-0000-0000-0000-000000000002"}]"#,
    )
    .unwrap();
    assert_eq!(records[0].name.as_deref(), Some("alice"));
    assert!(records[1].name.is_none());
  }
}
