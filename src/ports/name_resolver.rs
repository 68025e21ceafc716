//! Name Resolver Port - Identity Display Names
//!
//! Used only by the presentation surface; never consulted by the sampler.

use async_trait::async_trait;

use crate::domain::Identity;

/// Trait for identity/name lookups.
#[async_trait]
pub trait NameResolver: Send + Sync + 'static {
  /// Display name for an identity, if one is known.
  async fn resolve_name(&self, identity: Identity) -> Option<String>;

  /// Case-insensitive lookup of an identity by display name.
  async fn find_identity(&self, name: &str) -> Option<Identity>;
}
