//! Hashing utilities for stable configuration identities.
//!
//! Configurations are identified by a short, content-addressed id so CI
//! tooling can map results back to matrix points across runs:
//! - `ConfigId`: a truncated 12-character SHA-256 of the canonical form
//! - `Hashable`: canonical-form hashing for any type that can render one

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::CONFIG_ID_LEN;

/// A content-addressed id identifying one configuration.
///
/// # Format
///
/// A lowercase hexadecimal string, e.g., `"a1b2c3d4e5f6"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(pub String);

impl std::fmt::Display for ConfigId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Types with a canonical textual form that identifies them.
///
/// The canonical form must be stable across runs and platforms; the id is
/// derived from it and nothing else.
pub trait Hashable {
  fn canonical_form(&self) -> String;

  fn compute_id(&self) -> ConfigId {
    let digest = hash_bytes(self.canonical_form().as_bytes());
    ConfigId(digest[..CONFIG_ID_LEN].to_string())
  }
}

/// Compute the full 64-character SHA-256 hex digest of arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(data);
  hex::encode(hasher.finalize())
}
