//! Well-known party identities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::crypto::LedgerPublicKey;

/// A named participant on the network together with its owning key.
///
/// Equality and hashing consider the owning key only: two references that
/// carry the same key denote the same party even if their display names
/// differ.
#[derive(Clone, Serialize, Deserialize)]
pub struct Party {
    name: String,
    owning_key: LedgerPublicKey,
}

impl Party {
    pub fn new(name: impl Into<String>, owning_key: LedgerPublicKey) -> Self {
        Self {
            name: name.into(),
            owning_key,
        }
    }

    /// Display name, e.g. `"BuyAttester"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owning_key(&self) -> &LedgerPublicKey {
        &self.owning_key
    }
}

impl PartialEq for Party {
    fn eq(&self, other: &Self) -> bool {
        self.owning_key == other.owning_key
    }
}

impl Eq for Party {}

impl Hash for Party {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owning_key.hash(state);
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Party({}, {})", self.name, self.owning_key.fingerprint())
    }
}
