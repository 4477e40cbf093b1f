//! Identity resolution.
//!
//! The [`IdentityService`] maps party names and owning keys to well-known
//! [`Party`] references. [`NetworkMapCache`] is the in-memory implementation
//! every node in a local network shares.

use dashmap::DashMap;
use std::sync::Arc;

use super::party::Party;
use crate::crypto::LedgerPublicKey;

/// Resolves party references.
pub trait IdentityService: Send + Sync {
    /// Look up a party by display name.
    fn well_known_party(&self, name: &str) -> Option<Party>;

    /// Look up a party by owning key.
    fn party_from_key(&self, key: &LedgerPublicKey) -> Option<Party>;

    /// Every party this service knows about.
    fn all_parties(&self) -> Vec<Party>;
}

/// In-memory network map. Cheap to clone; clones share the same entries.
#[derive(Clone, Default)]
pub struct NetworkMapCache {
    by_name: Arc<DashMap<String, Party>>,
    by_key: Arc<DashMap<LedgerPublicKey, Party>>,
}

impl NetworkMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a party.
    pub fn register(&self, party: Party) {
        tracing::debug!(party = %party, key = %party.owning_key().fingerprint(), "registering party");
        self.by_key.insert(*party.owning_key(), party.clone());
        self.by_name.insert(party.name().to_string(), party);
    }
}

impl IdentityService for NetworkMapCache {
    fn well_known_party(&self, name: &str) -> Option<Party> {
        self.by_name.get(name).map(|p| p.value().clone())
    }

    fn party_from_key(&self, key: &LedgerPublicKey) -> Option<Party> {
        self.by_key.get(key).map(|p| p.value().clone())
    }

    fn all_parties(&self) -> Vec<Party> {
        let mut parties: Vec<Party> = self.by_name.iter().map(|e| e.value().clone()).collect();
        parties.sort_by(|a, b| a.name().cmp(b.name()));
        parties
    }
}
