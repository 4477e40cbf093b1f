//! # Transaction Vault
//!
//! Each party's local record of finalised transactions. Only fully signed,
//! notarised transactions belong here; flows record nothing before the
//! notary has signed.
//!
//! The vault is in-memory and keyed by transaction id. Clones share the same
//! underlying map, so a node and its API handlers can hold the same vault.

use dashmap::DashMap;
use std::sync::Arc;

use crate::transaction::{
    CommandData, ContractState, SecureHash, SignedTransaction, StateAndRef, StateRef,
    StateResolver,
};

/// Finalised transactions known to one party.
pub struct TransactionVault<S, C> {
    transactions: Arc<DashMap<SecureHash, SignedTransaction<S, C>>>,
}

impl<S, C> Clone for TransactionVault<S, C> {
    fn clone(&self) -> Self {
        Self {
            transactions: Arc::clone(&self.transactions),
        }
    }
}

impl<S, C> Default for TransactionVault<S, C> {
    fn default() -> Self {
        Self {
            transactions: Arc::new(DashMap::new()),
        }
    }
}

impl<S: ContractState, C: CommandData> TransactionVault<S, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finalised transaction. Returns `false` if it was already known.
    pub fn record(&self, stx: SignedTransaction<S, C>) -> bool {
        let id = stx.id();
        let fresh = self.transactions.insert(id, stx).is_none();
        if fresh {
            tracing::debug!(tx_id = %id, "transaction recorded");
        }
        fresh
    }

    pub fn get(&self, tx_id: &SecureHash) -> Option<SignedTransaction<S, C>> {
        self.transactions.get(tx_id).map(|e| e.value().clone())
    }

    pub fn contains(&self, tx_id: &SecureHash) -> bool {
        self.transactions.contains_key(tx_id)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Every recorded transaction, in no particular order.
    pub fn all(&self) -> Vec<SignedTransaction<S, C>> {
        self.transactions.iter().map(|e| e.value().clone()).collect()
    }

    /// Every output state of every recorded transaction.
    pub fn states(&self) -> Vec<StateAndRef<S>> {
        self.transactions
            .iter()
            .flat_map(|e| {
                let tx_id = *e.key();
                e.value()
                    .tx
                    .outputs
                    .iter()
                    .enumerate()
                    .map(|(i, s)| StateAndRef {
                        state: s.clone(),
                        reference: StateRef::new(tx_id, i as u32),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl<S: ContractState, C: CommandData> StateResolver<S> for TransactionVault<S, C> {
    fn resolve(&self, state_ref: &StateRef) -> Option<S> {
        self.transactions
            .get(&state_ref.tx_id)
            .and_then(|e| e.value().tx.outputs.get(state_ref.index as usize).cloned())
    }
}
