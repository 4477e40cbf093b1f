//! Signed transactions and signature-set verification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::builder::WireTransaction;
use super::signing::TransactionSignature;
use super::types::{CommandData, ContractState, SecureHash};
use crate::crypto::LedgerPublicKey;

/// Why a signature set was found wanting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The id carried by the transaction does not match its contents.
    #[error("transaction id mismatch: carried {carried}, computed {computed}")]
    IdMismatch { carried: String, computed: String },

    /// An attached signature does not verify over the transaction id.
    #[error("invalid signature by key {key}")]
    InvalidSignature { key: String },

    /// Required signers that have not signed yet.
    #[error("missing signatures from {}", keys.join(", "))]
    MissingSignatures { keys: Vec<String> },
}

/// A [`WireTransaction`] plus the signatures collected so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction<S, C> {
    pub tx: WireTransaction<S, C>,
    pub sigs: Vec<TransactionSignature>,
}

impl<S: ContractState, C: CommandData> SignedTransaction<S, C> {
    pub fn new(tx: WireTransaction<S, C>, sigs: Vec<TransactionSignature>) -> Self {
        Self { tx, sigs }
    }

    pub fn id(&self) -> SecureHash {
        self.tx.id
    }

    /// Attach a signature. A second signature by the same key replaces the first.
    pub fn with_signature(mut self, sig: TransactionSignature) -> Self {
        self.sigs.retain(|s| s.by != sig.by);
        self.sigs.push(sig);
        self
    }

    pub fn with_signatures(self, sigs: impl IntoIterator<Item = TransactionSignature>) -> Self {
        sigs.into_iter().fold(self, |stx, sig| stx.with_signature(sig))
    }

    /// Every command signer plus the notary.
    pub fn required_signing_keys(&self) -> BTreeSet<LedgerPublicKey> {
        let mut keys: BTreeSet<LedgerPublicKey> = self
            .tx
            .commands
            .iter()
            .flat_map(|c| c.signers.iter().copied())
            .collect();
        keys.insert(*self.tx.notary.owning_key());
        keys
    }

    /// Keys that have signed.
    pub fn signed_by(&self) -> BTreeSet<LedgerPublicKey> {
        self.sigs.iter().map(|s| s.by).collect()
    }

    /// Required keys that have not signed.
    pub fn missing_signers(&self) -> BTreeSet<LedgerPublicKey> {
        let signed = self.signed_by();
        self.required_signing_keys()
            .into_iter()
            .filter(|k| !signed.contains(k))
            .collect()
    }

    /// Check the id, every attached signature, and that all required signers
    /// have signed except those in `allowed_missing`.
    pub fn verify_signatures_except(
        &self,
        allowed_missing: &[LedgerPublicKey],
    ) -> Result<(), SignatureError> {
        let computed = self.tx.compute_id();
        if computed != self.tx.id {
            return Err(SignatureError::IdMismatch {
                carried: self.tx.id.to_hex(),
                computed: computed.to_hex(),
            });
        }

        if let Some(bad) = self.sigs.iter().find(|s| !s.is_valid_for(&self.tx.id)) {
            return Err(SignatureError::InvalidSignature {
                key: bad.by.fingerprint(),
            });
        }

        let missing: Vec<String> = self
            .missing_signers()
            .into_iter()
            .filter(|k| !allowed_missing.contains(k))
            .map(|k| k.fingerprint())
            .collect();
        if !missing.is_empty() {
            return Err(SignatureError::MissingSignatures { keys: missing });
        }

        Ok(())
    }

    /// Every required signer, notary included, has signed.
    pub fn verify_required_signatures(&self) -> Result<(), SignatureError> {
        self.verify_signatures_except(&[])
    }
}
