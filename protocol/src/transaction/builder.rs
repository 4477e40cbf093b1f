//! Transaction construction via the builder pattern.
//!
//! [`TransactionBuilder`] collects inputs, outputs and commands and produces an
//! unsigned [`WireTransaction`] whose id is derived from its contents. Signing
//! is a separate step (see [`super::signed`]), so construction is testable
//! without key material.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::types::{Command, CommandData, ContractState, SecureHash, StateRef};
use crate::config;
use crate::crypto::{double_sha256, LedgerPublicKey};
use crate::identity::Party;

// ---------------------------------------------------------------------------
// WireTransaction
// ---------------------------------------------------------------------------

/// An unsigned transaction as it travels between parties.
///
/// `id` is `double_sha256(canonical_bytes)`. Every field except `id` itself
/// contributes to it, so the id is fixed before anyone signs and any
/// tampering in transit shows up as an id mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTransaction<S, C> {
    /// Transaction id. Recomputable with [`WireTransaction::compute_id`].
    pub id: SecureHash,
    /// Protocol version the transaction was built under.
    pub version: u16,
    /// States consumed by this transaction.
    pub inputs: Vec<StateRef>,
    /// States produced by this transaction.
    pub outputs: Vec<S>,
    /// Declared intents, each with its required signers.
    pub commands: Vec<Command<C>>,
    /// The notary that will order and finalise the transaction.
    pub notary: Party,
    /// Random salt so that two otherwise identical proposals get distinct ids.
    pub privacy_salt: [u8; 32],
    /// Unix timestamp in milliseconds.
    pub created_at: u64,
}

impl<S: ContractState, C: CommandData> WireTransaction<S, C> {
    /// Deterministic byte encoding used for the id.
    ///
    /// Integers are little-endian; variable-length items are length-prefixed
    /// with a `u32`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(512);

        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.privacy_salt);
        buf.extend_from_slice(&self.created_at.to_le_bytes());
        buf.extend_from_slice(self.notary.owning_key().as_bytes());

        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(input.tx_id.as_bytes());
            buf.extend_from_slice(&input.index.to_le_bytes());
        }

        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            push_prefixed(&mut buf, &output.canonical_bytes());
        }

        buf.extend_from_slice(&(self.commands.len() as u32).to_le_bytes());
        for command in &self.commands {
            push_prefixed(&mut buf, &command.value.canonical_bytes());
            buf.extend_from_slice(&(command.signers.len() as u32).to_le_bytes());
            for signer in &command.signers {
                buf.extend_from_slice(signer.as_bytes());
            }
        }

        buf
    }

    /// Recompute the id from the current field values.
    pub fn compute_id(&self) -> SecureHash {
        SecureHash::from_bytes(double_sha256(&self.canonical_bytes()))
    }

    /// Whether the stored id matches the contents.
    pub fn id_matches(&self) -> bool {
        self.id == self.compute_id()
    }

    /// Union of every participant across all outputs, in first-seen order.
    pub fn participants(&self) -> Vec<Party> {
        let mut parties: Vec<Party> = Vec::new();
        for output in &self.outputs {
            for party in output.participants() {
                if !parties.contains(&party) {
                    parties.push(party);
                }
            }
        }
        parties
    }
}

fn push_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`WireTransaction`].
///
/// ```rust,ignore
/// let wtx = TransactionBuilder::new(notary)
///     .add_output_state(record)
///     .add_command(AttestationCommand::Issue, signers)
///     .build();
/// ```
pub struct TransactionBuilder<S, C> {
    version: u16,
    notary: Party,
    inputs: Vec<StateRef>,
    outputs: Vec<S>,
    commands: Vec<Command<C>>,
    privacy_salt: Option<[u8; 32]>,
    created_at: Option<u64>,
}

impl<S: ContractState, C: CommandData> TransactionBuilder<S, C> {
    pub fn new(notary: Party) -> Self {
        Self {
            version: config::TRANSACTION_VERSION,
            notary,
            inputs: Vec::new(),
            outputs: Vec::new(),
            commands: Vec::new(),
            privacy_salt: None,
            created_at: None,
        }
    }

    pub fn add_input_state(mut self, state_ref: StateRef) -> Self {
        self.inputs.push(state_ref);
        self
    }

    pub fn add_output_state(mut self, state: S) -> Self {
        self.outputs.push(state);
        self
    }

    pub fn add_command(mut self, value: C, signers: Vec<LedgerPublicKey>) -> Self {
        self.commands.push(Command::new(value, signers));
        self
    }

    /// Fix the privacy salt. Only useful for reproducible ids in tests.
    pub fn privacy_salt(mut self, salt: [u8; 32]) -> Self {
        self.privacy_salt = Some(salt);
        self
    }

    /// Fix the creation timestamp (Unix milliseconds).
    pub fn created_at(mut self, timestamp_ms: u64) -> Self {
        self.created_at = Some(timestamp_ms);
        self
    }

    /// Consume the builder and produce an unsigned transaction with its id set.
    pub fn build(self) -> WireTransaction<S, C> {
        let mut wtx = WireTransaction {
            id: SecureHash::from_bytes([0u8; 32]),
            version: self.version,
            inputs: self.inputs,
            outputs: self.outputs,
            commands: self.commands,
            notary: self.notary,
            privacy_salt: self.privacy_salt.unwrap_or_else(rand::random),
            created_at: self
                .created_at
                .unwrap_or_else(|| Utc::now().timestamp_millis() as u64),
        };
        wtx.id = wtx.compute_id();
        wtx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::LedgerKeypair;
    use crate::testing::{DummyCommand, DummyState};

    fn notary() -> Party {
        Party::new("Notary", LedgerKeypair::from_seed(&[1u8; 32]).public_key())
    }

    fn sample() -> WireTransaction<DummyState, DummyCommand> {
        TransactionBuilder::new(notary())
            .add_output_state(DummyState::new("a"))
            .add_command(DummyCommand, vec![])
            .privacy_salt([3u8; 32])
            .created_at(1_000)
            .build()
    }

    #[test]
    fn id_is_deterministic_for_fixed_salt_and_time() {
        assert_eq!(sample().id, sample().id);
        assert!(sample().id_matches());
    }

    #[test]
    fn random_salt_gives_distinct_ids() {
        let a: WireTransaction<DummyState, DummyCommand> = TransactionBuilder::new(notary())
            .add_output_state(DummyState::new("a"))
            .build();
        let b: WireTransaction<DummyState, DummyCommand> = TransactionBuilder::new(notary())
            .add_output_state(DummyState::new("a"))
            .build();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn tampering_breaks_id() {
        let mut wtx = sample();
        wtx.outputs[0] = DummyState::new("b");
        assert!(!wtx.id_matches());
    }

    #[test]
    fn adding_an_input_changes_id() {
        let base = sample();
        let with_input = TransactionBuilder::new(notary())
            .add_input_state(StateRef::new(base.id, 0))
            .add_output_state(DummyState::new("a"))
            .add_command(DummyCommand, vec![])
            .privacy_salt([3u8; 32])
            .created_at(1_000)
            .build();
        assert_ne!(base.id, with_input.id);
        assert_eq!(with_input.inputs.len(), 1);
    }
}
