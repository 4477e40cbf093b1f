//! # Attestation Contract
//!
//! Validation rules every participant runs before signing an attestation
//! transaction. The rules are pure functions of the resolved transaction, so
//! the broker, both attesters and the ledger authority all reach the same
//! verdict independently.
//!
//! The transaction must declare exactly one [`AttestationCommand`]. For
//! [`AttestationCommand::Issue`] the rules run in this order and stop at the
//! first violation:
//!
//! 1. No inputs are consumed.
//! 2. Exactly one output is created.
//! 3. The broker is neither the sell nor the buy attester.
//! 4. The address is not entirely empty.
//! 5. The price is positive.
//! 6. The selling date is present.
//! 7. The broker or one of the attesters signs.
//! 8. The ledger authority signs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use reledger_protocol::transaction::{
    Command, CommandData, Contract, LedgerTransaction, WireTransaction,
};

use crate::record::AttestationRecord;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A violated validation rule. Each rule has its own variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Exactly one attestation command is required, found {found}.")]
    CommandCount { found: usize },

    #[error("No inputs should be consumed when issuing an attestation.")]
    InputsConsumed { count: usize },

    #[error("Only one output state should be created.")]
    OutputCount { count: usize },

    #[error("The broker and the buy/sell attester cannot be the same entity.")]
    BrokerNotDistinct,

    #[error("Property address must not be empty.")]
    EmptyAddress,

    #[error("Property closing price must be positive.")]
    NonPositivePrice { price: i64 },

    #[error("Property closing date must not be empty.")]
    MissingSellingDate,

    #[error("The broker or the sell/buy side attester must sign.")]
    MissingAttesterSignature,

    #[error("The ledger authority must sign.")]
    MissingAuthoritySignature,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Declared intent of an attestation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttestationCommand {
    /// Create a new attestation record from nothing.
    Issue,
}

impl CommandData for AttestationCommand {
    fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            AttestationCommand::Issue => b"attestation/issue".to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

pub type AttestationTransaction = LedgerTransaction<AttestationRecord, AttestationCommand>;

#[derive(Debug, Clone, Copy, Default)]
pub struct AttestationContract;

impl AttestationContract {
    /// Cheap structural check a counterparty runs on a proposal before full
    /// validation: an issuance never consumes anything.
    pub fn check_proposal(
        &self,
        wtx: &WireTransaction<AttestationRecord, AttestationCommand>,
    ) -> Result<(), ValidationError> {
        if !wtx.inputs.is_empty() {
            return Err(ValidationError::InputsConsumed {
                count: wtx.inputs.len(),
            });
        }
        Ok(())
    }

    fn verify_issue(
        &self,
        tx: &AttestationTransaction,
        command: &Command<AttestationCommand>,
    ) -> Result<(), ValidationError> {
        if !tx.inputs.is_empty() {
            return Err(ValidationError::InputsConsumed {
                count: tx.inputs.len(),
            });
        }
        let out = match tx.outputs.as_slice() {
            [single] => single,
            other => {
                return Err(ValidationError::OutputCount { count: other.len() });
            }
        };

        if out.broker == out.sell_attester || out.broker == out.buy_attester {
            return Err(ValidationError::BrokerNotDistinct);
        }
        if !out.check_address_fields() {
            return Err(ValidationError::EmptyAddress);
        }
        if out.price <= 0 {
            return Err(ValidationError::NonPositivePrice { price: out.price });
        }
        if out.selling_date.is_empty() {
            return Err(ValidationError::MissingSellingDate);
        }

        let attester_signs = [&out.broker, &out.sell_attester, &out.buy_attester]
            .iter()
            .any(|p| command.requires(p.owning_key()));
        if !attester_signs {
            return Err(ValidationError::MissingAttesterSignature);
        }
        if !command.requires(out.ledger_authority.owning_key()) {
            return Err(ValidationError::MissingAuthoritySignature);
        }

        Ok(())
    }
}

impl Contract for AttestationContract {
    type State = AttestationRecord;
    type Command = AttestationCommand;
    type Error = ValidationError;

    const ID: &'static str = "reledger.contracts.AttestationContract";

    fn verify(&self, tx: &AttestationTransaction) -> Result<(), ValidationError> {
        let command = match tx.commands.as_slice() {
            [single] => single,
            other => return Err(ValidationError::CommandCount { found: other.len() }),
        };

        match command.value {
            AttestationCommand::Issue => self.verify_issue(tx, command),
        }
    }
}
