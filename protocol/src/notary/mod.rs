//! # Notary Module
//!
//! The notary is the last signer on every transaction. It guarantees that no
//! input state is consumed twice: a transaction whose inputs were already
//! spent by a *different* transaction is refused with
//! [`NotaryError::Conflict`]. Resubmitting the same transaction is harmless
//! and returns a fresh signature.
//!
//! Flows only ever see the [`NotaryService`] trait. [`SimpleNotary`] is the
//! single-node, in-memory implementation used by local networks and tests.

mod simple;

pub use simple::SimpleNotary;

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::Party;
use crate::transaction::{
    CommandData, ContractState, SignatureError, SignedTransaction, TransactionSignature,
};

/// Reasons a notary refuses to sign.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotaryError {
    /// The transaction names a different notary.
    #[error("transaction names notary {named}, but this is {actual}")]
    WrongNotary { named: String, actual: String },

    /// The id or a signature is wrong, or a non-notary signature is missing.
    #[error("signature check failed: {0}")]
    InvalidSignatures(#[from] SignatureError),

    /// An input was already consumed by another transaction.
    #[error("input {state_ref} already consumed by transaction {consumed_by}")]
    Conflict {
        state_ref: String,
        consumed_by: String,
    },

    /// The notary is not accepting requests.
    #[error("notary unavailable: {0}")]
    Unavailable(String),
}

/// Orders and finalises transactions.
#[async_trait]
pub trait NotaryService<S, C>: Send + Sync
where
    S: ContractState,
    C: CommandData,
{
    /// The notary's identity, as placed in transactions.
    fn identity(&self) -> &Party;

    /// Check uniqueness of inputs and countersign. Every required signature
    /// other than the notary's own must already be attached.
    async fn notarise(
        &self,
        stx: &SignedTransaction<S, C>,
    ) -> Result<TransactionSignature, NotaryError>;
}
