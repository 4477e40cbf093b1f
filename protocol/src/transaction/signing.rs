//! Transaction signatures and the signing service.
//!
//! Parties sign the transaction *id*, not the full body: the id already
//! commits to every field (see [`super::builder::WireTransaction::canonical_bytes`]).
//!
//! Signing goes through the [`SigningService`] trait so the flow layer can
//! treat it as a suspension point (a remote KMS or HSM in a real deployment).
//! [`LocalSigner`] keeps the keypair in process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::SecureHash;
use crate::crypto::{LedgerKeypair, LedgerPublicKey, LedgerSignature};

/// A signature over a transaction id together with the key that made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub by: LedgerPublicKey,
    pub signature: LedgerSignature,
}

impl TransactionSignature {
    /// Whether this signature verifies over `tx_id` under `self.by`.
    pub fn is_valid_for(&self, tx_id: &SecureHash) -> bool {
        self.by.verify(tx_id.as_bytes(), &self.signature)
    }
}

/// Errors raised by a signing service.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The service does not hold the key it was asked to sign with.
    #[error("no signing key available for {0}")]
    UnknownKey(String),

    /// The backing key store could not be reached.
    #[error("signing service unavailable: {0}")]
    Unavailable(String),
}

/// Produces signatures over transaction ids on behalf of one identity.
#[async_trait]
pub trait SigningService: Send + Sync {
    /// The key this service signs with.
    fn public_key(&self) -> LedgerPublicKey;

    /// Sign `tx_id`.
    async fn sign(&self, tx_id: &SecureHash) -> Result<TransactionSignature, SigningError>;
}

/// In-process signer backed by a [`LedgerKeypair`].
#[derive(Debug, Clone)]
pub struct LocalSigner {
    keypair: LedgerKeypair,
}

impl LocalSigner {
    pub fn new(keypair: LedgerKeypair) -> Self {
        Self { keypair }
    }

    /// Synchronous signing, for callers that already hold the keypair.
    pub fn sign_now(&self, tx_id: &SecureHash) -> TransactionSignature {
        TransactionSignature {
            by: self.keypair.public_key(),
            signature: self.keypair.sign(tx_id.as_bytes()),
        }
    }
}

#[async_trait]
impl SigningService for LocalSigner {
    fn public_key(&self) -> LedgerPublicKey {
        self.keypair.public_key()
    }

    async fn sign(&self, tx_id: &SecureHash) -> Result<TransactionSignature, SigningError> {
        Ok(self.sign_now(tx_id))
    }
}
