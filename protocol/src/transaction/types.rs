//! Core value types shared by every transaction: ids, state references,
//! commands, and the traits ledger states and command payloads implement.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::LedgerPublicKey;
use crate::identity::Party;

// ---------------------------------------------------------------------------
// SecureHash
// ---------------------------------------------------------------------------

/// A 32-byte transaction id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SecureHash([u8; 32]);

impl SecureHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex id.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureHash({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// StateRef
// ---------------------------------------------------------------------------

/// Points at output `index` of transaction `tx_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateRef {
    pub tx_id: SecureHash,
    pub index: u32,
}

impl StateRef {
    pub fn new(tx_id: SecureHash, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tx_id, self.index)
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Implemented by every state type that can appear as a transaction output.
pub trait ContractState:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Parties entitled to receive a copy of any transaction carrying this state.
    fn participants(&self) -> Vec<Party>;

    /// Deterministic byte encoding folded into the transaction id.
    fn canonical_bytes(&self) -> Vec<u8>;
}

/// Implemented by command payloads (the declared intent of a transaction).
pub trait CommandData:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Deterministic byte encoding folded into the transaction id.
    fn canonical_bytes(&self) -> Vec<u8>;
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A command payload together with the keys that must sign for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command<C> {
    pub value: C,
    pub signers: Vec<LedgerPublicKey>,
}

impl<C> Command<C> {
    pub fn new(value: C, signers: Vec<LedgerPublicKey>) -> Self {
        Self { value, signers }
    }

    /// Whether `key` is in this command's signer set.
    pub fn requires(&self, key: &LedgerPublicKey) -> bool {
        self.signers.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::LedgerKeypair;

    #[test]
    fn secure_hash_hex_roundtrip() {
        let h = SecureHash::from_bytes([0xab; 32]);
        assert_eq!(SecureHash::from_hex(&h.to_hex()).unwrap(), h);
        assert!(SecureHash::from_hex("abcd").is_err());
    }

    #[test]
    fn command_requires_listed_signers_only() {
        let a = LedgerKeypair::generate().public_key();
        let b = LedgerKeypair::generate().public_key();
        let cmd = Command::new((), vec![a]);
        assert!(cmd.requires(&a));
        assert!(!cmd.requires(&b));
    }
}
