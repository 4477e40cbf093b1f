//! # Key Management
//!
//! Ed25519 keypairs for reLedger parties and notaries.
//!
//! Every party on the network owns exactly one signing keypair. The public
//! half is the party's *owning key*: it is what command signer sets list,
//! what transaction signatures are checked against, and what party equality
//! is decided on.
//!
//! Key bytes are never logged. `Debug` output of a keypair prints the public
//! key only.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::hash::blake3_hash;

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: expected 32 bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// A party's signing keypair.
///
/// Intentionally not `Serialize`: exporting secret material goes through
/// [`LedgerKeypair::secret_key_bytes`] and nothing else.
///
/// # Examples
///
/// ```
/// use reledger_protocol::crypto::LedgerKeypair;
///
/// let kp = LedgerKeypair::generate();
/// let sig = kp.sign(b"attest 42 Main St");
/// assert!(kp.public_key().verify(b"attest 42 Main St", &sig));
/// ```
pub struct LedgerKeypair {
    signing_key: SigningKey,
}

/// The public half of a party identity.
///
/// Ordered and hashable so it can key maps and sets of signers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerPublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature. Always 64 bytes when produced by [`LedgerKeypair::sign`];
/// anything else simply fails verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSignature {
    bytes: Vec<u8>,
}

impl LedgerKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Used by tests and by the
    /// node when a key is supplied on the command line.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded 32-byte secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The public key that identifies this keypair on the ledger.
    pub fn public_key(&self) -> LedgerPublicKey {
        LedgerPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign an arbitrary message. Ed25519 signing is deterministic.
    pub fn sign(&self, message: &[u8]) -> LedgerSignature {
        LedgerSignature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    /// Raw secret key material. Handle with care.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for LedgerKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for LedgerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// LedgerPublicKey
// ---------------------------------------------------------------------------

impl LedgerPublicKey {
    /// Wrap raw key bytes without curve validation.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Build from a slice, validating the length and that the bytes decode
    /// to an Ed25519 point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded public key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify `signature` over `message`. Malformed keys or signatures
    /// verify as `false`.
    pub fn verify(&self, message: &[u8], signature: &LedgerSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Some(dalek_sig) = signature.to_dalek_signature() else {
            return false;
        };
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Short BLAKE3 fingerprint of the key, for log lines and display.
    pub fn fingerprint(&self) -> String {
        hex::encode(&blake3_hash(&self.bytes)[..8])
    }
}

impl fmt::Display for LedgerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for LedgerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// LedgerSignature
// ---------------------------------------------------------------------------

impl LedgerSignature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; 64] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for LedgerSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "LedgerSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "LedgerSignature({})", hex_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let kp = LedgerKeypair::generate();
        let sig = kp.sign(b"parcel 1-00042-0007");
        assert!(kp.public_key().verify(b"parcel 1-00042-0007", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp1 = LedgerKeypair::generate();
        let kp2 = LedgerKeypair::generate();
        let sig = kp1.sign(b"message");
        assert!(!kp2.public_key().verify(b"message", &sig));
    }

    #[test]
    fn truncated_signature_is_rejected_not_panicking() {
        let kp = LedgerKeypair::generate();
        let sig = LedgerSignature { bytes: vec![0u8; 10] };
        assert!(!kp.public_key().verify(b"message", &sig));
    }

    #[test]
    fn seed_is_deterministic() {
        let a = LedgerKeypair::from_seed(&[7u8; 32]);
        let b = LedgerKeypair::from_seed(&[7u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"x"), b.sign(b"x"));
    }

    #[test]
    fn hex_roundtrip_for_secret_and_public() {
        let kp = LedgerKeypair::generate();
        let restored = LedgerKeypair::from_hex(&hex::encode(kp.secret_key_bytes())).unwrap();
        assert_eq!(restored.public_key(), kp.public_key());

        let pk = LedgerPublicKey::from_hex(&kp.public_key().to_hex()).unwrap();
        assert_eq!(pk, kp.public_key());
    }

    #[test]
    fn bad_hex_secret_rejected() {
        assert!(LedgerKeypair::from_hex("abcd").is_err());
        assert!(LedgerKeypair::from_hex("zz").is_err());
    }

    #[test]
    fn debug_never_prints_secret() {
        let kp = LedgerKeypair::from_seed(&[9u8; 32]);
        let dbg = format!("{:?}", kp);
        assert!(!dbg.contains(&hex::encode([9u8; 32])));
        assert!(dbg.contains(&kp.public_key().to_hex()));
    }
}
