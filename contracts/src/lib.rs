//! # reLedger Contracts
//!
//! The asset and the rules of the reLedger attestation network:
//!
//! - **Record** — [`AttestationRecord`], an attested real-estate sale, and
//!   its all-fields-required builder.
//! - **Attestation** — [`AttestationContract`], the validation rules every
//!   participant runs before signing, dispatched on [`AttestationCommand`].
//!
//! ## Design Principles
//!
//! 1. Construction checks presence, the contract checks meaning. A record
//!    that violates a rule can still be built, so the rule can be tested.
//! 2. Verification is pure and deterministic: no clock, no I/O, no randomness.
//! 3. Every rule has its own error variant and message.

pub mod attestation;
pub mod record;

pub use attestation::{
    AttestationCommand, AttestationContract, AttestationTransaction, ValidationError,
};
pub use record::{AttestationRecord, AttestationRecordBuilder, PropertyAddress, SchemaError};
