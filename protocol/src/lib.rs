//! # reLedger Protocol — Core Library
//!
//! The ledger runtime surface that attestation contracts and workflows are
//! written against: keys and signatures, party identity, the transaction
//! model, and the collaborators a flow suspends on (signing, peer sessions,
//! notarisation).
//!
//! Each collaborator is a trait with a small in-process implementation, so a
//! complete network of parties can run inside one tokio runtime.
//!
//! ## Architecture
//!
//! - **crypto** — Ed25519 keys and signatures, SHA-256 / BLAKE3 hashing.
//! - **identity** — `Party` references and the network map.
//! - **transaction** — Wire, signed and resolved transactions; the `Contract` trait.
//! - **network** — Flow sessions and the in-memory transport.
//! - **notary** — Input uniqueness and the final signature.
//! - **vault** — Per-party store of finalised transactions.
//! - **config** — Protocol constants and defaults.

pub mod config;
pub mod crypto;
pub mod identity;
pub mod network;
pub mod notary;
pub mod transaction;
pub mod vault;

#[cfg(test)]
pub(crate) mod testing;
