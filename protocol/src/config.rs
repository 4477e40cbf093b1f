//! # Protocol Configuration & Constants
//!
//! Every magic number in reLedger lives here. If you're hardcoding a constant
//! somewhere else, move it.
//!
//! Durations here are defaults only. Nodes override them through their
//! runtime configuration; the protocol crate never reads the environment.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version, reported by `/health` and `version`.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Wire format version stamped into every transaction body. Part of the
/// hashed content, so two nodes on different versions never agree on an id.
pub const TRANSACTION_VERSION: u16 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 everywhere: party keys, transaction signatures, notary signatures.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ed25519 secret key length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Public key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Transaction ids are double SHA-256 over the canonical body.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Length of the random salt mixed into each transaction id.
pub const PRIVACY_SALT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Flow Timing
// ---------------------------------------------------------------------------

/// Upper bound on a single local signing operation.
pub const DEFAULT_SIGNING_TIMEOUT: Duration = Duration::from_secs(10);

/// How long we wait for every counterparty to answer a proposal. Covers the
/// whole gathering stage, not each counterparty separately.
pub const DEFAULT_COUNTERPARTY_TIMEOUT: Duration = Duration::from_secs(30);

/// Notary round trip. Distribution to participants afterwards is not bounded
/// by this; the transaction is already final by then.
pub const DEFAULT_FINALITY_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Per-direction buffer of an in-memory session. A flow exchanges at most a
/// handful of frames per session, so this never back-pressures in practice.
pub const SESSION_CHANNEL_CAPACITY: usize = 16;

/// Sessions waiting for a node's dispatcher to pick them up.
pub const INBOUND_SESSION_QUEUE: usize = 64;

/// Hard cap on a single encoded frame. A signed attestation transaction is a
/// few KiB; anything near this limit is hostile.
pub const MAX_FRAME_BYTES: u64 = 1024 * 1024;

/// Progress events buffered per flow before slow subscribers start lagging.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default RPC API port.
pub const DEFAULT_RPC_PORT: u16 = 10050;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 10051;
