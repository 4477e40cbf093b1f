//! # reLedger Workflows
//!
//! Flows that move an attestation from a broker's request to a notarised
//! transaction recorded by every participant.
//!
//! - [`issue`]: the broker-side issuance flow.
//! - [`responder`]: the attester and ledger authority side.
//! - [`node`]: one party's runtime, dispatching inbound sessions to responders.
//! - [`network`]: a complete in-process network of nodes and a notary.
//! - [`progress`]: flow stages and the tracker that publishes them.

pub mod context;
pub mod error;
pub mod issue;
pub mod messages;
pub mod network;
pub mod node;
pub mod progress;
pub mod responder;

use reledger_contracts::{AttestationCommand, AttestationRecord};
use reledger_protocol::transaction::SignedTransaction;

/// A signed transaction carrying attestation records.
pub type SignedAttestation = SignedTransaction<AttestationRecord, AttestationCommand>;

pub use context::{FlowConfig, FlowContext};
pub use error::FlowError;
pub use issue::{issue_attestation, IssueAttestation, IssueAttestationFlow};
pub use network::{LocalNetwork, LocalNetworkBuilder};
pub use node::{FlowNode, ResponderEvent, ResponderOutcome};
pub use progress::{FlowStage, ProgressEvent, ProgressTracker};
pub use responder::{AcceptAll, AttestationResponder, ProposalCheck};
