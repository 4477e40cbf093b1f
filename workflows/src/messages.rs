//! Messages exchanged on an issuance session.
//!
//! ```text
//! initiator                         counterparty
//!     │ ── Proposal(stx) ──────────────▶ │  pre-check, verify, sign
//!     │ ◀──────────── Signature(sig) ── │  (or Rejected { reason })
//!     │        ... notarise ...          │
//!     │ ── Finalised(stx) ─────────────▶ │  verify, record
//! ```
//!
//! `Cancelled` may replace `Finalised` when the flow aborts after the
//! proposal was sent.

use serde::{Deserialize, Serialize};

use reledger_protocol::network::{codec, FlowSession};
use reledger_protocol::transaction::TransactionSignature;

use crate::error::FlowError;
use crate::SignedAttestation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlowMessage {
    Proposal(SignedAttestation),
    Signature(TransactionSignature),
    Rejected { reason: String },
    Finalised(SignedAttestation),
    Cancelled { reason: String },
}

impl FlowMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            FlowMessage::Proposal(_) => "proposal",
            FlowMessage::Signature(_) => "signature",
            FlowMessage::Rejected { .. } => "rejected",
            FlowMessage::Finalised(_) => "finalised",
            FlowMessage::Cancelled { .. } => "cancelled",
        }
    }
}

pub(crate) async fn send(
    session: &mut dyn FlowSession,
    message: &FlowMessage,
) -> Result<(), FlowError> {
    let frame = codec::encode(message)?;
    tracing::trace!(session = %session.id(), to = %session.counterparty(), kind = message.kind(), bytes = frame.len(), "send");
    session.send(frame).await?;
    Ok(())
}

pub(crate) async fn receive(session: &mut dyn FlowSession) -> Result<FlowMessage, FlowError> {
    let frame = session.receive().await?;
    let message: FlowMessage = codec::decode(&frame)?;
    tracing::trace!(session = %session.id(), from = %session.counterparty(), kind = message.kind(), "receive");
    Ok(message)
}
