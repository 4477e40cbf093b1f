//! Flow errors. Nothing is retried: every error aborts the flow and surfaces
//! to the caller, and nothing has been recorded in any vault when one is
//! returned.

use thiserror::Error;

use reledger_contracts::{SchemaError, ValidationError};
use reledger_protocol::network::SessionError;
use reledger_protocol::notary::NotaryError;
use reledger_protocol::transaction::{ResolutionError, SignatureError, SigningError};

use crate::progress::FlowStage;

#[derive(Debug, Error)]
pub enum FlowError {
    /// A record field was missing at construction.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The contract rejected the transaction.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A counterparty declined to sign.
    #[error("{party} rejected the proposal: {reason}")]
    CounterpartyRejection { party: String, reason: String },

    /// The notary refused or could not be reached.
    #[error("finality failed: {0}")]
    Finality(#[from] NotaryError),

    #[error("{stage} timed out after {timeout_ms} ms")]
    Timeout { stage: FlowStage, timeout_ms: u64 },

    #[error("session failure: {0}")]
    Session(SessionError),

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    /// A counterparty answered with a signature by the wrong key, or one that
    /// does not verify over the transaction id.
    #[error("{party} returned an invalid signature")]
    InvalidCounterpartySignature { party: String },

    #[error("signature check failed: {0}")]
    Signatures(#[from] SignatureError),

    #[error("expected {expected} message, received {received}")]
    UnexpectedMessage {
        expected: &'static str,
        received: &'static str,
    },

    /// The other side aborted the flow, or went away before it finished.
    #[error("flow cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("malformed message: {0}")]
    Codec(String),

    #[error("input resolution failed: {0}")]
    Resolution(#[from] ResolutionError),
}

impl From<SessionError> for FlowError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Codec(msg) => FlowError::Codec(msg),
            other => FlowError::Session(other),
        }
    }
}

impl FlowError {
    /// Short, stable name for metrics labels and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::Schema(_) => "schema",
            FlowError::Validation(_) => "validation",
            FlowError::CounterpartyRejection { .. } => "counterparty_rejection",
            FlowError::Finality(_) => "finality",
            FlowError::Timeout { .. } => "timeout",
            FlowError::Session(_) => "session",
            FlowError::Signing(_) => "signing",
            FlowError::InvalidCounterpartySignature { .. } => "invalid_counterparty_signature",
            FlowError::Signatures(_) => "signatures",
            FlowError::UnexpectedMessage { .. } => "unexpected_message",
            FlowError::Cancelled { .. } => "cancelled",
            FlowError::Codec(_) => "codec",
            FlowError::Resolution(_) => "resolution",
        }
    }
}
