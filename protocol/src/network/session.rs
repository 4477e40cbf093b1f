//! Peer session abstractions.
//!
//! A [`FlowSession`] is a bidirectional, ordered byte channel between two
//! parties for the lifetime of one flow. The initiating side obtains one from
//! [`MessagingService::initiate_flow`]; the counterparty receives the other
//! end through its node's inbound queue. Dropping a session closes it, and
//! the peer's next `receive` fails with [`SessionError::Closed`].

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::identity::Party;

/// Errors raised by the session transport.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No node is registered for the party.
    #[error("no route to party {0}")]
    UnknownParty(String),

    /// The peer closed the session, or its node went away.
    #[error("session with {0} closed")]
    Closed(String),

    /// A frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

/// One end of a flow session.
#[async_trait]
pub trait FlowSession: Send {
    /// Identifier shared by both ends.
    fn id(&self) -> Uuid;

    /// The party on the other end.
    fn counterparty(&self) -> &Party;

    async fn send(&mut self, payload: Bytes) -> Result<(), SessionError>;

    async fn receive(&mut self) -> Result<Bytes, SessionError>;
}

/// Opens sessions to other parties.
#[async_trait]
pub trait MessagingService: Send + Sync {
    async fn initiate_flow(&self, counterparty: &Party)
        -> Result<Box<dyn FlowSession>, SessionError>;
}
