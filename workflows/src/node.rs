//! # Flow Node
//!
//! One party's flow runtime. A node starts issuance flows on request and
//! answers every session other parties open towards it with an
//! [`AttestationResponder`], each on its own tokio task.
//!
//! Responder results are published as [`ResponderEvent`]s, since nobody is
//! waiting on a responder's return value.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use reledger_protocol::identity::Party;
use reledger_protocol::network::{FlowSession, InboundSessions};
use reledger_protocol::transaction::SecureHash;

use crate::context::{AttestationVault, FlowContext};
use crate::error::FlowError;
use crate::issue::{self, IssueAttestation};
use crate::responder::{AcceptAll, AttestationResponder, ProposalCheck};
use crate::SignedAttestation;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How a responder session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderOutcome {
    /// We signed and recorded the finalised transaction.
    Recorded { tx_id: SecureHash },
    /// The session ended without a recorded transaction.
    Failed { kind: &'static str, error: String },
}

#[derive(Debug, Clone)]
pub struct ResponderEvent {
    pub session_id: Uuid,
    pub initiator: Party,
    pub outcome: ResponderOutcome,
}

pub struct FlowNode {
    ctx: FlowContext,
    check: Arc<dyn ProposalCheck>,
    events: broadcast::Sender<ResponderEvent>,
}

impl FlowNode {
    pub fn new(ctx: FlowContext) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ctx,
            check: Arc::new(AcceptAll),
            events,
        }
    }

    /// Apply `check` to every proposal this node is asked to sign.
    pub fn with_check(mut self, check: Arc<dyn ProposalCheck>) -> Self {
        self.check = check;
        self
    }

    pub fn identity(&self) -> &Party {
        &self.ctx.our_identity
    }

    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    pub fn vault(&self) -> &AttestationVault {
        &self.ctx.vault
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResponderEvent> {
        self.events.subscribe()
    }

    /// Run an issuance flow with this node as broker.
    pub async fn issue_attestation(
        &self,
        request: IssueAttestation,
    ) -> Result<SignedAttestation, FlowError> {
        issue::issue_attestation(&self.ctx, request).await
    }

    /// Serve inbound sessions until the queue closes.
    pub fn spawn(self: Arc<Self>, mut inbound: InboundSessions) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(session) = inbound.recv().await {
                let node = Arc::clone(&self);
                tokio::spawn(async move { node.respond(session).await });
            }
            tracing::debug!(party = %self.ctx.our_identity, "inbound session queue closed");
        })
    }

    async fn respond(&self, mut session: Box<dyn FlowSession>) {
        let session_id = session.id();
        let initiator = session.counterparty().clone();
        let span = tracing::info_span!(
            "responder",
            party = %self.ctx.our_identity,
            %initiator,
            session = %session_id,
        );

        let responder =
            AttestationResponder::new(self.ctx.clone()).with_check(Arc::clone(&self.check));
        let outcome = match responder.call(session.as_mut()).instrument(span).await {
            Ok(stx) => ResponderOutcome::Recorded { tx_id: stx.id() },
            Err(err) => {
                tracing::warn!(party = %self.ctx.our_identity, %initiator, %err, "responder failed");
                ResponderOutcome::Failed {
                    kind: err.kind(),
                    error: err.to_string(),
                }
            }
        };

        let _ = self.events.send(ResponderEvent {
            session_id,
            initiator,
            outcome,
        });
    }
}
