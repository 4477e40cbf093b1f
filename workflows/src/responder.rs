//! # Attestation Responder
//!
//! The counterparty side of issuance. Each attester and the ledger authority
//! run one responder per inbound session:
//!
//! 1. Receive the proposal.
//! 2. Check it: no inputs, then any node-specific [`ProposalCheck`], then the
//!    full contract, then the signatures already attached.
//! 3. Sign and reply, or reply with the reason for rejecting.
//! 4. Wait for the notarised transaction, check it is the one we signed and
//!    fully signed, and record it.

use std::sync::Arc;

use reledger_contracts::AttestationContract;
use reledger_protocol::identity::Party;
use reledger_protocol::network::{FlowSession, SessionError};
use reledger_protocol::transaction::{Contract, ContractState, SecureHash};

use crate::context::FlowContext;
use crate::error::FlowError;
use crate::issue::with_timeout;
use crate::messages::{self, FlowMessage};
use crate::progress::FlowStage;
use crate::SignedAttestation;

/// Extra, node-specific acceptance rule applied to proposals before the
/// contract runs. Return `Err(reason)` to refuse to sign.
pub trait ProposalCheck: Send + Sync {
    fn check(&self, proposal: &SignedAttestation) -> Result<(), String>;
}

impl<F> ProposalCheck for F
where
    F: Fn(&SignedAttestation) -> Result<(), String> + Send + Sync,
{
    fn check(&self, proposal: &SignedAttestation) -> Result<(), String> {
        self(proposal)
    }
}

/// Accepts everything the contract accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ProposalCheck for AcceptAll {
    fn check(&self, _proposal: &SignedAttestation) -> Result<(), String> {
        Ok(())
    }
}

pub struct AttestationResponder {
    ctx: FlowContext,
    check: Arc<dyn ProposalCheck>,
}

impl AttestationResponder {
    pub fn new(ctx: FlowContext) -> Self {
        Self {
            ctx,
            check: Arc::new(AcceptAll),
        }
    }

    pub fn with_check(mut self, check: Arc<dyn ProposalCheck>) -> Self {
        self.check = check;
        self
    }

    /// Handle one inbound session to completion.
    pub async fn call(
        &self,
        session: &mut dyn FlowSession,
    ) -> Result<SignedAttestation, FlowError> {
        let initiator = session.counterparty().clone();
        let cfg = self.ctx.config;

        let proposal = with_timeout(
            FlowStage::GatheringSignatures,
            cfg.counterparty_timeout,
            expect_proposal(session),
        )
        .await?;
        let tx_id = proposal.id();
        tracing::debug!(%tx_id, from = %initiator, "proposal received");

        if let Err(err) = self.evaluate(&proposal, &initiator) {
            tracing::warn!(%tx_id, from = %initiator, %err, "refusing to sign");
            let reply = FlowMessage::Rejected {
                reason: err.to_string(),
            };
            messages::send(session, &reply).await?;
            return Err(err);
        }

        let sig = with_timeout(FlowStage::Signing, cfg.signing_timeout, async {
            self.ctx.signer.sign(&tx_id).await.map_err(FlowError::from)
        })
        .await?;
        messages::send(session, &FlowMessage::Signature(sig)).await?;
        tracing::debug!(%tx_id, to = %initiator, "proposal signed");

        let finalised = with_timeout(
            FlowStage::Finalising,
            cfg.responder_finality_wait(),
            expect_finalised(session),
        )
        .await?;

        self.accept_finalised(tx_id, finalised)
    }

    fn evaluate(
        &self,
        proposal: &SignedAttestation,
        initiator: &Party,
    ) -> Result<(), FlowError> {
        let ours = *self.ctx.our_identity.owning_key();
        let refuse = |reason: String| FlowError::CounterpartyRejection {
            party: self.ctx.our_identity.name().to_string(),
            reason,
        };

        AttestationContract.check_proposal(&proposal.tx)?;
        self.check.check(proposal).map_err(refuse)?;

        let ltx = proposal.tx.to_ledger_transaction(&self.ctx.vault)?;
        AttestationContract.verify(&ltx)?;

        if !proposal.required_signing_keys().contains(&ours) {
            return Err(refuse("we are not a required signer".into()));
        }
        for output in &proposal.tx.outputs {
            if output.broker != *initiator {
                return Err(refuse(format!(
                    "proposal from {initiator} names {} as broker",
                    output.broker
                )));
            }
            if let Some(unknown) = output
                .participants()
                .into_iter()
                .find(|p| self.ctx.identities.party_from_key(p.owning_key()).is_none())
            {
                return Err(refuse(format!("unknown participant {unknown}")));
            }
        }

        // Only the initiator has signed so far. Everyone else, including the
        // notary, may still be missing.
        let initiator_key = *initiator.owning_key();
        let still_missing: Vec<_> = proposal
            .required_signing_keys()
            .into_iter()
            .filter(|k| *k != initiator_key)
            .collect();
        proposal.verify_signatures_except(&still_missing)?;

        Ok(())
    }

    fn accept_finalised(
        &self,
        expected: SecureHash,
        stx: SignedAttestation,
    ) -> Result<SignedAttestation, FlowError> {
        if stx.id() != expected {
            return Err(FlowError::UnexpectedMessage {
                expected: "finalised transaction matching the signed proposal",
                received: "finalised transaction with a different id",
            });
        }
        stx.verify_required_signatures()?;
        self.ctx.vault.record(stx.clone());
        tracing::info!(tx_id = %expected, party = %self.ctx.our_identity, "attestation recorded");
        Ok(stx)
    }
}

async fn expect_proposal(session: &mut dyn FlowSession) -> Result<SignedAttestation, FlowError> {
    match receive(session).await? {
        FlowMessage::Proposal(stx) => Ok(stx),
        FlowMessage::Cancelled { reason } => Err(FlowError::Cancelled { reason }),
        other => Err(FlowError::UnexpectedMessage {
            expected: "proposal",
            received: other.kind(),
        }),
    }
}

async fn expect_finalised(session: &mut dyn FlowSession) -> Result<SignedAttestation, FlowError> {
    match receive(session).await? {
        FlowMessage::Finalised(stx) => Ok(stx),
        FlowMessage::Cancelled { reason } => Err(FlowError::Cancelled { reason }),
        other => Err(FlowError::UnexpectedMessage {
            expected: "finalised",
            received: other.kind(),
        }),
    }
}

/// Session closure while waiting means the initiator gave up.
async fn receive(session: &mut dyn FlowSession) -> Result<FlowMessage, FlowError> {
    match messages::receive(session).await {
        Err(FlowError::Session(SessionError::Closed(party))) => Err(FlowError::Cancelled {
            reason: format!("{party} closed the session"),
        }),
        other => other,
    }
}
