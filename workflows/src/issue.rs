//! # Issue Attestation
//!
//! The initiating side of issuance, run by the broker. The flow builds a
//! zero-input transaction with a single [`AttestationRecord`] output, checks
//! it against the contract, signs it, collects a signature from every other
//! participant, has it notarised, and distributes the result.
//!
//! The flow only suspends while signing, while waiting for counterparties,
//! and while waiting for the notary. Each of those waits has its own time
//! limit from [`FlowConfig`](crate::context::FlowConfig).
//!
//! Any failure aborts the whole flow. Counterparties that were already sent
//! the proposal receive a `Cancelled` message, and nothing is recorded.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use reledger_contracts::{
    AttestationCommand, AttestationContract, AttestationRecord, PropertyAddress, SchemaError,
};
use reledger_protocol::identity::Party;
use reledger_protocol::network::FlowSession;
use reledger_protocol::transaction::{
    Contract, ContractState, SignedTransaction, TransactionBuilder, TransactionSignature,
};

use crate::context::FlowContext;
use crate::error::FlowError;
use crate::messages::{self, FlowMessage};
use crate::progress::{FlowStage, ProgressEvent, ProgressTracker};
use crate::SignedAttestation;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Caller-supplied fields of a new attestation. The broker is not part of
/// the request: it is always the party running the flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueAttestation {
    pub address: PropertyAddress,
    pub price: i64,
    pub selling_date: String,
    pub ledger_authority: Party,
    pub sell_attester: Party,
    pub buy_attester: Party,
}

impl IssueAttestation {
    pub fn to_record(&self, broker: Party) -> Result<AttestationRecord, SchemaError> {
        AttestationRecord::builder()
            .address(self.address.clone())
            .price(self.price)
            .selling_date(self.selling_date.clone())
            .ledger_authority(self.ledger_authority.clone())
            .sell_attester(self.sell_attester.clone())
            .buy_attester(self.buy_attester.clone())
            .broker(broker)
            .build()
    }

    /// Parties the broker collects signatures from, in contact order.
    /// The broker itself and duplicates are left out.
    pub fn counterparties(&self, broker: &Party) -> Vec<Party> {
        let mut out: Vec<Party> = Vec::with_capacity(3);
        for party in [&self.buy_attester, &self.sell_attester, &self.ledger_authority] {
            if party != broker && !out.contains(party) {
                out.push(party.clone());
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

pub struct IssueAttestationFlow {
    request: IssueAttestation,
    progress: ProgressTracker,
}

impl IssueAttestationFlow {
    pub fn new(request: IssueAttestation) -> Self {
        Self {
            request,
            progress: ProgressTracker::new(Uuid::new_v4()),
        }
    }

    pub fn flow_id(&self) -> Uuid {
        self.progress.flow_id()
    }

    pub fn stage(&self) -> FlowStage {
        self.progress.current()
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Stage transitions from now on. Subscribe before [`call`](Self::call).
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    /// Run the flow to completion. Returns the notarised transaction, which
    /// is also recorded in our vault.
    pub async fn call(&mut self, ctx: &FlowContext) -> Result<SignedAttestation, FlowError> {
        let span = tracing::info_span!(
            "issue_attestation",
            flow_id = %self.progress.flow_id(),
            party = %ctx.our_identity,
        );
        let result = self.run(ctx).instrument(span).await;

        match &result {
            Ok(stx) => {
                self.progress.advance(FlowStage::Done);
                tracing::info!(flow_id = %self.flow_id(), tx_id = %stx.id(), "attestation issued");
            }
            Err(err) => {
                self.progress.fail(err.to_string());
            }
        }
        result
    }

    async fn run(&mut self, ctx: &FlowContext) -> Result<SignedAttestation, FlowError> {
        // Generating
        self.progress.advance(FlowStage::Generating);
        let record = self.request.to_record(ctx.our_identity.clone())?;
        let signers = record
            .participants()
            .iter()
            .map(|p| *p.owning_key())
            .collect();
        let wtx = TransactionBuilder::new(ctx.notary.identity().clone())
            .add_output_state(record)
            .add_command(AttestationCommand::Issue, signers)
            .build();
        let tx_id = wtx.id;
        tracing::debug!(%tx_id, "candidate transaction built");

        // Verifying
        self.progress.advance(FlowStage::Verifying);
        let ltx = wtx.to_ledger_transaction(&ctx.vault)?;
        AttestationContract.verify(&ltx)?;

        // Signing
        self.progress.advance(FlowStage::Signing);
        let own = with_timeout(FlowStage::Signing, ctx.config.signing_timeout, async {
            ctx.signer.sign(&tx_id).await.map_err(FlowError::from)
        })
        .await?;
        let stx = SignedTransaction::new(wtx, vec![own]);

        // GatheringSignatures
        self.progress.advance(FlowStage::GatheringSignatures);
        let counterparties = self.request.counterparties(&ctx.our_identity);
        let mut sessions = open_sessions(ctx, &counterparties).await?;
        let gathered = with_timeout(
            FlowStage::GatheringSignatures,
            ctx.config.counterparty_timeout,
            gather_signatures(&mut sessions, &stx),
        )
        .await;
        let sigs = match gathered {
            Ok(sigs) => sigs,
            Err(err) => {
                cancel_sessions(&mut sessions, &err).await;
                return Err(err);
            }
        };
        let stx = stx.with_signatures(sigs);

        // Finalising
        self.progress.advance(FlowStage::Finalising);
        match finalise(ctx, stx, &mut sessions).await {
            Ok(stx) => Ok(stx),
            Err(err) => {
                cancel_sessions(&mut sessions, &err).await;
                Err(err)
            }
        }
    }
}

/// Issue an attestation with `ctx.our_identity` as broker.
pub async fn issue_attestation(
    ctx: &FlowContext,
    request: IssueAttestation,
) -> Result<SignedAttestation, FlowError> {
    IssueAttestationFlow::new(request).call(ctx).await
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

pub(crate) async fn with_timeout<T, F>(
    stage: FlowStage,
    limit: Duration,
    fut: F,
) -> Result<T, FlowError>
where
    F: Future<Output = Result<T, FlowError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(FlowError::Timeout {
            stage,
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

async fn open_sessions(
    ctx: &FlowContext,
    parties: &[Party],
) -> Result<Vec<Box<dyn FlowSession>>, FlowError> {
    let mut sessions = Vec::with_capacity(parties.len());
    for party in parties {
        match ctx.messaging.initiate_flow(party).await {
            Ok(session) => sessions.push(session),
            Err(err) => {
                let err = FlowError::from(err);
                cancel_sessions(&mut sessions, &err).await;
                return Err(err);
            }
        }
    }
    Ok(sessions)
}

/// Send the proposal on every session and wait until all have signed.
/// The first rejection or error ends the wait.
async fn gather_signatures(
    sessions: &mut [Box<dyn FlowSession>],
    stx: &SignedAttestation,
) -> Result<Vec<TransactionSignature>, FlowError> {
    let mut pending: FuturesUnordered<_> = sessions
        .iter_mut()
        .map(|session| collect_signature(session.as_mut(), stx))
        .collect();

    let mut sigs = Vec::with_capacity(pending.len());
    while let Some(result) = pending.next().await {
        sigs.push(result?);
    }
    Ok(sigs)
}

async fn collect_signature(
    session: &mut dyn FlowSession,
    stx: &SignedAttestation,
) -> Result<TransactionSignature, FlowError> {
    let party = session.counterparty().clone();
    messages::send(session, &FlowMessage::Proposal(stx.clone())).await?;

    match messages::receive(session).await? {
        FlowMessage::Signature(sig) => {
            if sig.by != *party.owning_key() || !sig.is_valid_for(&stx.id()) {
                return Err(FlowError::InvalidCounterpartySignature {
                    party: party.name().to_string(),
                });
            }
            tracing::debug!(from = %party, "counterparty signed");
            Ok(sig)
        }
        FlowMessage::Rejected { reason } => {
            tracing::warn!(from = %party, %reason, "counterparty rejected proposal");
            Err(FlowError::CounterpartyRejection {
                party: party.name().to_string(),
                reason,
            })
        }
        other => Err(FlowError::UnexpectedMessage {
            expected: "signature",
            received: other.kind(),
        }),
    }
}

async fn finalise(
    ctx: &FlowContext,
    stx: SignedAttestation,
    sessions: &mut [Box<dyn FlowSession>],
) -> Result<SignedAttestation, FlowError> {
    let notary = ctx.notary.identity().clone();
    stx.verify_signatures_except(&[*notary.owning_key()])?;

    let notary_sig = with_timeout(FlowStage::Finalising, ctx.config.finality_timeout, async {
        ctx.notary.notarise(&stx).await.map_err(FlowError::from)
    })
    .await?;
    if notary_sig.by != *notary.owning_key() || !notary_sig.is_valid_for(&stx.id()) {
        return Err(FlowError::InvalidCounterpartySignature {
            party: notary.name().to_string(),
        });
    }

    let stx = stx.with_signature(notary_sig);
    stx.verify_required_signatures()?;
    ctx.vault.record(stx.clone());

    for session in sessions.iter_mut() {
        let msg = FlowMessage::Finalised(stx.clone());
        if let Err(err) = messages::send(session.as_mut(), &msg).await {
            tracing::warn!(to = %session.counterparty(), %err, "finalised transaction not delivered");
        }
    }
    Ok(stx)
}

async fn cancel_sessions(sessions: &mut [Box<dyn FlowSession>], cause: &FlowError) {
    let reason = cause.to_string();
    for session in sessions.iter_mut() {
        let msg = FlowMessage::Cancelled {
            reason: reason.clone(),
        };
        if let Err(err) = messages::send(session.as_mut(), &msg).await {
            tracing::debug!(to = %session.counterparty(), %err, "cancellation not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reledger_protocol::crypto::LedgerKeypair;

    fn party(name: &str) -> Party {
        Party::new(name, LedgerKeypair::generate().public_key())
    }

    fn request(authority: &Party, seller: &Party, buyer: &Party) -> IssueAttestation {
        IssueAttestation {
            address: PropertyAddress {
                city: "Brooklyn".into(),
                ..PropertyAddress::default()
            },
            price: 810_000,
            selling_date: "2026-07-30".into(),
            ledger_authority: authority.clone(),
            sell_attester: seller.clone(),
            buy_attester: buyer.clone(),
        }
    }

    #[test]
    fn broker_comes_from_the_caller() {
        let (authority, seller, buyer, broker) =
            (party("reLedger"), party("Seller"), party("Buyer"), party("Broker"));
        let record = request(&authority, &seller, &buyer)
            .to_record(broker.clone())
            .unwrap();
        assert_eq!(record.broker, broker);
        assert_eq!(record.ledger_authority, authority);
    }

    #[test]
    fn counterparties_in_contact_order() {
        let (authority, seller, buyer, broker) =
            (party("reLedger"), party("Seller"), party("Buyer"), party("Broker"));
        let cps = request(&authority, &seller, &buyer).counterparties(&broker);
        assert_eq!(cps, vec![buyer, seller, authority]);
    }

    #[test]
    fn counterparties_skip_broker_and_duplicates() {
        let (authority, attester, broker) = (party("reLedger"), party("Both"), party("Broker"));
        let cps = request(&authority, &attester, &attester).counterparties(&broker);
        assert_eq!(cps, vec![attester.clone(), authority.clone()]);

        let cps = request(&authority, &attester, &broker).counterparties(&broker);
        assert_eq!(cps, vec![attester, authority]);
    }

    #[tokio::test]
    async fn with_timeout_reports_stage() {
        let res: Result<(), FlowError> = with_timeout(
            FlowStage::Finalising,
            Duration::from_millis(10),
            std::future::pending(),
        )
        .await;
        assert!(matches!(
            res,
            Err(FlowError::Timeout {
                stage: FlowStage::Finalising,
                timeout_ms: 10
            })
        ));
    }
}
