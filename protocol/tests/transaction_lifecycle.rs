//! Transaction lifecycle across two parties and a notary, using only the
//! protocol crate: build, sign, exchange over a session, notarise, record,
//! then spend the recorded output.

use serde::{Deserialize, Serialize};

use reledger_protocol::crypto::LedgerKeypair;
use reledger_protocol::identity::{IdentityService, NetworkMapCache, Party};
use reledger_protocol::network::{codec, FlowSession, InMemoryNetwork, MessagingService};
use reledger_protocol::notary::{NotaryError, NotaryService, SimpleNotary};
use reledger_protocol::transaction::{
    CommandData, ContractState, LocalSigner, ResolutionError, SecureHash, SignatureError,
    SignedTransaction, SigningService, StateRef, TransactionBuilder, TransactionSignature,
};
use reledger_protocol::vault::TransactionVault;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Deed {
    parcel: String,
    holders: Vec<Party>,
}

impl ContractState for Deed {
    fn participants(&self) -> Vec<Party> {
        self.holders.clone()
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        self.parcel.as_bytes().to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum DeedCommand {
    Record,
    Transfer,
}

impl CommandData for DeedCommand {
    fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            DeedCommand::Record => b"deed/record".to_vec(),
            DeedCommand::Transfer => b"deed/transfer".to_vec(),
        }
    }
}

type DeedTx = SignedTransaction<Deed, DeedCommand>;

struct Member {
    party: Party,
    signer: LocalSigner,
}

fn member(name: &str) -> Member {
    let keypair = LedgerKeypair::generate();
    Member {
        party: Party::new(name, keypair.public_key()),
        signer: LocalSigner::new(keypair),
    }
}

fn deed(parcel: &str, holders: &[&Member]) -> Deed {
    Deed {
        parcel: parcel.into(),
        holders: holders.iter().map(|m| m.party.clone()).collect(),
    }
}

/// Alice proposes `stx` to Bob over a fresh session; Bob signs and replies.
async fn countersign(
    net: &InMemoryNetwork,
    alice: &Member,
    bob: &Member,
    stx: &DeedTx,
) -> TransactionSignature {
    let (alice_messaging, _alice_inbound) = net.register(alice.party.clone());
    let (_bob_messaging, mut bob_inbound) = net.register(bob.party.clone());

    let mut ours = alice_messaging.initiate_flow(&bob.party).await.unwrap();
    let mut theirs = bob_inbound.recv().await.unwrap();
    assert_eq!(theirs.counterparty(), &alice.party);

    ours.send(codec::encode(stx).unwrap()).await.unwrap();
    let received: DeedTx = codec::decode(&theirs.receive().await.unwrap()).unwrap();
    assert_eq!(&received, stx);

    let sig = bob.signer.sign(&received.id()).await.unwrap();
    theirs.send(codec::encode(&sig).unwrap()).await.unwrap();
    codec::decode(&ours.receive().await.unwrap()).unwrap()
}

#[tokio::test]
async fn issue_then_transfer() {
    let net = InMemoryNetwork::new();
    let identities = NetworkMapCache::new();
    let notary = SimpleNotary::new("Notary", LedgerKeypair::generate());
    let alice = member("Alice");
    let bob = member("Bob");
    identities.register(alice.party.clone());
    identities.register(bob.party.clone());
    let vault: TransactionVault<Deed, DeedCommand> = TransactionVault::new();

    // Record: both holders and the notary sign.
    let wtx = TransactionBuilder::new(notary.identity().clone())
        .add_output_state(deed("3-00171-0021", &[&alice, &bob]))
        .add_command(
            DeedCommand::Record,
            vec![*alice.party.owning_key(), *bob.party.owning_key()],
        )
        .build();
    let stx = SignedTransaction::new(wtx.clone(), vec![alice.signer.sign_now(&wtx.id)]);
    let bob_sig = countersign(&net, &alice, &bob, &stx).await;
    let stx = stx.with_signature(bob_sig);

    assert_eq!(stx.missing_signers().len(), 1);
    let notary_sig = notary.notarise(&stx).await.unwrap();
    let recorded = stx.with_signature(notary_sig);
    recorded.verify_required_signatures().unwrap();
    assert!(vault.record(recorded.clone()));
    assert!(!vault.record(recorded.clone()));

    // Transfer the recorded deed to Bob alone.
    let input = StateRef::new(recorded.id(), 0);
    let transfer = TransactionBuilder::new(notary.identity().clone())
        .add_input_state(input)
        .add_output_state(deed("3-00171-0021", &[&bob]))
        .add_command(DeedCommand::Transfer, vec![*alice.party.owning_key()])
        .build();
    let ltx = transfer.to_ledger_transaction(&vault).unwrap();
    assert_eq!(ltx.inputs[0].state.holders.len(), 2);
    assert_eq!(
        identities.party_from_key(ltx.inputs[0].state.holders[1].owning_key()),
        Some(bob.party.clone())
    );

    let signed =
        SignedTransaction::new(transfer.clone(), vec![alice.signer.sign_now(&transfer.id)]);
    let sig = notary.notarise(&signed).await.unwrap();
    vault.record(signed.with_signature(sig));
    assert_eq!(notary.consumed_by(&input), Some(transfer.id));
    assert_eq!(vault.len(), 2);

    // A second spend of the same deed is refused.
    let again = TransactionBuilder::new(notary.identity().clone())
        .add_input_state(input)
        .add_output_state(deed("3-00171-0021", &[&alice]))
        .add_command(DeedCommand::Transfer, vec![*alice.party.owning_key()])
        .build();
    let again = SignedTransaction::new(again.clone(), vec![alice.signer.sign_now(&again.id)]);
    assert!(matches!(
        notary.notarise(&again).await,
        Err(NotaryError::Conflict { .. })
    ));
}

#[test]
fn unknown_input_does_not_resolve() {
    let notary = member("Notary");
    let alice = member("Alice");
    let vault: TransactionVault<Deed, DeedCommand> = TransactionVault::new();

    let wtx = TransactionBuilder::<Deed, DeedCommand>::new(notary.party.clone())
        .add_input_state(StateRef::new(SecureHash::from_bytes([4; 32]), 1))
        .add_output_state(deed("p", &[&alice]))
        .add_command(DeedCommand::Transfer, vec![*alice.party.owning_key()])
        .build();

    assert!(matches!(
        wtx.to_ledger_transaction(&vault),
        Err(ResolutionError::UnknownState(_))
    ));
}

#[tokio::test]
async fn tampered_transaction_fails_signature_checks() {
    let notary = SimpleNotary::new("Notary", LedgerKeypair::generate());
    let alice = member("Alice");

    let wtx = TransactionBuilder::new(notary.identity().clone())
        .add_output_state(deed("original", &[&alice]))
        .add_command(DeedCommand::Record, vec![*alice.party.owning_key()])
        .build();
    let mut stx = SignedTransaction::new(wtx.clone(), vec![alice.signer.sign_now(&wtx.id)]);
    stx.tx.outputs[0].parcel = "forged".into();

    assert!(matches!(
        stx.verify_signatures_except(&[*notary.identity().owning_key()]),
        Err(SignatureError::IdMismatch { .. })
    ));
    assert!(matches!(
        notary.notarise(&stx).await,
        Err(NotaryError::InvalidSignatures(SignatureError::IdMismatch { .. }))
    ));
}
