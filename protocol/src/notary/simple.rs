//! Single-node uniqueness notary.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{NotaryError, NotaryService};
use crate::crypto::LedgerKeypair;
use crate::identity::Party;
use crate::transaction::{
    CommandData, ContractState, LocalSigner, SecureHash, SignedTransaction, StateRef,
    TransactionSignature,
};

/// In-memory notary holding the map of consumed states.
pub struct SimpleNotary {
    identity: Party,
    signer: LocalSigner,
    consumed: Mutex<HashMap<StateRef, SecureHash>>,
    halted: AtomicBool,
}

impl SimpleNotary {
    pub fn new(name: impl Into<String>, keypair: LedgerKeypair) -> Self {
        let identity = Party::new(name, keypair.public_key());
        Self {
            identity,
            signer: LocalSigner::new(keypair),
            consumed: Mutex::new(HashMap::new()),
            halted: AtomicBool::new(false),
        }
    }

    /// The notary's identity. Same as [`NotaryService::identity`], without
    /// having to name the state and command types.
    pub fn identity(&self) -> &Party {
        &self.identity
    }

    /// Stop (or resume) accepting requests. While halted every request fails
    /// with [`NotaryError::Unavailable`].
    pub fn set_halted(&self, halted: bool) {
        self.halted.store(halted, Ordering::SeqCst);
    }

    /// The transaction that consumed `state_ref`, if any.
    pub fn consumed_by(&self, state_ref: &StateRef) -> Option<SecureHash> {
        self.consumed.lock().get(state_ref).copied()
    }

    pub fn consumed_count(&self) -> usize {
        self.consumed.lock().len()
    }
}

#[async_trait]
impl<S, C> NotaryService<S, C> for SimpleNotary
where
    S: ContractState,
    C: CommandData,
{
    fn identity(&self) -> &Party {
        SimpleNotary::identity(self)
    }

    async fn notarise(
        &self,
        stx: &SignedTransaction<S, C>,
    ) -> Result<TransactionSignature, NotaryError> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(NotaryError::Unavailable(format!(
                "{} is halted",
                self.identity
            )));
        }

        if stx.tx.notary != self.identity {
            return Err(NotaryError::WrongNotary {
                named: stx.tx.notary.to_string(),
                actual: self.identity.to_string(),
            });
        }

        stx.verify_signatures_except(&[*self.identity.owning_key()])?;

        let tx_id = stx.id();
        {
            let mut consumed = self.consumed.lock();
            if let Some((state_ref, other)) = stx.tx.inputs.iter().find_map(|r| {
                consumed
                    .get(r)
                    .filter(|by| **by != tx_id)
                    .map(|by| (*r, *by))
            }) {
                tracing::warn!(tx_id = %tx_id, %state_ref, consumed_by = %other, "double spend refused");
                return Err(NotaryError::Conflict {
                    state_ref: state_ref.to_string(),
                    consumed_by: other.to_string(),
                });
            }
            for input in &stx.tx.inputs {
                consumed.insert(*input, tx_id);
            }
        }

        tracing::info!(tx_id = %tx_id, inputs = stx.tx.inputs.len(), "transaction notarised");
        Ok(self.signer.sign_now(&tx_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DummyCommand, DummyState};
    use crate::transaction::{SigningService, TransactionBuilder};

    fn notary() -> SimpleNotary {
        SimpleNotary::new("Notary", LedgerKeypair::generate())
    }

    fn signed_spending(
        notary: &SimpleNotary,
        signer: &LocalSigner,
        inputs: &[StateRef],
    ) -> SignedTransaction<DummyState, DummyCommand> {
        let mut builder = TransactionBuilder::new(notary.identity().clone())
            .add_output_state(DummyState::new("out"))
            .add_command(DummyCommand, vec![signer.public_key()]);
        for r in inputs {
            builder = builder.add_input_state(*r);
        }
        let wtx = builder.build();
        let sig = signer.sign_now(&wtx.id);
        SignedTransaction::new(wtx, vec![sig])
    }

    fn some_ref(n: u8) -> StateRef {
        StateRef::new(SecureHash::from_bytes([n; 32]), 0)
    }

    #[tokio::test]
    async fn notary_signature_completes_the_set() {
        let notary = notary();
        let alice = LocalSigner::new(LedgerKeypair::generate());
        let stx = signed_spending(&notary, &alice, &[]);

        let sig = notary.notarise(&stx).await.unwrap();
        assert_eq!(sig.by, *notary.identity().owning_key());
        assert!(stx.with_signature(sig).verify_required_signatures().is_ok());
    }

    #[tokio::test]
    async fn second_spend_of_same_input_conflicts() {
        let notary = notary();
        let alice = LocalSigner::new(LedgerKeypair::generate());
        let input = some_ref(7);

        let first = signed_spending(&notary, &alice, &[input]);
        notary.notarise(&first).await.unwrap();
        assert_eq!(notary.consumed_by(&input), Some(first.id()));

        let second = signed_spending(&notary, &alice, &[input]);
        let err = notary.notarise(&second).await.unwrap_err();
        assert!(matches!(err, NotaryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn resubmission_is_idempotent() {
        let notary = notary();
        let alice = LocalSigner::new(LedgerKeypair::generate());
        let stx = signed_spending(&notary, &alice, &[some_ref(1), some_ref(2)]);

        notary.notarise(&stx).await.unwrap();
        notary.notarise(&stx).await.unwrap();
        assert_eq!(notary.consumed_count(), 2);
    }

    #[tokio::test]
    async fn missing_party_signature_is_refused() {
        let notary = notary();
        let alice = LocalSigner::new(LedgerKeypair::generate());
        let mut stx = signed_spending(&notary, &alice, &[]);
        stx.sigs.clear();

        let err = notary.notarise(&stx).await.unwrap_err();
        assert!(matches!(err, NotaryError::InvalidSignatures(_)));
    }

    #[tokio::test]
    async fn refused_transaction_consumes_nothing() {
        let notary = notary();
        let alice = LocalSigner::new(LedgerKeypair::generate());
        let mut stx = signed_spending(&notary, &alice, &[some_ref(3)]);
        stx.sigs.clear();

        assert!(notary.notarise(&stx).await.is_err());
        assert_eq!(notary.consumed_count(), 0);
    }

    #[tokio::test]
    async fn foreign_notary_is_refused() {
        let ours = notary();
        let theirs = notary();
        let alice = LocalSigner::new(LedgerKeypair::generate());
        let stx = signed_spending(&theirs, &alice, &[]);

        let err = ours.notarise(&stx).await.unwrap_err();
        assert!(matches!(err, NotaryError::WrongNotary { .. }));
    }

    #[tokio::test]
    async fn halted_notary_is_unavailable() {
        let notary = notary();
        let alice = LocalSigner::new(LedgerKeypair::generate());
        let stx = signed_spending(&notary, &alice, &[]);

        notary.set_halted(true);
        assert!(matches!(
            notary.notarise(&stx).await,
            Err(NotaryError::Unavailable(_))
        ));
        notary.set_halted(false);
        assert!(notary.notarise(&stx).await.is_ok());
    }
}
