//! Resolved transactions and the contract verification seam.
//!
//! A [`WireTransaction`] only *references* its inputs. Before a contract can
//! judge it, every [`StateRef`] is resolved to the state it points at,
//! producing a [`LedgerTransaction`]. Contracts implement [`Contract`] and
//! see nothing but the resolved view, so verification is a pure function of
//! the transaction.

use thiserror::Error;

use super::builder::WireTransaction;
use super::types::{Command, CommandData, ContractState, SecureHash, StateRef};
use crate::identity::Party;

/// A resolved input: the state plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct StateAndRef<S> {
    pub state: S,
    pub reference: StateRef,
}

/// Raised when an input reference cannot be resolved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("unknown input state {0}")]
    UnknownState(String),
}

/// Looks up previously recorded output states.
pub trait StateResolver<S> {
    fn resolve(&self, state_ref: &StateRef) -> Option<S>;
}

/// Resolver for callers that know the transaction has no inputs.
pub struct NoInputs;

impl<S> StateResolver<S> for NoInputs {
    fn resolve(&self, _state_ref: &StateRef) -> Option<S> {
        None
    }
}

/// The fully resolved view a [`Contract`] verifies.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransaction<S, C> {
    pub id: SecureHash,
    pub inputs: Vec<StateAndRef<S>>,
    pub outputs: Vec<S>,
    pub commands: Vec<Command<C>>,
    pub notary: Party,
}

impl<S, C> LedgerTransaction<S, C> {
    pub fn input_states(&self) -> impl Iterator<Item = &S> {
        self.inputs.iter().map(|i| &i.state)
    }
}

impl<S: ContractState, C: CommandData> WireTransaction<S, C> {
    /// Resolve every input through `resolver`.
    pub fn to_ledger_transaction(
        &self,
        resolver: &dyn StateResolver<S>,
    ) -> Result<LedgerTransaction<S, C>, ResolutionError> {
        let inputs = self
            .inputs
            .iter()
            .map(|r| {
                resolver
                    .resolve(r)
                    .map(|state| StateAndRef {
                        state,
                        reference: *r,
                    })
                    .ok_or_else(|| ResolutionError::UnknownState(r.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LedgerTransaction {
            id: self.id,
            inputs,
            outputs: self.outputs.clone(),
            commands: self.commands.clone(),
            notary: self.notary.clone(),
        })
    }
}

/// Validation logic attached to a state type.
///
/// Implementations must be deterministic: every participant and any later
/// auditor re-runs `verify` on the same transaction and must reach the same
/// verdict.
pub trait Contract {
    type State: ContractState;
    type Command: CommandData;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stable identifier for logs and audit trails.
    const ID: &'static str;

    fn verify(&self, tx: &LedgerTransaction<Self::State, Self::Command>)
        -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::LedgerKeypair;
    use crate::testing::{DummyCommand, DummyState};
    use crate::transaction::builder::TransactionBuilder;
    use std::collections::HashMap;

    struct MapResolver(HashMap<StateRef, DummyState>);

    impl StateResolver<DummyState> for MapResolver {
        fn resolve(&self, state_ref: &StateRef) -> Option<DummyState> {
            self.0.get(state_ref).cloned()
        }
    }

    fn notary() -> Party {
        Party::new("Notary", LedgerKeypair::generate().public_key())
    }

    #[test]
    fn zero_input_transaction_resolves_without_lookups() {
        let wtx: WireTransaction<DummyState, DummyCommand> = TransactionBuilder::new(notary())
            .add_output_state(DummyState::new("out"))
            .add_command(DummyCommand, vec![])
            .build();
        let ltx = wtx.to_ledger_transaction(&NoInputs).unwrap();
        assert!(ltx.inputs.is_empty());
        assert_eq!(ltx.outputs, wtx.outputs);
        assert_eq!(ltx.id, wtx.id);
    }

    #[test]
    fn inputs_resolve_through_resolver() {
        let r = StateRef::new(SecureHash::from_bytes([1u8; 32]), 0);
        let resolver = MapResolver(HashMap::from([(r, DummyState::new("prior"))]));
        let wtx: WireTransaction<DummyState, DummyCommand> = TransactionBuilder::new(notary())
            .add_input_state(r)
            .build();
        let ltx = wtx.to_ledger_transaction(&resolver).unwrap();
        assert_eq!(ltx.input_states().next(), Some(&DummyState::new("prior")));
    }

    #[test]
    fn unknown_input_is_an_error() {
        let r = StateRef::new(SecureHash::from_bytes([2u8; 32]), 1);
        let wtx: WireTransaction<DummyState, DummyCommand> = TransactionBuilder::new(notary())
            .add_input_state(r)
            .build();
        assert!(matches!(
            wtx.to_ledger_transaction(&NoInputs),
            Err(ResolutionError::UnknownState(_))
        ));
    }
}
