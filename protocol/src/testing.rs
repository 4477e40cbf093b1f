//! Minimal state and command types for unit tests of the generic machinery.

use serde::{Deserialize, Serialize};

use crate::identity::Party;
use crate::transaction::{CommandData, ContractState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DummyState {
    pub label: String,
    pub participants: Vec<Party>,
}

impl DummyState {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            participants: Vec::new(),
        }
    }

    pub fn with_participants(mut self, participants: Vec<Party>) -> Self {
        self.participants = participants;
        self
    }
}

impl ContractState for DummyState {
    fn participants(&self) -> Vec<Party> {
        self.participants.clone()
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = self.label.as_bytes().to_vec();
        for p in &self.participants {
            buf.extend_from_slice(p.owning_key().as_bytes());
        }
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DummyCommand;

impl CommandData for DummyCommand {
    fn canonical_bytes(&self) -> Vec<u8> {
        b"dummy".to_vec()
    }
}
