//! The services a flow runs against, passed explicitly.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use reledger_contracts::{AttestationCommand, AttestationRecord};
use reledger_protocol::config;
use reledger_protocol::identity::{IdentityService, Party};
use reledger_protocol::network::MessagingService;
use reledger_protocol::notary::NotaryService;
use reledger_protocol::transaction::SigningService;
use reledger_protocol::vault::TransactionVault;

pub type AttestationNotary = dyn NotaryService<AttestationRecord, AttestationCommand>;
pub type AttestationVault = TransactionVault<AttestationRecord, AttestationCommand>;

/// Per-stage time limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// A single call to the signing service.
    pub signing_timeout: Duration,
    /// All counterparties answering the proposal.
    pub counterparty_timeout: Duration,
    /// The notary round trip.
    pub finality_timeout: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            signing_timeout: config::DEFAULT_SIGNING_TIMEOUT,
            counterparty_timeout: config::DEFAULT_COUNTERPARTY_TIMEOUT,
            finality_timeout: config::DEFAULT_FINALITY_TIMEOUT,
        }
    }
}

impl FlowConfig {
    /// Same limit for every stage. Handy in tests.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            signing_timeout: timeout,
            counterparty_timeout: timeout,
            finality_timeout: timeout,
        }
    }

    /// How long a responder waits for the outcome after signing: the
    /// initiator may still be gathering from others, then notarising.
    pub fn responder_finality_wait(&self) -> Duration {
        self.counterparty_timeout + self.finality_timeout
    }
}

/// Everything one party's flows need. Cheap to clone.
#[derive(Clone)]
pub struct FlowContext {
    pub our_identity: Party,
    pub signer: Arc<dyn SigningService>,
    pub identities: Arc<dyn IdentityService>,
    pub messaging: Arc<dyn MessagingService>,
    pub notary: Arc<AttestationNotary>,
    pub vault: AttestationVault,
    pub config: FlowConfig,
}
