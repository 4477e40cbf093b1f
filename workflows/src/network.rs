//! # Local Network
//!
//! A complete set of parties, each with its own [`FlowNode`], plus a
//! notary, wired together in process. Used by the node binary to serve the
//! API and by the integration tests.
//!
//! ```rust,ignore
//! let net = LocalNetworkBuilder::new()
//!     .party("reLedger")
//!     .party("SellAttester")
//!     .party("BuyAttester")
//!     .party("Broker")
//!     .start();
//! let broker = net.node("Broker").unwrap();
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use reledger_protocol::crypto::LedgerKeypair;
use reledger_protocol::identity::{NetworkMapCache, Party};
use reledger_protocol::network::{InMemoryNetwork, InboundSessions};
use reledger_protocol::notary::SimpleNotary;
use reledger_protocol::transaction::LocalSigner;

use crate::context::{AttestationVault, FlowConfig, FlowContext};
use crate::node::FlowNode;
use crate::responder::ProposalCheck;

struct PartyEntry {
    name: String,
    check: Option<Arc<dyn ProposalCheck>>,
    responsive: bool,
}

pub struct LocalNetworkBuilder {
    config: FlowConfig,
    notary_name: String,
    parties: Vec<PartyEntry>,
}

impl Default for LocalNetworkBuilder {
    fn default() -> Self {
        Self {
            config: FlowConfig::default(),
            notary_name: "Notary".to_string(),
            parties: Vec::new(),
        }
    }
}

impl LocalNetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn notary(mut self, name: impl Into<String>) -> Self {
        self.notary_name = name.into();
        self
    }

    pub fn party(self, name: impl Into<String>) -> Self {
        self.add(name.into(), None, true)
    }

    /// A party whose node applies `check` before signing anything.
    pub fn party_with_check(
        self,
        name: impl Into<String>,
        check: impl ProposalCheck + 'static,
    ) -> Self {
        self.add(name.into(), Some(Arc::new(check)), true)
    }

    /// A party that accepts sessions but never answers on them.
    pub fn unresponsive_party(self, name: impl Into<String>) -> Self {
        self.add(name.into(), None, false)
    }

    fn add(mut self, name: String, check: Option<Arc<dyn ProposalCheck>>, responsive: bool) -> Self {
        self.parties.push(PartyEntry {
            name,
            check,
            responsive,
        });
        self
    }

    /// Create every node and start its session dispatcher. Must be called
    /// from within a tokio runtime.
    pub fn start(self) -> LocalNetwork {
        let transport = InMemoryNetwork::new();
        let identities = NetworkMapCache::new();
        let notary = Arc::new(SimpleNotary::new(self.notary_name, LedgerKeypair::generate()));
        identities.register(notary.identity().clone());

        let mut nodes = BTreeMap::new();
        let mut dispatchers = Vec::new();
        let mut parked = Vec::new();

        for entry in self.parties {
            let keypair = LedgerKeypair::generate();
            let party = Party::new(entry.name.clone(), keypair.public_key());
            identities.register(party.clone());
            let (messaging, inbound) = transport.register(party.clone());

            let ctx = FlowContext {
                our_identity: party,
                signer: Arc::new(LocalSigner::new(keypair)),
                identities: Arc::new(identities.clone()),
                messaging: Arc::new(messaging),
                notary: notary.clone(),
                vault: AttestationVault::new(),
                config: self.config,
            };
            let mut node = FlowNode::new(ctx);
            if let Some(check) = entry.check {
                node = node.with_check(check);
            }
            let node = Arc::new(node);

            if entry.responsive {
                dispatchers.push(Arc::clone(&node).spawn(inbound));
            } else {
                parked.push(inbound);
            }
            nodes.insert(entry.name, node);
        }

        tracing::info!(
            parties = nodes.len(),
            notary = %notary.identity(),
            "local network started"
        );

        LocalNetwork {
            transport,
            identities,
            notary,
            nodes,
            dispatchers,
            _parked: parked,
        }
    }
}

/// A running set of parties. Dropping it stops every dispatcher.
pub struct LocalNetwork {
    transport: InMemoryNetwork,
    identities: NetworkMapCache,
    notary: Arc<SimpleNotary>,
    nodes: BTreeMap<String, Arc<FlowNode>>,
    dispatchers: Vec<JoinHandle<()>>,
    _parked: Vec<InboundSessions>,
}

impl LocalNetwork {
    pub fn node(&self, name: &str) -> Option<Arc<FlowNode>> {
        self.nodes.get(name).cloned()
    }

    /// Nodes ordered by party name.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<FlowNode>> {
        self.nodes.values()
    }

    pub fn party(&self, name: &str) -> Option<Party> {
        self.nodes.get(name).map(|n| n.identity().clone())
    }

    pub fn notary(&self) -> &Arc<SimpleNotary> {
        &self.notary
    }

    pub fn identities(&self) -> &NetworkMapCache {
        &self.identities
    }

    /// Sessions opened between parties since start.
    pub fn sessions_opened(&self) -> u64 {
        self.transport.sessions_opened()
    }
}

impl Drop for LocalNetwork {
    fn drop(&mut self) {
        for handle in &self.dispatchers {
            handle.abort();
        }
    }
}
