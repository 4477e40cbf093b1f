//! In-process session transport.
//!
//! [`InMemoryNetwork`] connects every registered party through tokio mpsc
//! channels. Each registered party gets an [`InMemoryMessaging`] handle for
//! opening sessions and a receiver on which sessions initiated *towards* it
//! arrive.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::session::{FlowSession, MessagingService, SessionError};
use crate::config;
use crate::crypto::LedgerPublicKey;
use crate::identity::Party;

/// Sessions initiated towards a party are delivered on this receiver.
pub type InboundSessions = mpsc::Receiver<Box<dyn FlowSession>>;

/// Shared routing table. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    inboxes: Arc<DashMap<LedgerPublicKey, mpsc::Sender<Box<dyn FlowSession>>>>,
    sessions_opened: Arc<AtomicU64>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `party` to the network.
    pub fn register(&self, party: Party) -> (InMemoryMessaging, InboundSessions) {
        let (tx, rx) = mpsc::channel(config::INBOUND_SESSION_QUEUE);
        self.inboxes.insert(*party.owning_key(), tx);
        let messaging = InMemoryMessaging {
            me: party,
            network: self.clone(),
        };
        (messaging, rx)
    }

    /// Total sessions opened since the network was created.
    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened.load(Ordering::Relaxed)
    }
}

/// A party's handle for opening sessions.
#[derive(Clone)]
pub struct InMemoryMessaging {
    me: Party,
    network: InMemoryNetwork,
}

#[async_trait]
impl MessagingService for InMemoryMessaging {
    async fn initiate_flow(
        &self,
        counterparty: &Party,
    ) -> Result<Box<dyn FlowSession>, SessionError> {
        let inbox = self
            .network
            .inboxes
            .get(counterparty.owning_key())
            .map(|e| e.value().clone())
            .ok_or_else(|| SessionError::UnknownParty(counterparty.name().to_string()))?;

        let id = Uuid::new_v4();
        let (to_peer_tx, to_peer_rx) = mpsc::channel(config::SESSION_CHANNEL_CAPACITY);
        let (to_me_tx, to_me_rx) = mpsc::channel(config::SESSION_CHANNEL_CAPACITY);

        let remote = MemorySession {
            id,
            counterparty: self.me.clone(),
            outbound: to_me_tx,
            inbound: to_peer_rx,
        };
        inbox
            .send(Box::new(remote))
            .await
            .map_err(|_| SessionError::Closed(counterparty.name().to_string()))?;

        self.network.sessions_opened.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(session = %id, from = %self.me, to = %counterparty, "session opened");

        Ok(Box::new(MemorySession {
            id,
            counterparty: counterparty.clone(),
            outbound: to_peer_tx,
            inbound: to_me_rx,
        }))
    }
}

/// One end of an in-memory session.
pub struct MemorySession {
    id: Uuid,
    counterparty: Party,
    outbound: mpsc::Sender<Bytes>,
    inbound: mpsc::Receiver<Bytes>,
}

#[async_trait]
impl FlowSession for MemorySession {
    fn id(&self) -> Uuid {
        self.id
    }

    fn counterparty(&self) -> &Party {
        &self.counterparty
    }

    async fn send(&mut self, payload: Bytes) -> Result<(), SessionError> {
        self.outbound
            .send(payload)
            .await
            .map_err(|_| SessionError::Closed(self.counterparty.name().to_string()))
    }

    async fn receive(&mut self) -> Result<Bytes, SessionError> {
        self.inbound
            .recv()
            .await
            .ok_or_else(|| SessionError::Closed(self.counterparty.name().to_string()))
    }
}
