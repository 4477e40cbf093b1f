//! # Network Module
//!
//! Session transport between parties. Flows talk to counterparties only
//! through [`FlowSession`]s opened by a [`MessagingService`]; payloads are
//! opaque `Bytes` frames produced by [`codec`].
//!
//! ```text
//! session.rs — FlowSession / MessagingService traits, SessionError
//! codec.rs   — bincode frame encoding with a size limit
//! memory.rs  — InMemoryNetwork: tokio mpsc transport for local networks
//! ```

pub mod codec;
pub mod memory;
pub mod session;

pub use memory::{InMemoryMessaging, InMemoryNetwork, InboundSessions};
pub use session::{FlowSession, MessagingService, SessionError};
