//! # Identity Module
//!
//! Every participant is a [`Party`]: a display name plus the Ed25519 public
//! key that owns it. Name and key lookups go through an [`IdentityService`];
//! flows never reach for a global network map.

pub mod party;
pub mod service;

pub use party::Party;
pub use service::{IdentityService, NetworkMapCache};
