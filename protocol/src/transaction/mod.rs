//! # Transaction Module
//!
//! The ledger's unit of change and everything needed to agree on one.
//!
//! ```text
//! types.rs    — SecureHash, StateRef, Command, ContractState / CommandData traits
//! builder.rs  — WireTransaction and its fluent TransactionBuilder
//! signing.rs  — TransactionSignature, SigningService, LocalSigner
//! signed.rs   — SignedTransaction and signature-set verification
//! ledger.rs   — LedgerTransaction (resolved inputs) and the Contract trait
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build** — [`TransactionBuilder`] assembles inputs, outputs and commands.
//! 2. **Verify** — resolve to a [`LedgerTransaction`] and run the [`Contract`].
//! 3. **Sign** — each required signer signs the transaction id.
//! 4. **Notarise** — the notary checks uniqueness and adds its signature.
//! 5. **Record** — every participant stores the finalised [`SignedTransaction`].

pub mod builder;
pub mod ledger;
pub mod signed;
pub mod signing;
pub mod types;

pub use builder::{TransactionBuilder, WireTransaction};
pub use ledger::{
    Contract, LedgerTransaction, NoInputs, ResolutionError, StateAndRef, StateResolver,
};
pub use signed::{SignatureError, SignedTransaction};
pub use signing::{LocalSigner, SigningError, SigningService, TransactionSignature};
pub use types::{Command, CommandData, ContractState, SecureHash, StateRef};
