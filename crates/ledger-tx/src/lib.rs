//! # Ledger Tx
//!
//! Submission of ledger account transactions.
//!
//! The codec lives in [`ledger_tx_core`], re-exported here as `core`. This
//! crate adds the pieces that talk to a node:
//!
//! - [`NetworkClient`] - Nonce lookup and block item delivery
//! - [`Submitter`] - Build, sign, finalize, and send with retries
//! - [`MemoryNode`] - In-memory node for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ledger_tx::{MemoryNode, SubmitConfig, Submitter};
//! use ledger_tx::core::{AccountAddress, AccountKeys};
//!
//! async fn example(sender: AccountAddress, to: AccountAddress) {
//!     let keys = AccountKeys::generate();
//!     let submitter = Submitter::new(MemoryNode::new(), SubmitConfig::default());
//!
//!     let hash = submitter.transfer(sender, &keys, to, 1_000_000).await.unwrap();
//!     println!("submitted {hash}");
//! }
//! ```

pub mod client;
pub mod error;
pub mod memory;

pub use ledger_tx_core as core;

pub use client::{NetworkClient, Rejected, SubmitConfig, Submitter};
pub use error::{Result, SubmitError};
pub use memory::MemoryNode;

pub use ledger_tx_core::{
    AccountAddress, AccountKeys, EnergyParams, Finalized, Payload, Signable, Signer,
    TransactionBuilder, TransactionHash,
};
