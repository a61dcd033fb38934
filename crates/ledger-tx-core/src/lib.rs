//! # Ledger Tx Core
//!
//! Wire codec for ledger account transactions.
//!
//! This crate does no I/O. It builds, signs, serializes, and parses
//! transactions, and encodes the CBOR operations carried by token updates.
//!
//! ## Key Types
//!
//! - [`Payload`] - Tagged union of every supported transaction kind
//! - [`TransactionBuilder`] - Assembles a [`Signable`] from header fields
//! - [`Signable`] - Header and payload collecting signatures (V0 or V1)
//! - [`SignatureMap`] - Signatures by credential and key index
//! - [`Finalized`] - A signed transaction, serializable as a block item
//! - [`TokenOperation`] - CBOR-encoded operation inside a token update
//!
//! ## Lifecycle
//!
//! ```text
//! TransactionBuilder -> Signable -> (sign / sponsor / merge)* -> PreFinalized -> Finalized
//! ```
//!
//! Energy is charged per signature, per serialized byte, and per payload
//! kind. See [`EnergyParams`].

pub mod cbor;
pub mod energy;
pub mod error;
pub mod finalized;
pub mod header;
pub mod payload;
pub mod signature;
pub mod signer;
pub mod token;
pub mod transaction;
pub mod types;
pub mod wire;

pub use energy::EnergyParams;
pub use error::{CodecError, Result, SignatureRole};
pub use finalized::{BlockItemKind, Finalized, PreFinalized};
pub use header::{header_v1_size, HeaderV0, HeaderV1, HEADER_V0_SIZE, HEADER_V1_BASE_SIZE};
pub use payload::{Payload, PayloadKind};
pub use signature::{Signature, SignatureMap, SponsoredSignatures};
pub use signer::{AccountKeys, Signer};
pub use token::{TokenAmount, TokenId, TokenOperation};
pub use transaction::{Signable, SignableHeader, SponsorDetails, TransactionBuilder};
pub use types::{AccountAddress, ContractAddress, ModuleReference, TransactionHash};
