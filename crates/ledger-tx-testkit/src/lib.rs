//! # Ledger Tx Testkit
//!
//! Testing utilities for the ledger transaction codec.
//!
//! ## Overview
//!
//! - **Golden vectors**: Serialized transactions with known hashes
//! - **Generators**: Proptest strategies for payloads, signature maps, and signables
//! - **Fixtures**: Sample accounts, a fixed-signature signer, keyed test accounts
//!
//! ## Golden Vectors
//!
//! ```rust
//! use ledger_tx_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, hash) in verify_all_vectors() {
//!     assert!(matches, "{name}: {hash}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ledger_tx_testkit::generators::{signable_from_params, SignableParams};
//!
//! proptest! {
//!     #[test]
//!     fn digest_is_deterministic(params: SignableParams) {
//!         let a = signable_from_params(&params);
//!         let b = signable_from_params(&params);
//!         prop_assert_eq!(a.signing_digest().unwrap(), b.signing_digest().unwrap());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, FixedSigner, TestFixture};
pub use generators::{signable_from_params, SignableParams};
pub use vectors::{all_vectors, decode_vector, verify_all_vectors, GoldenVector};
