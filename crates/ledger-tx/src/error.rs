//! Error types for transaction submission.

use ledger_tx_core::CodecError;
use thiserror::Error;

/// Errors that can occur while submitting a transaction.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The transaction could not be built, signed, or encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The node refused the transaction. Not retried.
    #[error("rejected by node: {0}")]
    Rejected(String),

    /// A node query failed.
    #[error("network error: {0}")]
    Network(#[source] anyhow::Error),

    /// Every send attempt failed with a transient error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: anyhow::Error,
    },

    #[error("system clock is before the unix epoch")]
    Clock,
}

/// Result type for submission operations.
pub type Result<T> = std::result::Result<T, SubmitError>;
