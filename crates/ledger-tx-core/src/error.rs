//! Error types for the transaction codec.

use thiserror::Error;

/// Transaction role that owns a signature mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRole {
    Sender,
    Sponsor,
}

impl std::fmt::Display for SignatureRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureRole::Sender => write!(f, "sender"),
            SignatureRole::Sponsor => write!(f, "sponsor"),
        }
    }
}

/// Errors raised while building, encoding, or decoding transactions.
///
/// Every variant is a local validation failure. None of them are retryable.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("unsupported payload kind: {0}")]
    UnsupportedPayloadKind(u8),

    #[error("payload size mismatch: header declares {declared}, payload has {actual}")]
    PayloadSizeMismatch { declared: u32, actual: u32 },

    #[error("duplicate signature for credential {credential} key {key}")]
    DuplicateSignature { credential: u8, key: u8 },

    #[error("too many {role} signatures: counted {count}, allowed {allowed}")]
    SignatureBoundExceeded {
        role: SignatureRole,
        count: usize,
        allowed: usize,
    },

    #[error("buffer not exhausted: {0} trailing bytes")]
    BufferNotExhausted(usize),

    #[error("invalid CBOR tag: expected {expected}, got {got:?}")]
    InvalidCborTag { expected: u64, got: Option<u64> },

    #[error("invalid CBOR shape: {0}")]
    InvalidCborShape(String),

    #[error("amount out of range: {0}")]
    AmountOutOfRange(String),

    #[error("network identifier mismatch: expected {expected}, got {got}")]
    NetworkIdentifierMismatch { expected: u64, got: u64 },

    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid signature map: {0}")]
    InvalidSignatureMap(String),

    #[error("transaction version mismatch: {0} vs {1}")]
    VersionMismatch(u8, u8),

    #[error("missing {0} signature")]
    MissingSignature(SignatureRole),

    #[error("invalid account address: {0}")]
    InvalidAddress(String),

    #[error("unsupported block item kind: {0}")]
    UnsupportedBlockItemKind(u8),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signer error: {0}")]
    Signer(String),

    #[error("incomplete transaction: missing {0}")]
    Incomplete(&'static str),

    #[error("energy mismatch: declared {declared}, expected {expected}")]
    EnergyMismatch { declared: u64, expected: u64 },
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
