//! Protocol-level token updates.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use super::{PayloadBody, PayloadKind};
use crate::energy::EnergyParams;
use crate::error::{CodecError, Result};
use crate::token::{decode_operations, encode_operations, TokenId, TokenOperation};
use crate::types::hex_bytes;
use crate::wire::{put_u32_prefixed, Cursor};

/// Apply a list of operations to a token.
///
/// Body: `token_id(u8 len + utf8) || operations(u32 len + CBOR)`. The
/// operations are kept as encoded CBOR so unparsed payloads round-trip
/// byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdate {
    pub token_id: TokenId,
    #[serde(with = "hex_bytes")]
    pub operations: Vec<u8>,
}

impl TokenUpdate {
    pub fn new(token_id: TokenId, ops: &[TokenOperation]) -> Result<Self> {
        Ok(Self {
            token_id,
            operations: encode_operations(ops)?,
        })
    }

    /// Decode the embedded operations.
    pub fn operations(&self) -> Result<Vec<TokenOperation>> {
        decode_operations(&self.operations)
    }

    /// Base cost plus the cost of every operation.
    pub fn energy(&self, params: &EnergyParams) -> Result<u64> {
        Ok(self
            .operations()?
            .iter()
            .fold(params.token_update_base, |acc, op| {
                acc.saturating_add(op.cost(params))
            }))
    }
}

impl PayloadBody for TokenUpdate {
    const KIND: PayloadKind = PayloadKind::TokenUpdate;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        let id = self.token_id.as_str().as_bytes();
        // TokenId guarantees 1..=128 bytes.
        buf.put_u8(id.len() as u8);
        buf.put_slice(id);
        put_u32_prefixed(buf, &self.operations)
    }

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self> {
        let len = cursor.read_u8()? as usize;
        let id = String::from_utf8(cursor.read_bytes(len)?.to_vec())
            .map_err(|e| CodecError::InvalidPayload(format!("token id is not utf-8: {e}")))?;
        Ok(Self {
            token_id: TokenId::new(id)?,
            operations: cursor.read_u32_prefixed()?.to_vec(),
        })
    }
}
