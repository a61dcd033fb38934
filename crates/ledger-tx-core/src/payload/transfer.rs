//! Plain CCD transfers.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use super::{PayloadBody, PayloadKind, MAX_DATA_SIZE};
use crate::error::{CodecError, Result};
use crate::types::{hex_bytes, u64_string, AccountAddress};
use crate::wire::{put_u16_prefixed, Cursor};

/// Transfer `amount` micro-units to `to`.
///
/// Body: `to(32) || amount(u64)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: AccountAddress,
    #[serde(with = "u64_string")]
    pub amount: u64,
}

impl PayloadBody for Transfer {
    const KIND: PayloadKind = PayloadKind::Transfer;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.put_slice(self.to.as_bytes());
        buf.put_u64(self.amount);
        Ok(())
    }

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            to: AccountAddress(cursor.read_array()?),
            amount: cursor.read_u64()?,
        })
    }
}

/// A transfer carrying a memo of at most 256 bytes.
///
/// Body: `to(32) || memo(u16 len + bytes) || amount(u64)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferWithMemo {
    pub to: AccountAddress,
    #[serde(with = "hex_bytes")]
    pub memo: Vec<u8>,
    #[serde(with = "u64_string")]
    pub amount: u64,
}

fn check_memo(memo: &[u8]) -> Result<()> {
    if memo.len() > MAX_DATA_SIZE {
        return Err(CodecError::InvalidPayload(format!(
            "memo of {} bytes exceeds {MAX_DATA_SIZE}",
            memo.len()
        )));
    }
    Ok(())
}

impl PayloadBody for TransferWithMemo {
    const KIND: PayloadKind = PayloadKind::TransferWithMemo;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        check_memo(&self.memo)?;
        buf.put_slice(self.to.as_bytes());
        put_u16_prefixed(buf, &self.memo)?;
        buf.put_u64(self.amount);
        Ok(())
    }

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self> {
        let to = AccountAddress(cursor.read_array()?);
        let memo = cursor.read_u16_prefixed()?;
        check_memo(memo)?;
        Ok(Self {
            to,
            memo: memo.to_vec(),
            amount: cursor.read_u64()?,
        })
    }
}
