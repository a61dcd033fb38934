//! Fixed-width transaction headers.
//!
//! V0 layout (60 bytes, big-endian):
//!
//! ```text
//! sender(32) || nonce(8) || energy(8) || payload_size(4) || expiry(8)
//! ```
//!
//! V1 prefixes a 16-bit bitmap of optional fields and appends them after the
//! V0 fields. Bit 0 marks a sponsor account.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::types::{u64_string, AccountAddress};
use crate::wire::Cursor;

/// Encoded size of a V0 header.
pub const HEADER_V0_SIZE: usize = 60;

/// Encoded size of a V1 header without optional fields.
pub const HEADER_V1_BASE_SIZE: usize = 2 + HEADER_V0_SIZE;

/// V1 bitmap bit marking a sponsor account.
const SPONSOR_BIT: u16 = 0x0001;

/// Header of a V0 account transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderV0 {
    pub sender: AccountAddress,
    #[serde(with = "u64_string")]
    pub nonce: u64,
    #[serde(with = "u64_string")]
    pub energy: u64,
    pub payload_size: u32,
    /// Unix seconds after which the transaction is rejected.
    #[serde(with = "u64_string")]
    pub expiry: u64,
}

impl HeaderV0 {
    /// Append the encoded header to `buf`.
    pub fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.put_slice(self.sender.as_bytes());
        buf.put_u64(self.nonce);
        buf.put_u64(self.energy);
        buf.put_u32(self.payload_size);
        buf.put_u64(self.expiry);
    }

    /// Encode to a fresh 60-byte buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_V0_SIZE);
        self.encode_to(&mut buf);
        buf
    }

    /// Decode exactly one header from the cursor.
    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self> {
        if cursor.remaining() < HEADER_V0_SIZE {
            return Err(CodecError::MalformedHeader(format!(
                "need {} bytes, have {}",
                HEADER_V0_SIZE,
                cursor.remaining()
            )));
        }
        Ok(Self {
            sender: AccountAddress(cursor.read_array()?),
            nonce: cursor.read_u64()?,
            energy: cursor.read_u64()?,
            payload_size: cursor.read_u32()?,
            expiry: cursor.read_u64()?,
        })
    }

    /// Decode a buffer that must hold exactly one header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let header = Self::decode(&mut cursor)?;
        cursor.finish()?;
        Ok(header)
    }

    pub const fn size(&self) -> usize {
        HEADER_V0_SIZE
    }
}

/// Header of a V1 account transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderV1 {
    pub sender: AccountAddress,
    #[serde(with = "u64_string")]
    pub nonce: u64,
    #[serde(with = "u64_string")]
    pub energy: u64,
    pub payload_size: u32,
    #[serde(with = "u64_string")]
    pub expiry: u64,
    /// Account paying the fees on the sender's behalf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<AccountAddress>,
}

impl HeaderV1 {
    fn bitmap(&self) -> u16 {
        if self.sponsor.is_some() {
            SPONSOR_BIT
        } else {
            0
        }
    }

    pub fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.put_u16(self.bitmap());
        buf.put_slice(self.sender.as_bytes());
        buf.put_u64(self.nonce);
        buf.put_u64(self.energy);
        buf.put_u32(self.payload_size);
        buf.put_u64(self.expiry);
        if let Some(sponsor) = &self.sponsor {
            buf.put_slice(sponsor.as_bytes());
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size());
        self.encode_to(&mut buf);
        buf
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self> {
        if cursor.remaining() < HEADER_V1_BASE_SIZE {
            return Err(CodecError::MalformedHeader(format!(
                "need {} bytes, have {}",
                HEADER_V1_BASE_SIZE,
                cursor.remaining()
            )));
        }
        let bitmap = cursor.read_u16()?;
        if bitmap & !SPONSOR_BIT != 0 {
            return Err(CodecError::MalformedHeader(format!(
                "unsupported bits in bitmap: {:#06x}",
                bitmap
            )));
        }
        let sender = AccountAddress(cursor.read_array()?);
        let nonce = cursor.read_u64()?;
        let energy = cursor.read_u64()?;
        let payload_size = cursor.read_u32()?;
        let expiry = cursor.read_u64()?;
        let sponsor = if bitmap & SPONSOR_BIT != 0 {
            let bytes = cursor
                .read_array()
                .map_err(|_| CodecError::MalformedHeader("truncated sponsor".into()))?;
            Some(AccountAddress(bytes))
        } else {
            None
        };
        Ok(Self {
            sender,
            nonce,
            energy,
            payload_size,
            expiry,
            sponsor,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let header = Self::decode(&mut cursor)?;
        cursor.finish()?;
        Ok(header)
    }

    /// Encoded size, including the sponsor when present.
    pub fn size(&self) -> usize {
        HEADER_V1_BASE_SIZE + if self.sponsor.is_some() { 32 } else { 0 }
    }
}

/// Encoded size of a V1 header with or without a sponsor.
pub const fn header_v1_size(has_sponsor: bool) -> usize {
    if has_sponsor {
        HEADER_V1_BASE_SIZE + 32
    } else {
        HEADER_V1_BASE_SIZE
    }
}
