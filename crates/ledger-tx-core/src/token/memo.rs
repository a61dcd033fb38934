//! Transfer memos.
//!
//! A memo is either raw bytes or CBOR content wrapped in tag 24
//! (embedded CBOR data item).

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use crate::cbor::{self, untag};
use crate::error::{CodecError, Result};
use crate::types::hex_bytes;

/// Tag for an embedded CBOR data item.
pub const TAGGED_MEMO: u64 = 24;

/// Maximum memo content length in bytes.
pub const MAX_MEMO_SIZE: usize = 256;

fn check_len(len: usize) -> Result<()> {
    if len > MAX_MEMO_SIZE {
        return Err(CodecError::InvalidPayload(format!(
            "memo of {len} bytes exceeds {MAX_MEMO_SIZE}"
        )));
    }
    Ok(())
}

/// Memo content that is itself encoded CBOR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CborMemoJson", into = "CborMemoJson")]
pub struct CborMemo {
    content: Vec<u8>,
}

impl CborMemo {
    /// Wrap pre-encoded CBOR content.
    pub fn new(content: Vec<u8>) -> Result<Self> {
        check_len(content.len())?;
        Ok(Self { content })
    }

    /// Encode a text string as CBOR memo content.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::new(cbor::encode(&Value::Text(text.to_string()))?)
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Decode the embedded content.
    pub fn parse(&self) -> Result<Value> {
        cbor::decode(&self.content)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct CborMemoJson(#[serde(with = "hex_bytes")] Vec<u8>);

impl TryFrom<CborMemoJson> for CborMemo {
    type Error = CodecError;

    fn try_from(json: CborMemoJson) -> Result<Self> {
        Self::new(json.0)
    }
}

impl From<CborMemo> for CborMemoJson {
    fn from(memo: CborMemo) -> Self {
        Self(memo.content)
    }
}

/// Memo attached to a token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "content")]
pub enum Memo {
    Cbor(CborMemo),
    Raw(
        #[serde(serialize_with = "hex_bytes::serialize", deserialize_with = "bounded_raw")]
        Vec<u8>,
    ),
}

fn bounded_raw<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<u8>, D::Error> {
    let bytes = hex_bytes::deserialize(deserializer)?;
    check_len(bytes.len()).map_err(serde::de::Error::custom)?;
    Ok(bytes)
}

impl Memo {
    /// A raw memo, checked against the size limit.
    pub fn raw(bytes: Vec<u8>) -> Result<Self> {
        check_len(bytes.len())?;
        Ok(Memo::Raw(bytes))
    }

    /// A CBOR text memo.
    pub fn text(text: &str) -> Result<Self> {
        Ok(Memo::Cbor(CborMemo::from_text(text)?))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Memo::Cbor(memo) => Value::Tag(TAGGED_MEMO, Box::new(Value::Bytes(memo.content.clone()))),
            Memo::Raw(bytes) => Value::Bytes(bytes.clone()),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bytes(bytes) => Memo::raw(bytes.clone()),
            Value::Tag(..) => match untag(value, TAGGED_MEMO)? {
                Value::Bytes(content) => Ok(Memo::Cbor(CborMemo::new(content.clone())?)),
                _ => Err(CodecError::InvalidCborShape(
                    "tagged memo must wrap a byte string".into(),
                )),
            },
            _ => Err(CodecError::InvalidCborShape(
                "memo must be bytes or tagged bytes".into(),
            )),
        }
    }
}
