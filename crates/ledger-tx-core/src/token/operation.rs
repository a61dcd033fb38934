//! Token operations carried by a token-update payload.
//!
//! Operations encode as a CBOR array of single-key maps. The key names the
//! operation and the value holds its fields:
//!
//! ```text
//! [{"transfer": {"amount": 4([-4, 123]), "recipient": 40307({...})}}]
//! ```

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cbor::{self, as_map, text, text_key};
use crate::energy::EnergyParams;
use crate::error::{CodecError, Result};

use super::address::CborAccountAddress;
use super::amount::TokenAmount;
use super::memo::Memo;

/// Maximum token identifier length in bytes.
pub const MAX_TOKEN_ID_LEN: usize = 128;

/// Symbol identifying a protocol-level token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenId(String);

impl TokenId {
    pub fn new(symbol: impl Into<String>) -> Result<Self> {
        let symbol = symbol.into();
        if symbol.is_empty() || symbol.len() > MAX_TOKEN_ID_LEN {
            return Err(CodecError::InvalidPayload(format!(
                "token id must be 1..={MAX_TOKEN_ID_LEN} bytes, got {}",
                symbol.len()
            )));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TokenId {
    type Error = CodecError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<TokenId> for String {
    fn from(id: TokenId) -> Self {
        id.0
    }
}

impl std::str::FromStr for TokenId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A single operation on a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenOperation {
    Transfer {
        amount: TokenAmount,
        recipient: CborAccountAddress,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        memo: Option<Memo>,
    },
    Mint {
        amount: TokenAmount,
    },
    Burn {
        amount: TokenAmount,
    },
    AddAllowList {
        target: CborAccountAddress,
    },
    RemoveAllowList {
        target: CborAccountAddress,
    },
    AddDenyList {
        target: CborAccountAddress,
    },
    RemoveDenyList {
        target: CborAccountAddress,
    },
    Pause,
    Unpause,
}

impl TokenOperation {
    /// Operation name as used for the CBOR map key.
    pub const fn name(&self) -> &'static str {
        match self {
            TokenOperation::Transfer { .. } => "transfer",
            TokenOperation::Mint { .. } => "mint",
            TokenOperation::Burn { .. } => "burn",
            TokenOperation::AddAllowList { .. } => "addAllowList",
            TokenOperation::RemoveAllowList { .. } => "removeAllowList",
            TokenOperation::AddDenyList { .. } => "addDenyList",
            TokenOperation::RemoveDenyList { .. } => "removeDenyList",
            TokenOperation::Pause => "pause",
            TokenOperation::Unpause => "unpause",
        }
    }

    /// Energy charged for this operation on top of the token-update base.
    pub fn cost(&self, params: &EnergyParams) -> u64 {
        match self {
            TokenOperation::Transfer { .. } => params.token_transfer,
            TokenOperation::Mint { .. } => params.token_mint,
            TokenOperation::Burn { .. } => params.token_burn,
            TokenOperation::AddAllowList { .. }
            | TokenOperation::RemoveAllowList { .. }
            | TokenOperation::AddDenyList { .. }
            | TokenOperation::RemoveDenyList { .. } => params.token_list_update,
            TokenOperation::Pause | TokenOperation::Unpause => params.token_pause,
        }
    }

    pub fn to_value(&self) -> Value {
        let body = match self {
            TokenOperation::Transfer {
                amount,
                recipient,
                memo,
            } => {
                let mut fields = vec![
                    (text("amount"), amount.to_value()),
                    (text("recipient"), recipient.to_value()),
                ];
                if let Some(memo) = memo {
                    fields.push((text("memo"), memo.to_value()));
                }
                fields
            }
            TokenOperation::Mint { amount } | TokenOperation::Burn { amount } => {
                vec![(text("amount"), amount.to_value())]
            }
            TokenOperation::AddAllowList { target }
            | TokenOperation::RemoveAllowList { target }
            | TokenOperation::AddDenyList { target }
            | TokenOperation::RemoveDenyList { target } => {
                vec![(text("target"), target.to_value())]
            }
            TokenOperation::Pause | TokenOperation::Unpause => Vec::new(),
        };
        Value::Map(vec![(text(self.name()), Value::Map(body))])
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let entries = as_map(value, "token operation")?;
        let (key, body) = match entries {
            [entry] => entry,
            _ => {
                return Err(CodecError::InvalidCborShape(format!(
                    "token operation must have exactly one key, got {}",
                    entries.len()
                )))
            }
        };
        let name = text_key(key).ok_or_else(|| {
            CodecError::InvalidCborShape("token operation key must be text".into())
        })?;
        let mut fields = Fields::new(name, as_map(body, name)?)?;

        let op = match name {
            "transfer" => TokenOperation::Transfer {
                amount: TokenAmount::from_value(fields.take("amount")?)?,
                recipient: CborAccountAddress::from_value(fields.take("recipient")?)?,
                memo: fields.take_opt("memo").map(Memo::from_value).transpose()?,
            },
            "mint" => TokenOperation::Mint {
                amount: TokenAmount::from_value(fields.take("amount")?)?,
            },
            "burn" => TokenOperation::Burn {
                amount: TokenAmount::from_value(fields.take("amount")?)?,
            },
            "addAllowList" => TokenOperation::AddAllowList {
                target: CborAccountAddress::from_value(fields.take("target")?)?,
            },
            "removeAllowList" => TokenOperation::RemoveAllowList {
                target: CborAccountAddress::from_value(fields.take("target")?)?,
            },
            "addDenyList" => TokenOperation::AddDenyList {
                target: CborAccountAddress::from_value(fields.take("target")?)?,
            },
            "removeDenyList" => TokenOperation::RemoveDenyList {
                target: CborAccountAddress::from_value(fields.take("target")?)?,
            },
            "pause" => TokenOperation::Pause,
            "unpause" => TokenOperation::Unpause,
            other => {
                return Err(CodecError::InvalidCborShape(format!(
                    "unknown token operation {other:?}"
                )))
            }
        };
        fields.finish()?;
        Ok(op)
    }
}

/// Text-keyed fields of an operation body, consumed one by one.
struct Fields<'a> {
    operation: &'a str,
    entries: Vec<(&'a str, &'a Value)>,
}

impl<'a> Fields<'a> {
    fn new(operation: &'a str, map: &'a [(Value, Value)]) -> Result<Self> {
        let mut entries = Vec::with_capacity(map.len());
        for (k, v) in map {
            let key = text_key(k).ok_or_else(|| {
                CodecError::InvalidCborShape(format!("{operation}: field keys must be text"))
            })?;
            if entries.iter().any(|(seen, _)| *seen == key) {
                return Err(CodecError::InvalidCborShape(format!(
                    "{operation}: duplicate field {key:?}"
                )));
            }
            entries.push((key, v));
        }
        Ok(Self { operation, entries })
    }

    fn take_opt(&mut self, key: &str) -> Option<&'a Value> {
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.swap_remove(pos).1)
    }

    fn take(&mut self, key: &str) -> Result<&'a Value> {
        self.take_opt(key).ok_or_else(|| {
            CodecError::InvalidCborShape(format!("{}: missing field {key:?}", self.operation))
        })
    }

    fn finish(self) -> Result<()> {
        match self.entries.first() {
            None => Ok(()),
            Some((key, _)) => Err(CodecError::InvalidCborShape(format!(
                "{}: unexpected field {key:?}",
                self.operation
            ))),
        }
    }
}

/// Encode a list of operations as deterministic CBOR.
pub fn encode_operations(ops: &[TokenOperation]) -> Result<Vec<u8>> {
    let value = Value::Array(ops.iter().map(TokenOperation::to_value).collect());
    cbor::encode(&value)
}

/// Decode a CBOR array of operations.
pub fn decode_operations(bytes: &[u8]) -> Result<Vec<TokenOperation>> {
    match cbor::decode(bytes)? {
        Value::Array(items) => items.iter().map(TokenOperation::from_value).collect(),
        _ => Err(CodecError::InvalidCborShape(
            "token operations must be an array".into(),
        )),
    }
}
