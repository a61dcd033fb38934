//! Account transaction payloads.
//!
//! A serialized payload is a one-byte kind discriminant followed by the
//! kind-specific body. Decoding dispatches through [`REGISTRY`], a decode
//! table of [`PayloadCodec`] records, one per supported kind; an unknown
//! discriminant is always an error. Encoding, sizing and JSON match on the
//! [`Payload`] enum directly.

mod contract;
mod data;
mod staking;
mod token;
mod transfer;

pub use contract::{DeployModule, InitContract, UpdateContract};
pub use data::RegisterData;
pub use staking::{
    ConfigureDelegation, ConfigureValidator, DelegationTarget, OpenStatus, ValidatorKeys,
};
pub use token::TokenUpdate;
pub use transfer::{Transfer, TransferWithMemo};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::energy::EnergyParams;
use crate::error::{CodecError, Result};
use crate::wire::Cursor;

/// Maximum length of registered data and transfer memos.
pub const MAX_DATA_SIZE: usize = 256;

/// Payload discriminant on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PayloadKind {
    DeployModule = 0,
    InitContract = 1,
    UpdateContract = 2,
    Transfer = 3,
    RegisterData = 21,
    TransferWithMemo = 22,
    ConfigureValidator = 25,
    ConfigureDelegation = 26,
    TokenUpdate = 27,
}

impl PayloadKind {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::DeployModule),
            1 => Some(Self::InitContract),
            2 => Some(Self::UpdateContract),
            3 => Some(Self::Transfer),
            21 => Some(Self::RegisterData),
            22 => Some(Self::TransferWithMemo),
            25 => Some(Self::ConfigureValidator),
            26 => Some(Self::ConfigureDelegation),
            27 => Some(Self::TokenUpdate),
            _ => None,
        }
    }

    /// Name used as the JSON `type` tag.
    pub fn name(self) -> &'static str {
        codec_for(self).name
    }

    /// Whether the caller must supply execution energy for this kind.
    pub fn needs_execution_energy(self) -> bool {
        matches!(self, Self::InitContract | Self::UpdateContract)
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Body codec for one payload kind. The kind byte is handled by [`Payload`].
pub trait PayloadBody: Sized {
    const KIND: PayloadKind;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()>;

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self>;
}

/// A decoded account transaction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Payload {
    #[serde(rename = "deployModule")]
    DeployModule(DeployModule),
    #[serde(rename = "initContract")]
    InitContract(InitContract),
    #[serde(rename = "update")]
    UpdateContract(UpdateContract),
    #[serde(rename = "transfer")]
    Transfer(Transfer),
    #[serde(rename = "registerData")]
    RegisterData(RegisterData),
    #[serde(rename = "transferWithMemo")]
    TransferWithMemo(TransferWithMemo),
    #[serde(rename = "configureBaker")]
    ConfigureValidator(ConfigureValidator),
    #[serde(rename = "configureDelegation")]
    ConfigureDelegation(ConfigureDelegation),
    #[serde(rename = "tokenUpdate")]
    TokenUpdate(TokenUpdate),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::DeployModule(_) => PayloadKind::DeployModule,
            Payload::InitContract(_) => PayloadKind::InitContract,
            Payload::UpdateContract(_) => PayloadKind::UpdateContract,
            Payload::Transfer(_) => PayloadKind::Transfer,
            Payload::RegisterData(_) => PayloadKind::RegisterData,
            Payload::TransferWithMemo(_) => PayloadKind::TransferWithMemo,
            Payload::ConfigureValidator(_) => PayloadKind::ConfigureValidator,
            Payload::ConfigureDelegation(_) => PayloadKind::ConfigureDelegation,
            Payload::TokenUpdate(_) => PayloadKind::TokenUpdate,
        }
    }

    /// Append the kind byte and body to `buf`.
    pub fn encode_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.push(self.kind().to_u8());
        match self {
            Payload::DeployModule(body) => body.write_body(buf),
            Payload::InitContract(body) => body.write_body(buf),
            Payload::UpdateContract(body) => body.write_body(buf),
            Payload::Transfer(body) => body.write_body(buf),
            Payload::RegisterData(body) => body.write_body(buf),
            Payload::TransferWithMemo(body) => body.write_body(buf),
            Payload::ConfigureValidator(body) => body.write_body(buf),
            Payload::ConfigureDelegation(body) => body.write_body(buf),
            Payload::TokenUpdate(body) => body.write_body(buf),
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_to(&mut buf)?;
        Ok(buf)
    }

    /// Serialized length including the kind byte.
    pub fn size_of(&self) -> Result<u32> {
        let len = self.serialize()?.len();
        u32::try_from(len)
            .map_err(|_| CodecError::InvalidPayload(format!("payload of {len} bytes too large")))
    }

    /// Decode one payload from the cursor.
    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self> {
        let byte = cursor.read_u8()?;
        let kind = PayloadKind::from_u8(byte).ok_or(CodecError::UnsupportedPayloadKind(byte))?;
        (codec_for(kind).decode)(cursor)
    }

    /// Decode a buffer holding exactly one payload.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let payload = Self::decode(&mut cursor)?;
        cursor.finish()?;
        Ok(payload)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Kind-specific energy cost, or `None` for contract kinds whose cost is
    /// the caller-supplied execution energy.
    pub fn specific_cost(&self, params: &EnergyParams) -> Result<Option<u64>> {
        let cost = match self {
            Payload::InitContract(_) | Payload::UpdateContract(_) => return Ok(None),
            Payload::DeployModule(body) => params.deploy_module(body.source.len()),
            Payload::Transfer(_) | Payload::TransferWithMemo(_) => params.simple_transfer,
            Payload::RegisterData(_) => params.register_data,
            Payload::ConfigureDelegation(_) => params.configure_delegation,
            Payload::ConfigureValidator(body) => {
                if body.keys.is_some() {
                    params.configure_validator_with_keys
                } else {
                    params.configure_validator
                }
            }
            Payload::TokenUpdate(body) => body.energy(params)?,
        };
        Ok(Some(cost))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Decoder record for one payload kind.
pub struct PayloadCodec {
    pub kind: PayloadKind,
    pub name: &'static str,
    pub decode: fn(&mut Cursor<'_>) -> Result<Payload>,
}

fn read_as<T: PayloadBody + Into<Payload>>(cursor: &mut Cursor<'_>) -> Result<Payload> {
    T::read_body(cursor).map(Into::into)
}

const fn entry<T: PayloadBody + Into<Payload>>(name: &'static str) -> PayloadCodec {
    PayloadCodec {
        kind: T::KIND,
        name,
        decode: read_as::<T>,
    }
}

/// Every supported payload kind, in discriminant order.
pub static REGISTRY: [PayloadCodec; 9] = [
    entry::<DeployModule>("deployModule"),
    entry::<InitContract>("initContract"),
    entry::<UpdateContract>("update"),
    entry::<Transfer>("transfer"),
    entry::<RegisterData>("registerData"),
    entry::<TransferWithMemo>("transferWithMemo"),
    entry::<ConfigureValidator>("configureBaker"),
    entry::<ConfigureDelegation>("configureDelegation"),
    entry::<TokenUpdate>("tokenUpdate"),
];

fn codec_for(kind: PayloadKind) -> &'static PayloadCodec {
    let index = match kind {
        PayloadKind::DeployModule => 0,
        PayloadKind::InitContract => 1,
        PayloadKind::UpdateContract => 2,
        PayloadKind::Transfer => 3,
        PayloadKind::RegisterData => 4,
        PayloadKind::TransferWithMemo => 5,
        PayloadKind::ConfigureValidator => 6,
        PayloadKind::ConfigureDelegation => 7,
        PayloadKind::TokenUpdate => 8,
    };
    &REGISTRY[index]
}

macro_rules! impl_into_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Payload {
                fn from(body: $variant) -> Self {
                    Payload::$variant(body)
                }
            }
        )*
    };
}

impl_into_payload!(
    DeployModule,
    InitContract,
    UpdateContract,
    Transfer,
    RegisterData,
    TransferWithMemo,
    ConfigureValidator,
    ConfigureDelegation,
    TokenUpdate,
);
