//! Tagged CBOR address wrappers.
//!
//! Account form (tag 40307):
//!
//! ```text
//! 40307({ ?1: 40305({ 1: 919 }), 3: bytes(32) })
//! ```
//!
//! Contract form (tag 40919): a bare index when the subindex is zero,
//! otherwise `[index, subindex]`.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use crate::cbor::{self, as_map, as_u64, int_key, uint, untag};
use crate::error::{CodecError, Result};
use crate::types::{AccountAddress, ContractAddress};

/// Tag for a tagged account address.
pub const ACCOUNT_ADDRESS_TAG: u64 = 40307;
/// Tag for coin information inside an account address.
pub const COIN_INFO_TAG: u64 = 40305;
/// Tag for a tagged contract address.
pub const CONTRACT_ADDRESS_TAG: u64 = 40919;
/// The only network identifier accepted in coin information.
pub const NETWORK_ID: u64 = 919;

const KEY_COIN_INFO: u64 = 1;
const KEY_ADDRESS: u64 = 3;
const KEY_NETWORK: u64 = 1;

/// Coin information marker. Only one network is supported, so it carries
/// no data beyond its presence.
///
/// In JSON it appears as the network identifier number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CoinInfo;

impl Serialize for CoinInfo {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(NETWORK_ID)
    }
}

impl<'de> Deserialize<'de> for CoinInfo {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match u64::deserialize(deserializer)? {
            NETWORK_ID => Ok(CoinInfo),
            other => Err(serde::de::Error::custom(format!(
                "unsupported network id {other}"
            ))),
        }
    }
}

impl CoinInfo {
    pub const fn network_id(&self) -> u64 {
        NETWORK_ID
    }

    fn to_value(self) -> Value {
        Value::Tag(
            COIN_INFO_TAG,
            Box::new(Value::Map(vec![(uint(KEY_NETWORK), uint(NETWORK_ID))])),
        )
    }

    fn from_value(value: &Value) -> Result<Self> {
        let entries = as_map(untag(value, COIN_INFO_TAG)?, "coin info")?;
        let mut network = None;
        for (k, v) in entries {
            match int_key(k) {
                Some(KEY_NETWORK) if network.is_none() => {
                    let id = as_u64(v).ok_or_else(|| {
                        CodecError::InvalidCborShape("coin info network id must be uint".into())
                    })?;
                    network = Some(id);
                }
                _ => {
                    return Err(CodecError::InvalidCborShape(format!(
                        "unexpected coin info key {:?}",
                        k
                    )))
                }
            }
        }
        match network {
            Some(NETWORK_ID) => Ok(CoinInfo),
            Some(got) => Err(CodecError::NetworkIdentifierMismatch {
                expected: NETWORK_ID,
                got,
            }),
            None => Err(CodecError::InvalidCborShape(
                "coin info missing network id".into(),
            )),
        }
    }
}

/// An account address as it appears in token operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CborAccountAddress {
    pub address: AccountAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_info: Option<CoinInfo>,
}

impl CborAccountAddress {
    /// Wrap an address with coin information attached.
    pub fn new(address: AccountAddress) -> Self {
        Self {
            address,
            coin_info: Some(CoinInfo),
        }
    }

    /// Wrap an address without coin information.
    pub fn bare(address: AccountAddress) -> Self {
        Self {
            address,
            coin_info: None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut entries = Vec::with_capacity(2);
        if let Some(info) = self.coin_info {
            entries.push((uint(KEY_COIN_INFO), info.to_value()));
        }
        entries.push((uint(KEY_ADDRESS), Value::Bytes(self.address.0.to_vec())));
        Value::Tag(ACCOUNT_ADDRESS_TAG, Box::new(Value::Map(entries)))
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let entries = as_map(untag(value, ACCOUNT_ADDRESS_TAG)?, "account address")?;

        let mut address = None;
        let mut coin_info = None;
        for (k, v) in entries {
            match int_key(k) {
                Some(KEY_ADDRESS) if address.is_none() => {
                    let bytes = match v {
                        Value::Bytes(b) => b,
                        _ => {
                            return Err(CodecError::InvalidCborShape(
                                "account address must be a byte string".into(),
                            ))
                        }
                    };
                    let addr = AccountAddress::try_from(bytes.as_slice()).map_err(|_| {
                        CodecError::InvalidCborShape(format!(
                            "account address must be 32 bytes, got {}",
                            bytes.len()
                        ))
                    })?;
                    address = Some(addr);
                }
                Some(KEY_COIN_INFO) if coin_info.is_none() => {
                    coin_info = Some(CoinInfo::from_value(v)?);
                }
                _ => {
                    return Err(CodecError::InvalidCborShape(format!(
                        "unexpected account address key {:?}",
                        k
                    )))
                }
            }
        }

        let address = address
            .ok_or_else(|| CodecError::InvalidCborShape("account address missing key 3".into()))?;
        Ok(Self { address, coin_info })
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        cbor::encode(&self.to_value())
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Self::from_value(&cbor::decode(bytes)?)
    }
}

impl From<AccountAddress> for CborAccountAddress {
    fn from(address: AccountAddress) -> Self {
        Self::new(address)
    }
}

/// A contract address as it appears in token operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CborContractAddress(ContractAddress);

impl CborContractAddress {
    pub const fn new(index: u64, subindex: u64) -> Self {
        Self(ContractAddress::new(index, subindex))
    }

    pub const fn address(&self) -> ContractAddress {
        self.0
    }

    pub fn to_value(&self) -> Value {
        let inner = if self.0.subindex == 0 {
            uint(self.0.index)
        } else {
            Value::Array(vec![uint(self.0.index), uint(self.0.subindex)])
        };
        Value::Tag(CONTRACT_ADDRESS_TAG, Box::new(inner))
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        match untag(value, CONTRACT_ADDRESS_TAG)? {
            inner @ Value::Integer(_) => {
                let index = as_u64(inner).ok_or_else(|| {
                    CodecError::InvalidCborShape("contract index must be uint".into())
                })?;
                Ok(Self::new(index, 0))
            }
            Value::Array(items) => match items.as_slice() {
                [index, subindex] => {
                    let index = as_u64(index).ok_or_else(|| {
                        CodecError::InvalidCborShape("contract index must be uint".into())
                    })?;
                    let subindex = as_u64(subindex).ok_or_else(|| {
                        CodecError::InvalidCborShape("contract subindex must be uint".into())
                    })?;
                    if subindex == 0 {
                        return Err(CodecError::InvalidCborShape(
                            "zero subindex must use the bare index form".into(),
                        ));
                    }
                    Ok(Self::new(index, subindex))
                }
                _ => Err(CodecError::InvalidCborShape(format!(
                    "contract address array must have 2 items, got {}",
                    items.len()
                ))),
            },
            _ => Err(CodecError::InvalidCborShape(
                "contract address must be uint or array".into(),
            )),
        }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        cbor::encode(&self.to_value())
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Self::from_value(&cbor::decode(bytes)?)
    }
}

impl From<ContractAddress> for CborContractAddress {
    fn from(address: ContractAddress) -> Self {
        Self(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR_HEX: &str = "d46bbc5fbbbbabb07752d4acb86892d7a2479856d414182f703e21065dad046d";

    fn addr() -> AccountAddress {
        AccountAddress::from_hex(ADDR_HEX).unwrap()
    }

    #[test]
    fn test_account_address_with_coin_info_bytes() {
        let bytes = CborAccountAddress::new(addr()).to_cbor().unwrap();
        // d9 9d73: tag 40307, a2: map(2), 01: key 1, d9 9d71: tag 40305,
        // a1 01 19 0397: {1: 919}, 03 5820: key 3, bytes(32)
        let expected = format!("d99d73a201d99d71a101190397035820{}", ADDR_HEX);
        assert_eq!(hex::encode(&bytes), expected);
    }

    #[test]
    fn test_account_address_roundtrip_bytes() {
        for wrapped in [CborAccountAddress::new(addr()), CborAccountAddress::bare(addr())] {
            let bytes = wrapped.to_cbor().unwrap();
            let decoded = CborAccountAddress::from_cbor(&bytes).unwrap();
            assert_eq!(decoded, wrapped);
            assert_eq!(decoded.to_cbor().unwrap(), bytes);
        }
    }

    #[test]
    fn test_account_address_wrong_tag() {
        let value = Value::Tag(40308, Box::new(Value::Map(vec![])));
        assert!(matches!(
            CborAccountAddress::from_value(&value),
            Err(CodecError::InvalidCborTag { expected: ACCOUNT_ADDRESS_TAG, got: Some(40308) })
        ));
    }

    #[test]
    fn test_account_address_not_a_map() {
        let value = Value::Tag(ACCOUNT_ADDRESS_TAG, Box::new(uint(3)));
        assert!(matches!(
            CborAccountAddress::from_value(&value),
            Err(CodecError::InvalidCborShape(_))
        ));
    }

    #[test]
    fn test_account_address_wrong_length() {
        let value = Value::Tag(
            ACCOUNT_ADDRESS_TAG,
            Box::new(Value::Map(vec![(uint(3), Value::Bytes(vec![0u8; 31]))])),
        );
        assert!(matches!(
            CborAccountAddress::from_value(&value),
            Err(CodecError::InvalidCborShape(_))
        ));
    }

    #[test]
    fn test_account_address_unexpected_key() {
        let value = Value::Tag(
            ACCOUNT_ADDRESS_TAG,
            Box::new(Value::Map(vec![
                (uint(2), uint(0)),
                (uint(3), Value::Bytes(addr().0.to_vec())),
            ])),
        );
        assert!(matches!(
            CborAccountAddress::from_value(&value),
            Err(CodecError::InvalidCborShape(_))
        ));
    }

    #[test]
    fn test_account_address_missing_address() {
        let value = Value::Tag(
            ACCOUNT_ADDRESS_TAG,
            Box::new(Value::Map(vec![(uint(1), CoinInfo.to_value())])),
        );
        assert!(matches!(
            CborAccountAddress::from_value(&value),
            Err(CodecError::InvalidCborShape(_))
        ));
    }

    #[test]
    fn test_network_id_mismatch() {
        let coin_info = Value::Tag(
            COIN_INFO_TAG,
            Box::new(Value::Map(vec![(uint(1), uint(920))])),
        );
        let value = Value::Tag(
            ACCOUNT_ADDRESS_TAG,
            Box::new(Value::Map(vec![
                (uint(1), coin_info),
                (uint(3), Value::Bytes(addr().0.to_vec())),
            ])),
        );
        assert!(matches!(
            CborAccountAddress::from_value(&value),
            Err(CodecError::NetworkIdentifierMismatch { expected: 919, got: 920 })
        ));
    }

    #[test]
    fn test_contract_address_zero_subindex_is_bare() {
        let bytes = CborContractAddress::new(7, 0).to_cbor().unwrap();
        // d9 9fd7: tag 40919, 07: uint 7
        assert_eq!(bytes, vec![0xd9, 0x9f, 0xd7, 0x07]);
        assert_eq!(
            CborContractAddress::from_cbor(&bytes).unwrap(),
            CborContractAddress::new(7, 0)
        );
    }

    #[test]
    fn test_contract_address_pair_form() {
        let bytes = CborContractAddress::new(7, 2).to_cbor().unwrap();
        assert_eq!(bytes, vec![0xd9, 0x9f, 0xd7, 0x82, 0x07, 0x02]);
        let decoded = CborContractAddress::from_cbor(&bytes).unwrap();
        assert_eq!(decoded.address(), ContractAddress::new(7, 2));
        assert_eq!(decoded.to_cbor().unwrap(), bytes);
    }

    #[test]
    fn test_contract_address_pair_with_zero_rejected() {
        let bytes = vec![0xd9, 0x9f, 0xd7, 0x82, 0x07, 0x00];
        assert!(matches!(
            CborContractAddress::from_cbor(&bytes),
            Err(CodecError::InvalidCborShape(_))
        ));
    }

    #[test]
    fn test_contract_address_wrong_arity() {
        let bytes = vec![0xd9, 0x9f, 0xd7, 0x83, 0x07, 0x01, 0x01];
        assert!(CborContractAddress::from_cbor(&bytes).is_err());
    }
}
