//! Finalized transactions and block items.
//!
//! ```text
//! V0:  sender_map || header_v0 || payload
//! V1:  sender_map || (0x00 | 0x01 || sponsor_map) || header_v1 || payload
//! ```
//!
//! A block item prefixes the serialized transaction with its kind byte. The
//! transaction hash covers the serialized bytes without that prefix.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result, SignatureRole};
use crate::header::{HeaderV0, HeaderV1};
use crate::payload::Payload;
use crate::signature::{SignatureMap, SponsoredSignatures};
use crate::types::{AccountAddress, TransactionHash};
use crate::wire::Cursor;

/// Kind byte of a block item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockItemKind {
    AccountTransaction = 0,
    AccountTransactionV1 = 3,
}

impl BlockItemKind {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(BlockItemKind::AccountTransaction),
            3 => Some(BlockItemKind::AccountTransactionV1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedV0 {
    pub(crate) header: HeaderV0,
    pub(crate) payload: Payload,
    pub(crate) signatures: SignatureMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedV1 {
    pub(crate) header: HeaderV1,
    pub(crate) payload: Payload,
    pub(crate) signatures: SponsoredSignatures,
}

/// A signed transaction ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum Finalized {
    #[serde(rename = "0")]
    V0(FinalizedV0),
    #[serde(rename = "1")]
    V1(FinalizedV1),
}

/// Decode a payload and check it against the size the header declares.
fn decode_payload(cursor: &mut Cursor<'_>, declared: u32) -> Result<Payload> {
    let before = cursor.remaining();
    let payload = Payload::decode(cursor)?;
    let consumed = before - cursor.remaining();
    if consumed as u64 != u64::from(declared) {
        return Err(CodecError::PayloadSizeMismatch {
            declared,
            actual: u32::try_from(consumed).unwrap_or(u32::MAX),
        });
    }
    Ok(payload)
}

impl Finalized {
    pub fn version(&self) -> u8 {
        match self {
            Finalized::V0(_) => 0,
            Finalized::V1(_) => 1,
        }
    }

    pub fn sender(&self) -> &AccountAddress {
        match self {
            Finalized::V0(tx) => &tx.header.sender,
            Finalized::V1(tx) => &tx.header.sender,
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            Finalized::V0(tx) => tx.header.nonce,
            Finalized::V1(tx) => tx.header.nonce,
        }
    }

    pub fn energy(&self) -> u64 {
        match self {
            Finalized::V0(tx) => tx.header.energy,
            Finalized::V1(tx) => tx.header.energy,
        }
    }

    pub fn expiry(&self) -> u64 {
        match self {
            Finalized::V0(tx) => tx.header.expiry,
            Finalized::V1(tx) => tx.header.expiry,
        }
    }

    pub fn sponsor(&self) -> Option<&AccountAddress> {
        match self {
            Finalized::V0(_) => None,
            Finalized::V1(tx) => tx.header.sponsor.as_ref(),
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Finalized::V0(tx) => &tx.payload,
            Finalized::V1(tx) => &tx.payload,
        }
    }

    pub fn sender_signatures(&self) -> &SignatureMap {
        match self {
            Finalized::V0(tx) => &tx.signatures,
            Finalized::V1(tx) => &tx.signatures.sender,
        }
    }

    pub fn sponsor_signatures(&self) -> Option<&SignatureMap> {
        match self {
            Finalized::V0(_) => None,
            Finalized::V1(tx) => tx.signatures.sponsor.as_ref(),
        }
    }

    pub fn block_item_kind(&self) -> BlockItemKind {
        match self {
            Finalized::V0(_) => BlockItemKind::AccountTransaction,
            Finalized::V1(_) => BlockItemKind::AccountTransactionV1,
        }
    }

    /// Check the signature requirements of a submittable transaction.
    pub fn validate(&self) -> Result<()> {
        let declared = match self {
            Finalized::V0(tx) => tx.header.payload_size,
            Finalized::V1(tx) => tx.header.payload_size,
        };
        let actual = self.payload().size_of()?;
        if declared != actual {
            return Err(CodecError::PayloadSizeMismatch { declared, actual });
        }
        if self.sender_signatures().is_empty() {
            return Err(CodecError::MissingSignature(SignatureRole::Sender));
        }
        if let Finalized::V1(tx) = self {
            match (&tx.header.sponsor, &tx.signatures.sponsor) {
                (Some(_), None) => return Err(CodecError::MissingSignature(SignatureRole::Sponsor)),
                (Some(_), Some(sigs)) if sigs.is_empty() => {
                    return Err(CodecError::MissingSignature(SignatureRole::Sponsor))
                }
                (None, Some(_)) => {
                    return Err(CodecError::InvalidSignatureMap(
                        "sponsor signatures without a sponsor".into(),
                    ))
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn encode_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Finalized::V0(tx) => {
                tx.signatures.encode_to(buf)?;
                tx.header.encode_to(buf);
                tx.payload.encode_to(buf)
            }
            Finalized::V1(tx) => {
                tx.signatures.encode_to(buf)?;
                tx.header.encode_to(buf);
                tx.payload.encode_to(buf)
            }
        }
    }

    /// Serialized transaction without the block item kind.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_to(&mut buf)?;
        Ok(buf)
    }

    /// SHA-256 of the serialized transaction.
    pub fn hash(&self) -> Result<TransactionHash> {
        Ok(TransactionHash::hash(&self.serialize()?))
    }

    pub fn to_block_item(&self) -> Result<Vec<u8>> {
        let mut buf = vec![self.block_item_kind().to_u8()];
        buf.reserve(256);
        self.encode_to(&mut buf)?;
        Ok(buf)
    }

    pub fn from_block_item(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let byte = cursor.read_u8()?;
        let tx = match BlockItemKind::from_u8(byte) {
            Some(BlockItemKind::AccountTransaction) => Self::decode_v0(&mut cursor)?,
            Some(BlockItemKind::AccountTransactionV1) => Self::decode_v1(&mut cursor)?,
            None => return Err(CodecError::UnsupportedBlockItemKind(byte)),
        };
        cursor.finish()?;
        Ok(tx)
    }

    pub fn decode_v0(cursor: &mut Cursor<'_>) -> Result<Self> {
        let signatures = SignatureMap::decode(cursor)?;
        let header = HeaderV0::decode(cursor)?;
        let payload = decode_payload(cursor, header.payload_size)?;
        let tx = Finalized::V0(FinalizedV0 {
            header,
            payload,
            signatures,
        });
        tx.validate()?;
        Ok(tx)
    }

    pub fn decode_v1(cursor: &mut Cursor<'_>) -> Result<Self> {
        let signatures = SponsoredSignatures::decode(cursor)?;
        let header = HeaderV1::decode(cursor)?;
        let payload = decode_payload(cursor, header.payload_size)?;
        let tx = Finalized::V1(FinalizedV1 {
            header,
            payload,
            signatures,
        });
        tx.validate()?;
        Ok(tx)
    }

    /// Decode a buffer holding exactly one serialized V0 transaction.
    pub fn deserialize_v0(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let tx = Self::decode_v0(&mut cursor)?;
        cursor.finish()?;
        Ok(tx)
    }

    /// Decode a buffer holding exactly one serialized V1 transaction.
    pub fn deserialize_v1(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let tx = Self::decode_v1(&mut cursor)?;
        cursor.finish()?;
        Ok(tx)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let tx: Finalized = serde_json::from_str(json)?;
        tx.validate()?;
        Ok(tx)
    }
}

/// A transaction whose header energy is fixed to the signatures present,
/// but whose signature requirements are not yet checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreFinalized(Finalized);

impl PreFinalized {
    pub(crate) fn new(tx: Finalized) -> Self {
        Self(tx)
    }

    pub fn energy(&self) -> u64 {
        self.0.energy()
    }

    pub fn inner(&self) -> &Finalized {
        &self.0
    }

    pub fn finalize(self) -> Result<Finalized> {
        self.0.validate()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyParams;
    use crate::payload::Transfer;
    use crate::signature::Signature;
    use crate::transaction::{Signable, TransactionBuilder};

    const SENDER: &str = "49176df18432686c93c61ca89dafbe1cb383bfe6eb3a301ef8907f852643d98d";
    const RECIPIENT: &str = "d46bbc5fbbbbabb07752d4acb86892d7a2479856d414182f703e21065dad046d";
    const SENDER_SIG: &str = "893f2e4a230bcbeee24675454c4ca95a2f55fd33f328958b626c6fa368341e07902c9ffe7864c3bee23b2b2300ed0922eb814ea41fdee25035be8cddc5c3980f";
    const SPONSOR_SIG: &str = "620d859224c40160c2bb03dbe84e9f57b8ed17f1a5df28b4e21f10658992531ef27655e6b74b8e47923e1ccb0413d563205e8b6c0cd22b3adce5dc7dc1daf603";

    fn core() -> String {
        format!("{SENDER}0000000000000001{:016x}00000029000000006553f100", 500)
    }

    fn payload() -> String {
        format!("03{RECIPIENT}00000000000f4240")
    }

    fn v0_hex() -> String {
        format!("010001000080{}{}{}", "00".repeat(128), core(), payload())
    }

    fn v1_hex() -> String {
        format!("010001000040{SENDER_SIG}000000{}{}", core(), payload())
    }

    fn v1_sponsored_hex() -> String {
        format!(
            "010001000040{SENDER_SIG}01010001000040{SPONSOR_SIG}0001{}{RECIPIENT}{}",
            core(),
            payload()
        )
    }

    fn builder() -> TransactionBuilder {
        TransactionBuilder::new(Transfer {
            to: AccountAddress::from_hex(RECIPIENT).unwrap(),
            amount: 1_000_000,
        })
        .sender(AccountAddress::from_hex(SENDER).unwrap())
        .nonce(1)
        .expiry(0x6553f100)
    }

    fn sig(hex_str: &str) -> SignatureMap {
        SignatureMap::single(0, 0, Signature(hex::decode(hex_str).unwrap()))
    }

    #[test]
    fn test_v0_fixture() {
        let bytes = hex::decode(v0_hex()).unwrap();
        assert_eq!(bytes.len(), 235);
        let tx = Finalized::deserialize_v0(&bytes).unwrap();
        assert_eq!(tx.energy(), 500);
        assert_eq!(tx.nonce(), 1);
        assert_eq!(tx.serialize().unwrap(), bytes);
        assert_eq!(
            tx.hash().unwrap().to_hex(),
            "a147330fb4636aa5727cb7228e921ace5a2aa95dfeecc633a08e7f90fd67035a"
        );
    }

    #[test]
    fn test_v0_fixture_from_builder() {
        let params = EnergyParams::default();
        let tx = builder()
            .execution_energy(299)
            .build(&params)
            .unwrap()
            .add_signature(&SignatureMap::single(0, 0, Signature(vec![0; 128])))
            .unwrap()
            .finalize(&params)
            .unwrap();
        assert_eq!(hex::encode(tx.serialize().unwrap()), v0_hex());
    }

    #[test]
    fn test_v1_fixture() {
        let bytes = hex::decode(v1_hex()).unwrap();
        assert_eq!(bytes.len(), 174);
        let tx = Finalized::deserialize_v1(&bytes).unwrap();
        assert!(tx.sponsor().is_none());
        assert_eq!(tx.serialize().unwrap(), bytes);
        assert_eq!(
            tx.hash().unwrap().to_hex(),
            "1f02386f3e823fb85d075f93103ae04db75ad875708685e4177f3c1dd91fe3a2"
        );

        let params = EnergyParams::default();
        let header = builder().execution_energy(297).build(&params).unwrap().header().clone();
        let built = Signable::new_v1(header, tx.payload().clone(), &params)
            .unwrap()
            .add_signature(&sig(SENDER_SIG))
            .unwrap()
            .finalize(&params)
            .unwrap();
        assert_eq!(built, tx);
    }

    #[test]
    fn test_v1_sponsored_fixture() {
        let bytes = hex::decode(v1_sponsored_hex()).unwrap();
        assert_eq!(bytes.len(), 276);
        let tx = Finalized::deserialize_v1(&bytes).unwrap();
        assert_eq!(tx.sponsor().map(|a| a.to_hex()), Some(RECIPIENT.to_string()));
        assert_eq!(
            tx.hash().unwrap().to_hex(),
            "040d2ea5ad1e896cb983357fb268a3bcb56ea7d42b48fd01dd95d05ad7e33205"
        );

        let params = EnergyParams::default();
        let built = builder()
            .execution_energy(165)
            .sponsor(AccountAddress::from_hex(RECIPIENT).unwrap(), 1)
            .build(&params)
            .unwrap()
            .add_sponsor_signature(&sig(SPONSOR_SIG))
            .unwrap()
            .add_signature(&sig(SENDER_SIG))
            .unwrap()
            .finalize(&params)
            .unwrap();
        assert_eq!(built.serialize().unwrap(), bytes);
    }

    #[test]
    fn test_block_item_roundtrip() {
        let tx = Finalized::deserialize_v1(&hex::decode(v1_sponsored_hex()).unwrap()).unwrap();
        let item = tx.to_block_item().unwrap();
        assert_eq!(item[0], 3);
        assert_eq!(Finalized::from_block_item(&item).unwrap(), tx);

        let v0 = Finalized::deserialize_v0(&hex::decode(v0_hex()).unwrap()).unwrap();
        assert_eq!(v0.to_block_item().unwrap()[0], 0);
    }

    #[test]
    fn test_unknown_block_item_kind() {
        let mut item = hex::decode(v0_hex()).unwrap();
        item.insert(0, 1);
        assert!(matches!(
            Finalized::from_block_item(&item),
            Err(CodecError::UnsupportedBlockItemKind(1))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = hex::decode(v0_hex()).unwrap();
        bytes.push(0);
        assert!(matches!(
            Finalized::deserialize_v0(&bytes),
            Err(CodecError::BufferNotExhausted(1))
        ));
    }

    #[test]
    fn test_payload_size_mismatch() {
        let hex_str = v0_hex().replace("00000029000000006553f100", "0000002a000000006553f100");
        let bytes = hex::decode(hex_str).unwrap();
        assert!(matches!(
            Finalized::deserialize_v0(&bytes),
            Err(CodecError::PayloadSizeMismatch {
                declared: 42,
                actual: 41
            })
        ));
    }

    #[test]
    fn test_finalize_energy_uses_actual_signatures() {
        let params = EnergyParams::default();
        let signable = builder().multi_sig(3).build(&params).unwrap();
        assert_eq!(signable.estimated_energy(), 701);
        let pre = signable
            .add_signature(&sig(SENDER_SIG))
            .unwrap()
            .pre_finalize(&params)
            .unwrap();
        assert_eq!(pre.energy(), 501);
    }

    #[test]
    fn test_finalize_requires_signatures() {
        let params = EnergyParams::default();
        let signable = builder().build(&params).unwrap();
        assert!(matches!(
            signable.finalize(&params),
            Err(CodecError::MissingSignature(SignatureRole::Sender))
        ));

        let sponsored = builder()
            .sponsor(AccountAddress::from_hex(RECIPIENT).unwrap(), 1)
            .build(&params)
            .unwrap()
            .add_signature(&sig(SENDER_SIG))
            .unwrap();
        assert!(matches!(
            sponsored.finalize(&params),
            Err(CodecError::MissingSignature(SignatureRole::Sponsor))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let tx = Finalized::deserialize_v1(&hex::decode(v1_sponsored_hex()).unwrap()).unwrap();
        let json = tx.to_json().unwrap();
        assert!(json.starts_with(r#"{"version":"1""#));
        assert_eq!(Finalized::from_json(&json).unwrap(), tx);
    }

    #[test]
    fn test_json_payload_size_mismatch() {
        let tx = Finalized::deserialize_v1(&hex::decode(v1_hex()).unwrap()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&tx.to_json().unwrap()).unwrap();
        assert_eq!(value["header"]["payloadSize"], 41);
        value["header"]["payloadSize"] = serde_json::json!(999);
        assert!(matches!(
            Finalized::from_json(&value.to_string()),
            Err(CodecError::PayloadSizeMismatch { declared: 999, actual: 41 })
        ));
    }
}
