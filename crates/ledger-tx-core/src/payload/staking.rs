//! Validator and delegator configuration.
//!
//! Both payloads start with a u16 bitmap naming which optional fields follow.
//! Fields appear in bit order. Bits outside the known set are rejected.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use super::{PayloadBody, PayloadKind};
use crate::error::{CodecError, Result};
use crate::types::{hex_bytes, u64_string};
use crate::wire::{put_u16_prefixed, Cursor};

/// Collects present fields while encoding a bitmap payload.
struct BitmapWriter {
    bitmap: u16,
    body: Vec<u8>,
}

impl BitmapWriter {
    fn new() -> Self {
        Self {
            bitmap: 0,
            body: Vec::new(),
        }
    }

    fn field<T: ?Sized>(
        &mut self,
        bit: u16,
        value: Option<&T>,
        write: impl FnOnce(&mut Vec<u8>, &T) -> Result<()>,
    ) -> Result<()> {
        if let Some(value) = value {
            self.bitmap |= bit;
            write(&mut self.body, value)?;
        }
        Ok(())
    }

    fn finish(self, buf: &mut Vec<u8>) {
        buf.put_u16(self.bitmap);
        buf.put_slice(&self.body);
    }
}

fn read_bitmap(cursor: &mut Cursor<'_>, known: u16, what: &str) -> Result<u16> {
    let bitmap = cursor.read_u16()?;
    if bitmap & !known != 0 {
        return Err(CodecError::InvalidPayload(format!(
            "{what}: unknown bitmap bits {:#06x}",
            bitmap & !known
        )));
    }
    Ok(bitmap)
}

fn read_if<T>(
    bitmap: u16,
    bit: u16,
    cursor: &mut Cursor<'_>,
    read: impl FnOnce(&mut Cursor<'_>) -> Result<T>,
) -> Result<Option<T>> {
    if bitmap & bit != 0 {
        read(cursor).map(Some)
    } else {
        Ok(None)
    }
}

fn put_u64(buf: &mut Vec<u8>, v: &u64) -> Result<()> {
    buf.put_u64(*v);
    Ok(())
}

fn put_u32(buf: &mut Vec<u8>, v: &u32) -> Result<()> {
    buf.put_u32(*v);
    Ok(())
}

fn put_bool(buf: &mut Vec<u8>, v: &bool) -> Result<()> {
    buf.put_u8(u8::from(*v));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Delegation
// ─────────────────────────────────────────────────────────────────────────────

const DELEGATION_STAKE: u16 = 1 << 0;
const DELEGATION_RESTAKE: u16 = 1 << 1;
const DELEGATION_TARGET: u16 = 1 << 2;
const DELEGATION_KNOWN: u16 = DELEGATION_STAKE | DELEGATION_RESTAKE | DELEGATION_TARGET;

/// Where delegated stake goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "delegateType", rename_all = "camelCase")]
pub enum DelegationTarget {
    /// Passive delegation across all validators.
    Passive,
    #[serde(rename_all = "camelCase")]
    Validator {
        #[serde(with = "u64_string")]
        validator_id: u64,
    },
}

impl DelegationTarget {
    fn write(buf: &mut Vec<u8>, target: &Self) -> Result<()> {
        match target {
            DelegationTarget::Passive => buf.put_u8(0),
            DelegationTarget::Validator { validator_id } => {
                buf.put_u8(1);
                buf.put_u64(*validator_id);
            }
        }
        Ok(())
    }

    fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
        match cursor.read_u8()? {
            0 => Ok(DelegationTarget::Passive),
            1 => Ok(DelegationTarget::Validator {
                validator_id: cursor.read_u64()?,
            }),
            tag => Err(CodecError::InvalidPayload(format!(
                "invalid delegation target tag {tag}"
            ))),
        }
    }
}

/// Add, update or remove a delegator. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureDelegation {
    #[serde(default, with = "u64_string::option", skip_serializing_if = "Option::is_none")]
    pub stake: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restake_earnings: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation_target: Option<DelegationTarget>,
}

impl PayloadBody for ConfigureDelegation {
    const KIND: PayloadKind = PayloadKind::ConfigureDelegation;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut w = BitmapWriter::new();
        w.field(DELEGATION_STAKE, self.stake.as_ref(), put_u64)?;
        w.field(DELEGATION_RESTAKE, self.restake_earnings.as_ref(), put_bool)?;
        w.field(
            DELEGATION_TARGET,
            self.delegation_target.as_ref(),
            DelegationTarget::write,
        )?;
        w.finish(buf);
        Ok(())
    }

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self> {
        let bitmap = read_bitmap(cursor, DELEGATION_KNOWN, "configure delegation")?;
        Ok(Self {
            stake: read_if(bitmap, DELEGATION_STAKE, cursor, |c| c.read_u64())?,
            restake_earnings: read_if(bitmap, DELEGATION_RESTAKE, cursor, |c| c.read_bool())?,
            delegation_target: read_if(bitmap, DELEGATION_TARGET, cursor, DelegationTarget::read)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validator
// ─────────────────────────────────────────────────────────────────────────────

const VALIDATOR_STAKE: u16 = 1 << 0;
const VALIDATOR_RESTAKE: u16 = 1 << 1;
const VALIDATOR_OPEN_STATUS: u16 = 1 << 2;
const VALIDATOR_KEYS: u16 = 1 << 3;
const VALIDATOR_METADATA_URL: u16 = 1 << 4;
const VALIDATOR_TRANSACTION_FEE: u16 = 1 << 5;
const VALIDATOR_BAKING_REWARD: u16 = 1 << 6;
const VALIDATOR_FINALIZATION_REWARD: u16 = 1 << 7;
const VALIDATOR_SUSPENDED: u16 = 1 << 8;
const VALIDATOR_KNOWN: u16 = (1 << 9) - 1;

/// Whether a validator pool accepts delegators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum OpenStatus {
    OpenForAll = 0,
    ClosedForNew = 1,
    ClosedForAll = 2,
}

impl OpenStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::OpenForAll),
            1 => Some(Self::ClosedForNew),
            2 => Some(Self::ClosedForAll),
            _ => None,
        }
    }

    fn write(buf: &mut Vec<u8>, status: &Self) -> Result<()> {
        buf.put_u8(*status as u8);
        Ok(())
    }

    fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
        let byte = cursor.read_u8()?;
        Self::from_u8(byte)
            .ok_or_else(|| CodecError::InvalidPayload(format!("invalid open status {byte}")))
    }
}

pub const ELECTION_KEY_LEN: usize = 32;
pub const SIGNATURE_KEY_LEN: usize = 32;
pub const AGGREGATION_KEY_LEN: usize = 96;
pub const KEY_PROOF_LEN: usize = 64;

/// Validator verification keys with their proofs of possession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorKeys {
    #[serde(with = "hex_bytes")]
    pub election_verify_key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub proof_election: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub signature_verify_key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub proof_sig: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub aggregation_verify_key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub proof_aggregation: Vec<u8>,
}

impl ValidatorKeys {
    fn parts(&self) -> [(&'static str, &[u8], usize); 6] {
        [
            ("election key", self.election_verify_key.as_slice(), ELECTION_KEY_LEN),
            ("election proof", self.proof_election.as_slice(), KEY_PROOF_LEN),
            ("signature key", self.signature_verify_key.as_slice(), SIGNATURE_KEY_LEN),
            ("signature proof", self.proof_sig.as_slice(), KEY_PROOF_LEN),
            ("aggregation key", self.aggregation_verify_key.as_slice(), AGGREGATION_KEY_LEN),
            ("aggregation proof", self.proof_aggregation.as_slice(), KEY_PROOF_LEN),
        ]
    }

    fn write(buf: &mut Vec<u8>, keys: &Self) -> Result<()> {
        for (what, bytes, len) in keys.parts() {
            if bytes.len() != len {
                return Err(CodecError::InvalidPayload(format!(
                    "{what} must be {len} bytes, got {}",
                    bytes.len()
                )));
            }
            buf.put_slice(bytes);
        }
        Ok(())
    }

    fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            election_verify_key: cursor.read_bytes(ELECTION_KEY_LEN)?.to_vec(),
            proof_election: cursor.read_bytes(KEY_PROOF_LEN)?.to_vec(),
            signature_verify_key: cursor.read_bytes(SIGNATURE_KEY_LEN)?.to_vec(),
            proof_sig: cursor.read_bytes(KEY_PROOF_LEN)?.to_vec(),
            aggregation_verify_key: cursor.read_bytes(AGGREGATION_KEY_LEN)?.to_vec(),
            proof_aggregation: cursor.read_bytes(KEY_PROOF_LEN)?.to_vec(),
        })
    }
}

/// Add, update or remove a validator. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureValidator {
    #[serde(default, with = "u64_string::option", skip_serializing_if = "Option::is_none")]
    pub stake: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restake_earnings: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_for_delegation: Option<OpenStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<ValidatorKeys>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
    /// Commission rates in parts per hundred thousand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_fee_commission: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baking_reward_commission: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalization_reward_commission: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
}

impl PayloadBody for ConfigureValidator {
    const KIND: PayloadKind = PayloadKind::ConfigureValidator;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut w = BitmapWriter::new();
        w.field(VALIDATOR_STAKE, self.stake.as_ref(), put_u64)?;
        w.field(VALIDATOR_RESTAKE, self.restake_earnings.as_ref(), put_bool)?;
        w.field(
            VALIDATOR_OPEN_STATUS,
            self.open_for_delegation.as_ref(),
            OpenStatus::write,
        )?;
        w.field(VALIDATOR_KEYS, self.keys.as_ref(), ValidatorKeys::write)?;
        w.field(
            VALIDATOR_METADATA_URL,
            self.metadata_url.as_deref(),
            |buf, url: &str| put_u16_prefixed(buf, url.as_bytes()),
        )?;
        w.field(
            VALIDATOR_TRANSACTION_FEE,
            self.transaction_fee_commission.as_ref(),
            put_u32,
        )?;
        w.field(
            VALIDATOR_BAKING_REWARD,
            self.baking_reward_commission.as_ref(),
            put_u32,
        )?;
        w.field(
            VALIDATOR_FINALIZATION_REWARD,
            self.finalization_reward_commission.as_ref(),
            put_u32,
        )?;
        w.field(VALIDATOR_SUSPENDED, self.suspended.as_ref(), put_bool)?;
        w.finish(buf);
        Ok(())
    }

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self> {
        let bitmap = read_bitmap(cursor, VALIDATOR_KNOWN, "configure validator")?;
        Ok(Self {
            stake: read_if(bitmap, VALIDATOR_STAKE, cursor, |c| c.read_u64())?,
            restake_earnings: read_if(bitmap, VALIDATOR_RESTAKE, cursor, |c| c.read_bool())?,
            open_for_delegation: read_if(bitmap, VALIDATOR_OPEN_STATUS, cursor, OpenStatus::read)?,
            keys: read_if(bitmap, VALIDATOR_KEYS, cursor, ValidatorKeys::read)?,
            metadata_url: read_if(bitmap, VALIDATOR_METADATA_URL, cursor, |c| {
                c.read_u16_string()
            })?,
            transaction_fee_commission: read_if(bitmap, VALIDATOR_TRANSACTION_FEE, cursor, |c| {
                c.read_u32()
            })?,
            baking_reward_commission: read_if(bitmap, VALIDATOR_BAKING_REWARD, cursor, |c| {
                c.read_u32()
            })?,
            finalization_reward_commission: read_if(
                bitmap,
                VALIDATOR_FINALIZATION_REWARD,
                cursor,
                |c| c.read_u32(),
            )?,
            suspended: read_if(bitmap, VALIDATOR_SUSPENDED, cursor, |c| c.read_bool())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyParams;
    use crate::payload::Payload;

    fn keys() -> ValidatorKeys {
        ValidatorKeys {
            election_verify_key: vec![1; ELECTION_KEY_LEN],
            proof_election: vec![2; KEY_PROOF_LEN],
            signature_verify_key: vec![3; SIGNATURE_KEY_LEN],
            proof_sig: vec![4; KEY_PROOF_LEN],
            aggregation_verify_key: vec![5; AGGREGATION_KEY_LEN],
            proof_aggregation: vec![6; KEY_PROOF_LEN],
        }
    }

    #[test]
    fn test_delegation_bytes() {
        let payload = Payload::ConfigureDelegation(ConfigureDelegation {
            stake: Some(1000),
            restake_earnings: Some(true),
            delegation_target: Some(DelegationTarget::Validator { validator_id: 7 }),
        });
        let bytes = payload.serialize().unwrap();
        assert_eq!(
            hex::encode(&bytes),
            "1a000700000000000003e801010000000000000007"
        );
        assert_eq!(Payload::deserialize(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_delegation_partial() {
        let payload = Payload::ConfigureDelegation(ConfigureDelegation {
            delegation_target: Some(DelegationTarget::Passive),
            ..Default::default()
        });
        let bytes = payload.serialize().unwrap();
        assert_eq!(bytes, vec![26, 0x00, 0x04, 0x00]);
        assert_eq!(Payload::deserialize(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_delegation_unknown_bits() {
        assert!(matches!(
            Payload::deserialize(&[26, 0x00, 0x08]),
            Err(CodecError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_delegation_bad_target_tag() {
        assert!(matches!(
            Payload::deserialize(&[26, 0x00, 0x04, 0x02]),
            Err(CodecError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_validator_full_roundtrip() {
        let body = ConfigureValidator {
            stake: Some(u64::MAX),
            restake_earnings: Some(false),
            open_for_delegation: Some(OpenStatus::ClosedForNew),
            keys: Some(keys()),
            metadata_url: Some("https://example.com/validator".into()),
            transaction_fee_commission: Some(10_000),
            baking_reward_commission: Some(5_000),
            finalization_reward_commission: Some(100_000),
            suspended: Some(false),
        };
        let payload = Payload::ConfigureValidator(body);
        let bytes = payload.serialize().unwrap();
        assert_eq!(&bytes[..3], &[25, 0x01, 0xff]);
        assert_eq!(bytes.len() as u32, payload.size_of().unwrap());
        assert_eq!(Payload::deserialize(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_validator_energy_depends_on_keys() {
        let params = EnergyParams::default();
        let mut body = ConfigureValidator {
            suspended: Some(true),
            ..Default::default()
        };
        let cost = Payload::ConfigureValidator(body.clone()).specific_cost(&params);
        assert_eq!(cost.unwrap(), Some(300));
        body.keys = Some(keys());
        let cost = Payload::ConfigureValidator(body).specific_cost(&params);
        assert_eq!(cost.unwrap(), Some(4050));
    }

    #[test]
    fn test_validator_bad_key_length() {
        let mut bad = keys();
        bad.aggregation_verify_key.pop();
        let payload = Payload::ConfigureValidator(ConfigureValidator {
            keys: Some(bad),
            ..Default::default()
        });
        assert!(matches!(
            payload.serialize(),
            Err(CodecError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_validator_unknown_bits_and_bad_bool() {
        assert!(Payload::deserialize(&[25, 0x02, 0x00]).is_err());
        assert!(matches!(
            Payload::deserialize(&[25, 0x00, 0x02, 0x02]),
            Err(CodecError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_validator_json() {
        let payload = Payload::ConfigureValidator(ConfigureValidator {
            stake: Some(5),
            open_for_delegation: Some(OpenStatus::OpenForAll),
            ..Default::default()
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "configureBaker");
        assert_eq!(json["stake"], "5");
        assert_eq!(json["openForDelegation"], "openForAll");
        assert!(json.get("keys").is_none());
        assert_eq!(serde_json::from_value::<Payload>(json).unwrap(), payload);
    }
}
