//! Smart contract payloads: module deployment, initialization and update.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use super::{PayloadBody, PayloadKind};
use crate::error::{CodecError, Result};
use crate::types::{hex_bytes, u64_string, ContractAddress, ModuleReference};
use crate::wire::{put_u16_prefixed, put_u32_prefixed, Cursor};

/// Deploy a Wasm module.
///
/// Body: `version(u32) || len(u32) || source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployModule {
    pub version: u32,
    #[serde(with = "hex_bytes")]
    pub source: Vec<u8>,
}

impl PayloadBody for DeployModule {
    const KIND: PayloadKind = PayloadKind::DeployModule;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.put_u32(self.version);
        put_u32_prefixed(buf, &self.source)
    }

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            version: cursor.read_u32()?,
            source: cursor.read_u32_prefixed()?.to_vec(),
        })
    }
}

fn check_init_name(name: &str) -> Result<()> {
    if !name.starts_with("init_") {
        return Err(CodecError::InvalidPayload(format!(
            "init name {name:?} must start with \"init_\""
        )));
    }
    Ok(())
}

fn check_receive_name(name: &str) -> Result<()> {
    if !name.contains('.') {
        return Err(CodecError::InvalidPayload(format!(
            "receive name {name:?} must have the form \"contract.entrypoint\""
        )));
    }
    Ok(())
}

/// Create a contract instance from a deployed module.
///
/// Body: `amount(u64) || module(32) || init_name(u16 len + utf8) || param(u16 len + bytes)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitContract {
    #[serde(with = "u64_string")]
    pub amount: u64,
    pub module_ref: ModuleReference,
    pub init_name: String,
    #[serde(with = "hex_bytes")]
    pub param: Vec<u8>,
}

impl PayloadBody for InitContract {
    const KIND: PayloadKind = PayloadKind::InitContract;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        check_init_name(&self.init_name)?;
        buf.put_u64(self.amount);
        buf.put_slice(&self.module_ref.0);
        put_u16_prefixed(buf, self.init_name.as_bytes())?;
        put_u16_prefixed(buf, &self.param)
    }

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self> {
        let amount = cursor.read_u64()?;
        let module_ref = ModuleReference(cursor.read_array()?);
        let init_name = cursor.read_u16_string()?;
        check_init_name(&init_name)?;
        Ok(Self {
            amount,
            module_ref,
            init_name,
            param: cursor.read_u16_prefixed()?.to_vec(),
        })
    }
}

/// Invoke a receive function on a contract instance.
///
/// Body: `amount(u64) || index(u64) || subindex(u64) || receive_name(u16 len + utf8) || message(u16 len + bytes)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContract {
    #[serde(with = "u64_string")]
    pub amount: u64,
    pub address: ContractAddress,
    pub receive_name: String,
    #[serde(with = "hex_bytes")]
    pub message: Vec<u8>,
}

impl PayloadBody for UpdateContract {
    const KIND: PayloadKind = PayloadKind::UpdateContract;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        check_receive_name(&self.receive_name)?;
        buf.put_u64(self.amount);
        buf.put_u64(self.address.index);
        buf.put_u64(self.address.subindex);
        put_u16_prefixed(buf, self.receive_name.as_bytes())?;
        put_u16_prefixed(buf, &self.message)
    }

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self> {
        let amount = cursor.read_u64()?;
        let address = ContractAddress::new(cursor.read_u64()?, cursor.read_u64()?);
        let receive_name = cursor.read_u16_string()?;
        check_receive_name(&receive_name)?;
        Ok(Self {
            amount,
            address,
            receive_name,
            message: cursor.read_u16_prefixed()?.to_vec(),
        })
    }
}
