//! On-chain data registration.

use serde::{Deserialize, Serialize};

use super::{PayloadBody, PayloadKind, MAX_DATA_SIZE};
use crate::error::{CodecError, Result};
use crate::types::hex_bytes;
use crate::wire::{put_u16_prefixed, Cursor};

/// Register up to 256 bytes of arbitrary data.
///
/// Body: `len(u16) || data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterData {
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl RegisterData {
    pub fn new(data: Vec<u8>) -> Result<Self> {
        check_len(&data)?;
        Ok(Self { data })
    }
}

fn check_len(data: &[u8]) -> Result<()> {
    if data.len() > MAX_DATA_SIZE {
        return Err(CodecError::InvalidPayload(format!(
            "data of {} bytes exceeds {MAX_DATA_SIZE}",
            data.len()
        )));
    }
    Ok(())
}

impl PayloadBody for RegisterData {
    const KIND: PayloadKind = PayloadKind::RegisterData;

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        check_len(&self.data)?;
        put_u16_prefixed(buf, &self.data)
    }

    fn read_body(cursor: &mut Cursor<'_>) -> Result<Self> {
        let data = cursor.read_u16_prefixed()?;
        check_len(data)?;
        Ok(Self {
            data: data.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;

    #[test]
    fn test_register_data_bytes() {
        let payload = Payload::RegisterData(RegisterData::new(vec![0xca, 0xfe]).unwrap());
        let bytes = payload.serialize().unwrap();
        assert_eq!(bytes, vec![21, 0x00, 0x02, 0xca, 0xfe]);
        assert_eq!(Payload::deserialize(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_register_data_limit() {
        assert!(RegisterData::new(vec![0; MAX_DATA_SIZE]).is_ok());
        assert!(RegisterData::new(vec![0; MAX_DATA_SIZE + 1]).is_err());

        let mut bytes = vec![21, 0x01, 0x01];
        bytes.extend(vec![0u8; 257]);
        assert!(matches!(
            Payload::deserialize(&bytes),
            Err(CodecError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_register_data_json() {
        let json = r#"{"type":"registerData","data":"cafe"}"#;
        let payload = Payload::from_json(json).unwrap();
        assert_eq!(payload, Payload::RegisterData(RegisterData { data: vec![0xca, 0xfe] }));
        assert_eq!(payload.to_json().unwrap(), json);
    }
}
