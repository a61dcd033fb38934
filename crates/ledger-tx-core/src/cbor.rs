//! Deterministic CBOR encoding for token operations.
//!
//! Encoding follows RFC 8949 core deterministic rules:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! Decoding goes through `ciborium` into a [`Value`] tree which the token
//! types then pattern-match.

use ciborium::value::{Integer, Value};

use crate::error::{CodecError, Result};

/// Encode a CBOR value to deterministic bytes.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Decode exactly one CBOR item; trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let mut reader = bytes;
    let value: Value = ciborium::from_reader(&mut reader)
        .map_err(|e| CodecError::InvalidCborShape(format!("malformed CBOR: {e}")))?;
    if !reader.is_empty() {
        return Err(CodecError::BufferNotExhausted(reader.len()));
    }
    Ok(value)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Tag(tag, inner) => {
            encode_uint(buf, 6, *tag);
            encode_value_to(buf, inner)?;
        }
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CodecError::InvalidCborShape(
                "floats not supported in deterministic encoding".into(),
            ))
        }
        _ => {
            return Err(CodecError::InvalidCborShape(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // -1 encodes as 0, -2 as 1, ...
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned argument with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map with keys sorted by their encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    if pairs.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(CodecError::InvalidCborShape("duplicate map key".into()));
    }

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Value accessors
// ─────────────────────────────────────────────────────────────────────────────

/// Unwrap a tagged value, checking the tag number.
pub(crate) fn untag(value: &Value, expected: u64) -> Result<&Value> {
    match value {
        Value::Tag(tag, inner) if *tag == expected => Ok(inner),
        Value::Tag(tag, _) => Err(CodecError::InvalidCborTag {
            expected,
            got: Some(*tag),
        }),
        _ => Err(CodecError::InvalidCborTag {
            expected,
            got: None,
        }),
    }
}

pub(crate) fn as_map<'a>(value: &'a Value, what: &str) -> Result<&'a [(Value, Value)]> {
    match value {
        Value::Map(entries) => Ok(entries),
        _ => Err(CodecError::InvalidCborShape(format!("{what}: expected map"))),
    }
}

pub(crate) fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(i) => u64::try_from(*i).ok(),
        _ => None,
    }
}

/// Integer map key, if the key is a non-negative integer.
pub(crate) fn int_key(key: &Value) -> Option<u64> {
    as_u64(key)
}

pub(crate) fn text_key(key: &Value) -> Option<&str> {
    match key {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

pub(crate) fn uint(n: u64) -> Value {
    Value::Integer(n.into())
}

pub(crate) fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 40307);
        assert_eq!(buf, vec![0x19, 0x9d, 0x73]);

        buf.clear();
        encode_uint(&mut buf, 0, u64::MAX);
        assert_eq!(buf, vec![0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_negative_integer_encoding() {
        assert_eq!(encode(&Value::Integer((-1).into())).unwrap(), vec![0x20]);
        assert_eq!(encode(&Value::Integer((-6).into())).unwrap(), vec![0x25]);
        assert_eq!(encode(&Value::Integer((-25).into())).unwrap(), vec![0x38, 24]);
    }

    #[test]
    fn test_map_key_ordering() {
        let value = Value::Map(vec![
            (text("recipient"), uint(1)),
            (text("amount"), uint(2)),
            (text("memo"), uint(3)),
        ]);
        let bytes = encode(&value).unwrap();
        // Shorter text keys sort first because the length is in the header byte.
        assert_eq!(bytes[0], 0xa3);
        assert_eq!(&bytes[1..6], &[0x64, b'm', b'e', b'm', b'o']);
        assert_eq!(bytes[6], 0x03);
        assert_eq!(bytes[7], 0x66);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let value = Value::Map(vec![(uint(1), uint(1)), (uint(1), uint(2))]);
        assert!(matches!(encode(&value), Err(CodecError::InvalidCborShape(_))));
    }

    #[test]
    fn test_floats_rejected() {
        assert!(encode(&Value::Float(1.5)).is_err());
    }

    #[test]
    fn test_tag_roundtrip_through_ciborium() {
        let value = Value::Tag(24, Box::new(Value::Bytes(vec![0x61, 0x61])));
        let bytes = encode(&value).unwrap();
        assert_eq!(bytes, vec![0xd8, 0x18, 0x42, 0x61, 0x61]);
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_decode_trailing_bytes() {
        assert!(matches!(
            decode(&[0x01, 0x02]),
            Err(CodecError::BufferNotExhausted(1))
        ));
    }

    #[test]
    fn test_untag_errors() {
        let value = Value::Tag(4, Box::new(uint(1)));
        assert!(untag(&value, 4).is_ok());
        assert!(matches!(
            untag(&value, 5),
            Err(CodecError::InvalidCborTag { expected: 5, got: Some(4) })
        ));
        assert!(matches!(
            untag(&uint(1), 5),
            Err(CodecError::InvalidCborTag { got: None, .. })
        ));
    }
}
