//! Big-endian primitives shared by the binary codecs.
//!
//! Writers append to a `Vec<u8>` through [`bytes::BufMut`]. Readers go through
//! [`Cursor`], which bounds-checks every read so truncated input surfaces as
//! [`CodecError::UnexpectedEnd`] rather than a panic.

use bytes::{Buf, BufMut};

use crate::error::{CodecError, Result};

/// A bounds-checked reader over a byte slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.len() < needed {
            return Err(CodecError::UnexpectedEnd {
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64())
    }

    /// Read a strict boolean byte (0 or 1).
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(CodecError::InvalidPayload(format!("invalid bool byte {b}"))),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(bytes);
        Ok(arr)
    }

    /// Read a buffer prefixed with a u16 length.
    pub fn read_u16_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u16()? as usize;
        self.read_bytes(len)
    }

    /// Read a buffer prefixed with a u32 length.
    pub fn read_u32_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    /// Read UTF-8 text prefixed with a u16 length.
    pub fn read_u16_string(&mut self) -> Result<String> {
        let bytes = self.read_u16_prefixed()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::InvalidPayload(format!("invalid utf-8: {e}")))
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(CodecError::BufferNotExhausted(self.buf.len()))
        }
    }
}

/// Write a buffer with a u16 length prefix.
pub fn put_u16_prefixed(buf: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = u16::try_from(data.len())
        .map_err(|_| CodecError::InvalidPayload(format!("{} bytes exceed u16 length", data.len())))?;
    buf.put_u16(len);
    buf.put_slice(data);
    Ok(())
}

/// Write a buffer with a u32 length prefix.
pub fn put_u32_prefixed(buf: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| CodecError::InvalidPayload(format!("{} bytes exceed u32 length", data.len())))?;
    buf.put_u32(len);
    buf.put_slice(data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_reads_big_endian() {
        let data = [0x01, 0x02, 0x00, 0x00, 0x00, 0x2a, 0xff];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_u16().unwrap(), 0x0102);
        assert_eq!(cursor.read_u32().unwrap(), 42);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_cursor_truncated() {
        let data = [0x00, 0x01];
        let mut cursor = Cursor::new(&data);
        match cursor.read_u64() {
            Err(CodecError::UnexpectedEnd { needed, remaining }) => {
                assert_eq!(needed, 8);
                assert_eq!(remaining, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_cursor_finish_rejects_trailing() {
        let data = [0x00, 0x01];
        let mut cursor = Cursor::new(&data);
        cursor.read_u8().unwrap();
        assert!(matches!(cursor.finish(), Err(CodecError::BufferNotExhausted(1))));
    }

    #[test]
    fn test_strict_bool() {
        let data = [0x01, 0x00, 0x02];
        let mut cursor = Cursor::new(&data);
        assert!(cursor.read_bool().unwrap());
        assert!(!cursor.read_bool().unwrap());
        assert!(cursor.read_bool().is_err());
    }

    #[test]
    fn test_u16_prefixed_roundtrip() {
        let mut buf = Vec::new();
        put_u16_prefixed(&mut buf, b"hello").unwrap();
        assert_eq!(&buf[..2], &[0x00, 0x05]);
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_u16_prefixed().unwrap(), b"hello");
        cursor.finish().unwrap();
    }
}
