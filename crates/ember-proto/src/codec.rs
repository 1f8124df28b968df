//! Protocol encoding/decoding traits and helpers.

use bytes::{Buf, BufMut};

use crate::error::ProtoError;
use crate::types::VarInt;

/// Encode a value onto a buffer.
pub trait ProtoEncode {
    fn proto_encode(&self, buf: &mut impl BufMut);
}

/// Decode a value from a buffer.
pub trait ProtoDecode: Sized {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError>;
}

/// Fail with `BufferTooShort` unless `needed` bytes remain.
pub fn ensure(buf: &impl Buf, needed: usize) -> Result<(), ProtoError> {
    if buf.remaining() < needed {
        return Err(ProtoError::BufferTooShort {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

/// Write a protocol string (VarInt byte length + UTF-8).
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    VarInt(s.len() as i32).proto_encode(buf);
    buf.put_slice(s.as_bytes());
}

/// Read a protocol string, rejecting more than `max_chars` characters.
pub fn read_string(buf: &mut impl Buf, max_chars: usize) -> Result<String, ProtoError> {
    let len = VarInt::proto_decode(buf)?.0;
    if len < 0 {
        return Err(ProtoError::NegativeLength(len));
    }
    let len = len as usize;
    // A UTF-8 char is at most 4 bytes.
    if len > max_chars.saturating_mul(4) {
        return Err(ProtoError::StringTooLong {
            len,
            max: max_chars,
        });
    }
    ensure(buf, len)?;
    let data = buf.copy_to_bytes(len);
    let s = String::from_utf8(data.to_vec()).map_err(|_| ProtoError::InvalidUtf8)?;
    let chars = s.chars().count();
    if chars > max_chars {
        return Err(ProtoError::StringTooLong {
            len: chars,
            max: max_chars,
        });
    }
    Ok(s)
}

/// Write a byte array prefixed by its length as a big-endian `i16`.
pub fn write_short_bytes(buf: &mut impl BufMut, data: &[u8]) {
    buf.put_i16(data.len() as i16);
    buf.put_slice(data);
}

/// Read a byte array prefixed by a big-endian `i16` length.
pub fn read_short_bytes(buf: &mut impl Buf) -> Result<Vec<u8>, ProtoError> {
    ensure(buf, 2)?;
    let len = buf.get_i16();
    if len < 0 {
        return Err(ProtoError::NegativeLength(len as i32));
    }
    ensure(buf, len as usize)?;
    Ok(buf.copy_to_bytes(len as usize).to_vec())
}

/// Write a boolean as a single byte.
pub fn write_bool(buf: &mut impl BufMut, v: bool) {
    buf.put_u8(v as u8);
}

pub fn read_bool(buf: &mut impl Buf) -> Result<bool, ProtoError> {
    ensure(buf, 1)?;
    Ok(buf.get_u8() != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn string_roundtrip() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "Hello, Steve!");
        let result = read_string(&mut buf.freeze(), 32767).unwrap();
        assert_eq!(result, "Hello, Steve!");
    }

    #[test]
    fn string_limit_counts_characters() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "日本語");
        // 9 bytes but only 3 characters
        assert_eq!(read_string(&mut buf.clone().freeze(), 3).unwrap(), "日本語");
        assert!(matches!(
            read_string(&mut buf.freeze(), 2),
            Err(ProtoError::StringTooLong { .. })
        ));
    }

    #[test]
    fn string_negative_length() {
        let mut buf = BytesMut::new();
        VarInt(-1).proto_encode(&mut buf);
        assert!(matches!(
            read_string(&mut buf.freeze(), 16),
            Err(ProtoError::NegativeLength(-1))
        ));
    }

    #[test]
    fn string_buffer_too_short() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "Hello");
        let truncated = buf.freeze().slice(..3);
        assert!(read_string(&mut truncated.clone(), 16).is_err());
    }

    #[test]
    fn short_bytes_layout() {
        let mut buf = BytesMut::new();
        write_short_bytes(&mut buf, &[1, 2, 3]);
        assert_eq!(&buf[..], &[0x00, 0x03, 1, 2, 3]);
        assert_eq!(read_short_bytes(&mut buf.freeze()).unwrap(), vec![1, 2, 3]);
    }
}
