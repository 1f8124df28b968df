//! Base data types used throughout the Java Edition protocol.

use std::fmt;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{ensure, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VarIntError {
    #[error("buffer too short")]
    BufferTooShort,
    #[error("VarInt is too long (more than {max_bytes} bytes)")]
    TooManyBytes { max_bytes: usize },
}

// ---------------------------------------------------------------------------
// VarInt (i32, plain LEB128 over the two's complement bits, no ZigZag)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarInt(pub i32);

impl VarInt {
    /// Maximum bytes a VarInt can occupy.
    pub const MAX_BYTES: usize = 5;

    /// Number of bytes `value` occupies on the wire.
    pub fn encoded_len(value: i32) -> usize {
        let mut value = value as u32;
        let mut len = 1;
        while value & !0x7F != 0 {
            value >>= 7;
            len += 1;
        }
        len
    }

    /// Encode into the provided buffer and return the number of bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let mut value = self.0 as u32;
        let mut written = 0;
        loop {
            if value & !0x7F == 0 {
                buf.push(value as u8);
                written += 1;
                return written;
            }
            buf.push((value & 0x7F | 0x80) as u8);
            value >>= 7;
            written += 1;
        }
    }

    /// Decode from a byte slice. Returns the value and the number of bytes consumed.
    ///
    /// `BufferTooShort` means the slice ends mid-VarInt and more input may
    /// complete it; `TooManyBytes` means the input is malformed.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), VarIntError> {
        let mut result: u32 = 0;
        let mut shift: u32 = 0;
        for (i, &byte) in buf.iter().enumerate() {
            if i >= Self::MAX_BYTES {
                return Err(VarIntError::TooManyBytes {
                    max_bytes: Self::MAX_BYTES,
                });
            }
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok((VarInt(result as i32), i + 1));
            }
            shift += 7;
        }
        if buf.len() >= Self::MAX_BYTES {
            return Err(VarIntError::TooManyBytes {
                max_bytes: Self::MAX_BYTES,
            });
        }
        Err(VarIntError::BufferTooShort)
    }
}

impl ProtoEncode for VarInt {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        let mut value = self.0 as u32;
        loop {
            if value & !0x7F == 0 {
                buf.put_u8(value as u8);
                return;
            }
            buf.put_u8((value & 0x7F | 0x80) as u8);
            value >>= 7;
        }
    }
}

impl ProtoDecode for VarInt {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let mut result: u32 = 0;
        let mut shift: u32 = 0;
        for _ in 0..Self::MAX_BYTES {
            if !buf.has_remaining() {
                return Err(VarIntError::BufferTooShort.into());
            }
            let byte = buf.get_u8();
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(VarInt(result as i32));
            }
            shift += 7;
        }
        Err(VarIntError::TooManyBytes {
            max_bytes: Self::MAX_BYTES,
        }
        .into())
    }
}

impl From<i32> for VarInt {
    fn from(v: i32) -> Self {
        VarInt(v)
    }
}

impl From<VarInt> for i32 {
    fn from(v: VarInt) -> Self {
        v.0
    }
}

impl fmt::Debug for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarInt({})", self.0)
    }
}

impl fmt::Display for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Uuid
// ---------------------------------------------------------------------------

/// 128-bit player id. Sent as a hyphenated string during login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uuid {
    pub most_significant: u64,
    pub least_significant: u64,
}

impl Uuid {
    pub const ZERO: Self = Self {
        most_significant: 0,
        least_significant: 0,
    };

    pub fn new(most: u64, least: u64) -> Self {
        Self {
            most_significant: most,
            least_significant: least,
        }
    }

    pub fn from_bytes(b: [u8; 16]) -> Self {
        let mut most = [0u8; 8];
        let mut least = [0u8; 8];
        most.copy_from_slice(&b[..8]);
        least.copy_from_slice(&b[8..]);
        Self::new(u64::from_be_bytes(most), u64::from_be_bytes(least))
    }

    /// Parse the hyphenated (or plain 32-digit) hex form.
    pub fn parse(s: &str) -> Option<Self> {
        let hex: String = s.chars().filter(|&c| c != '-').collect();
        if hex.len() != 32 {
            return None;
        }
        let most = u64::from_str_radix(&hex[..16], 16).ok()?;
        let least = u64::from_str_radix(&hex[16..], 16).ok()?;
        Some(Self::new(most, least))
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.most_significant;
        let l = self.least_significant;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            m >> 32,
            (m >> 16) & 0xFFFF,
            m & 0xFFFF,
            l >> 48,
            l & 0xFFFF_FFFF_FFFF,
        )
    }
}

// ---------------------------------------------------------------------------
// BlockPos (i32 x, u8 y, i32 z on the wire)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Convert to the chunk position that contains this block.
    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }
}

/// Wire format used by digging and placement: `i32 x, u8 y, i32 z`.
impl ProtoEncode for BlockPos {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.x);
        buf.put_u8(self.y as u8);
        buf.put_i32(self.z);
    }
}

impl ProtoDecode for BlockPos {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 9)?;
        let x = buf.get_i32();
        let y = buf.get_u8() as i32;
        let z = buf.get_i32();
        Ok(Self { x, y, z })
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// ChunkPos (i32 x, z)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the given world-space coordinates.
    pub fn containing(x: f64, z: f64) -> Self {
        Self::new((x.floor() as i32) >> 4, (z.floor() as i32) >> 4)
    }

    /// Chebyshev (square) distance in chunk units.
    pub fn chebyshev_distance(&self, other: &ChunkPos) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// Squared Euclidean distance in chunk units.
    pub fn distance_squared(&self, other: &ChunkPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

// ---------------------------------------------------------------------------
// Position (player feet position + look)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    #[serde(default)]
    pub on_ground: bool,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
            on_ground: true,
        }
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::containing(self.x, self.z)
    }

    pub fn block_pos(&self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0.5, 64.0, 0.5)
    }
}

// ---------------------------------------------------------------------------
// Slot (item stack record)
// ---------------------------------------------------------------------------

/// An inventory slot as carried by click/placement/creative frames.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Slot {
    /// Item id, or `-1` for an empty slot.
    pub id: i16,
    pub count: i8,
    pub damage: i16,
    /// Gzipped NBT blob, empty when absent.
    pub nbt: Vec<u8>,
}

impl Slot {
    pub const EMPTY: Self = Self {
        id: -1,
        count: 0,
        damage: 0,
        nbt: Vec::new(),
    };

    pub fn is_empty(&self) -> bool {
        self.id < 0
    }
}

impl ProtoEncode for Slot {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i16(self.id);
        if self.is_empty() {
            return;
        }
        buf.put_i8(self.count);
        buf.put_i16(self.damage);
        if self.nbt.is_empty() {
            buf.put_i16(-1);
        } else {
            buf.put_i16(self.nbt.len() as i16);
            buf.put_slice(&self.nbt);
        }
    }
}

impl ProtoDecode for Slot {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 2)?;
        let id = buf.get_i16();
        if id < 0 {
            return Ok(Self::EMPTY);
        }
        ensure(buf, 5)?;
        let count = buf.get_i8();
        let damage = buf.get_i16();
        let nbt_len = buf.get_i16();
        let nbt = if nbt_len < 0 {
            Vec::new()
        } else {
            ensure(buf, nbt_len as usize)?;
            buf.copy_to_bytes(nbt_len as usize).to_vec()
        };
        Ok(Self {
            id,
            count,
            damage,
            nbt,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn varint_known_encodings() {
        let cases: &[(i32, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (300, &[0xAC, 0x02]),
            (2097151, &[0xFF, 0xFF, 0x7F]),
            (-1, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];
        for &(value, expected) in cases {
            let mut buf = Vec::new();
            VarInt(value).encode(&mut buf);
            assert_eq!(buf, expected, "encoding {value}");
            assert_eq!(VarInt::encoded_len(value), expected.len());
            let (decoded, len) = VarInt::decode(expected).unwrap();
            assert_eq!(decoded.0, value);
            assert_eq!(len, expected.len());
        }
    }

    #[test]
    fn varint_incomplete_vs_malformed() {
        assert_eq!(VarInt::decode(&[0x80]), Err(VarIntError::BufferTooShort));
        assert_eq!(VarInt::decode(&[]), Err(VarIntError::BufferTooShort));
        assert_eq!(
            VarInt::decode(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]),
            Err(VarIntError::TooManyBytes { max_bytes: 5 })
        );
    }

    #[test]
    fn varint_buf_decode_matches_slice_decode() {
        let mut buf = BytesMut::new();
        VarInt(25565).proto_encode(&mut buf);
        let decoded = VarInt::proto_decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.0, 25565);
    }

    #[test]
    fn uuid_display_and_parse() {
        let u = Uuid::new(0x0123456789ABCDEF, 0xFEDCBA9876543210);
        let s = u.to_string();
        assert_eq!(s, "01234567-89ab-cdef-fedc-ba9876543210");
        assert_eq!(Uuid::parse(&s), Some(u));
        assert_eq!(Uuid::parse("0123456789abcdeffedcba9876543210"), Some(u));
        assert_eq!(Uuid::parse("nope"), None);
    }

    #[test]
    fn chunk_pos_of_negative_coordinates() {
        assert_eq!(ChunkPos::containing(-0.5, 15.9), ChunkPos::new(-1, 0));
        assert_eq!(ChunkPos::containing(16.0, -16.0), ChunkPos::new(1, -1));
    }

    #[test]
    fn chunk_distances() {
        let a = ChunkPos::new(0, 0);
        let b = ChunkPos::new(3, -4);
        assert_eq!(a.chebyshev_distance(&b), 4);
        assert_eq!(a.distance_squared(&b), 25);
    }

    #[test]
    fn slot_empty_is_single_short() {
        let mut buf = BytesMut::new();
        Slot::EMPTY.proto_encode(&mut buf);
        assert_eq!(&buf[..], &[0xFF, 0xFF]);
        let decoded = Slot::proto_decode(&mut buf.freeze()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn slot_with_item() {
        let slot = Slot {
            id: 1,
            count: 64,
            damage: 0,
            nbt: Vec::new(),
        };
        let mut buf = BytesMut::new();
        slot.proto_encode(&mut buf);
        assert_eq!(&buf[..], &[0x00, 0x01, 0x40, 0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(Slot::proto_decode(&mut buf.freeze()).unwrap(), slot);
    }

    #[test]
    fn block_pos_wire_layout() {
        let mut buf = BytesMut::new();
        BlockPos::new(-1, 64, 2).proto_encode(&mut buf);
        assert_eq!(
            &buf[..],
            &[0xFF, 0xFF, 0xFF, 0xFF, 0x40, 0x00, 0x00, 0x00, 0x02]
        );
    }
}
