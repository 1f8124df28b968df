//! Length-prefixed frame layer.
//!
//! On the wire every frame is `VarInt length | VarInt id | payload`, where
//! `length` covers the id and the payload. [`FrameDecoder`] reassembles frames
//! from arbitrarily split plaintext chunks.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::types::{VarInt, VarIntError};

/// Default maximum declared frame length (2 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// One decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: i32,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(id: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Build a frame from a packet body.
    pub fn from_packet<P: ProtoEncode>(id: i32, packet: &P) -> Self {
        let mut buf = BytesMut::new();
        packet.proto_encode(&mut buf);
        Self::new(id, buf.freeze())
    }

    /// Decode the payload as `P`, rejecting trailing bytes.
    pub fn parse<P: ProtoDecode>(&self) -> Result<P, ProtoError> {
        let mut payload = self.payload.clone();
        let packet = P::proto_decode(&mut payload)?;
        if payload.has_remaining() {
            return Err(ProtoError::TrailingBytes {
                id: self.id,
                remaining: payload.remaining(),
            });
        }
        Ok(packet)
    }

    /// Wire form of this frame.
    pub fn encode(&self) -> Bytes {
        encode_frame(self.id, &self.payload)
    }
}

/// Produce the length-prefixed wire form of `id` + `payload`.
pub fn encode_frame(id: i32, payload: &[u8]) -> Bytes {
    let body_len = VarInt::encoded_len(id) + payload.len();
    let mut buf = BytesMut::with_capacity(VarInt::encoded_len(body_len as i32) + body_len);
    VarInt(body_len as i32).proto_encode(&mut buf);
    VarInt(id).proto_encode(&mut buf);
    buf.put_slice(payload);
    buf.freeze()
}

/// Incremental frame reassembler over decrypted bytes.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_len: usize,
}

impl FrameDecoder {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_len,
        }
    }

    /// Append plaintext bytes received from the transport.
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of bytes buffered but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Take every undecoded byte out of the decoder.
    ///
    /// Used when the inbound cipher is switched on: bytes after the current
    /// frame boundary were still ciphertext and must be decrypted before they
    /// are fed back in.
    pub fn take_buffered(&mut self) -> BytesMut {
        self.buf.split()
    }

    /// Yield the next complete frame, or `None` if more input is needed.
    pub fn decode(&mut self) -> Result<Option<Frame>, ProtoError> {
        let (len, header) = match VarInt::decode(&self.buf) {
            Ok((len, header)) => (len.0, header),
            Err(VarIntError::BufferTooShort) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if len < 0 {
            return Err(ProtoError::NegativeLength(len));
        }
        let len = len as usize;
        if len == 0 {
            return Err(ProtoError::EmptyFrame);
        }
        if len > self.max_len {
            return Err(ProtoError::FrameTooLarge {
                len,
                max: self.max_len,
            });
        }
        if self.buf.len() < header + len {
            return Ok(None);
        }

        self.buf.advance(header);
        let mut body = self.buf.split_to(len).freeze();
        let id = VarInt::proto_decode(&mut body)?.0;
        Ok(Some(Frame { id, payload: body }))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stream() -> Vec<u8> {
        let mut stream = Vec::new();
        stream.extend_from_slice(&encode_frame(0x00, &[0x04, 0x09]));
        stream.extend_from_slice(&encode_frame(0x01, &[]));
        stream.extend_from_slice(&encode_frame(0x0E, &vec![0xAB; 300]));
        stream
    }

    fn decode_all(decoder: &mut FrameDecoder) -> Vec<Frame> {
        let mut out = Vec::new();
        while let Some(frame) = decoder.decode().unwrap() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn encode_layout() {
        let wire = encode_frame(0x01, &[0xAA, 0xBB]);
        assert_eq!(&wire[..], &[0x03, 0x01, 0xAA, 0xBB]);
    }

    #[test]
    fn contiguous_decode() {
        let mut decoder = FrameDecoder::default();
        decoder.feed(&sample_stream());
        let frames = decode_all(&mut decoder);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], Frame::new(0x00, vec![0x04, 0x09]));
        assert_eq!(frames[1].id, 0x01);
        assert!(frames[1].payload.is_empty());
        assert_eq!(frames[2].payload.len(), 300);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn arbitrary_splits_match_contiguous() {
        let stream = sample_stream();
        let mut whole = FrameDecoder::default();
        whole.feed(&stream);
        let expected = decode_all(&mut whole);

        for chunk in [1usize, 2, 3, 7, 64, 299] {
            let mut decoder = FrameDecoder::default();
            let mut got = Vec::new();
            for piece in stream.chunks(chunk) {
                decoder.feed(piece);
                got.extend(decode_all(&mut decoder));
            }
            assert_eq!(got, expected, "chunk size {chunk}");
        }
    }

    #[test]
    fn partial_header_waits() {
        let mut decoder = FrameDecoder::default();
        // 300-byte frame header is two bytes; only the first arrived.
        decoder.feed(&[0xAC]);
        assert!(decoder.decode().unwrap().is_none());
    }

    #[test]
    fn zero_length_is_error() {
        let mut decoder = FrameDecoder::default();
        decoder.feed(&[0x00]);
        assert!(matches!(decoder.decode(), Err(ProtoError::EmptyFrame)));
    }

    #[test]
    fn oversized_is_error_before_payload_arrives() {
        let mut decoder = FrameDecoder::new(16);
        decoder.feed(&[0x11]);
        assert!(matches!(
            decoder.decode(),
            Err(ProtoError::FrameTooLarge { len: 17, max: 16 })
        ));
    }

    #[test]
    fn overlong_header_is_error() {
        let mut decoder = FrameDecoder::default();
        decoder.feed(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert!(matches!(decoder.decode(), Err(ProtoError::VarInt(_))));
    }

    #[test]
    fn take_buffered_returns_remainder() {
        let mut decoder = FrameDecoder::default();
        let mut stream = encode_frame(0x00, &[1]).to_vec();
        stream.extend_from_slice(&[0x05, 0x06]);
        decoder.feed(&stream);
        assert!(decoder.decode().unwrap().is_some());
        let rest = decoder.take_buffered();
        assert_eq!(&rest[..], &[0x05, 0x06]);
        assert_eq!(decoder.buffered(), 0);
    }
}
