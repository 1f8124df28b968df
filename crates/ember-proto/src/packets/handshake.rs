//! Handshake (0x00), client to server. The only frame legal in the Handshake state.

use bytes::{Buf, BufMut};

use crate::codec::{self, ensure, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::state::ProtocolState;
use crate::types::VarInt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    /// 1 for status, 2 for login.
    pub next_state: i32,
}

impl Handshake {
    pub fn next(&self) -> Result<ProtocolState, ProtoError> {
        ProtocolState::from_next_state(self.next_state)
    }
}

impl ProtoEncode for Handshake {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        VarInt(self.protocol_version).proto_encode(buf);
        codec::write_string(buf, &self.server_address);
        buf.put_u16(self.server_port);
        VarInt(self.next_state).proto_encode(buf);
    }
}

impl ProtoDecode for Handshake {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let protocol_version = VarInt::proto_decode(buf)?.0;
        let server_address = codec::read_string(buf, 255)?;
        ensure(buf, 2)?;
        let server_port = buf.get_u16();
        let next_state = VarInt::proto_decode(buf)?.0;
        Ok(Self {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn decode_login_intent() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x05); // protocol 5
        codec::write_string(&mut buf, "localhost");
        buf.put_u16(25565);
        buf.put_u8(0x02);
        let hs = Handshake::proto_decode(&mut buf.freeze()).unwrap();
        assert_eq!(hs.protocol_version, 5);
        assert_eq!(hs.server_address, "localhost");
        assert_eq!(hs.server_port, 25565);
        assert_eq!(hs.next().unwrap(), ProtocolState::Login);
    }

    #[test]
    fn bad_next_state() {
        let hs = Handshake {
            protocol_version: 5,
            server_address: String::new(),
            server_port: 0,
            next_state: 7,
        };
        assert!(hs.next().is_err());
    }
}
