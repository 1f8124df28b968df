//! Login state packets.

use bytes::{Buf, BufMut};

use crate::chat::ChatComponent;
use crate::codec::{self, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

/// Maximum length of a player name.
pub const MAX_NAME_LEN: usize = 16;

/// Login Start (0x00), client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub name: String,
}

impl ProtoEncode for LoginStart {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_string(buf, &self.name);
    }
}

impl ProtoDecode for LoginStart {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            name: codec::read_string(buf, MAX_NAME_LEN)?,
        })
    }
}

/// Encryption Request (0x01), server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionRequest {
    pub server_id: String,
    /// DER-encoded public key.
    pub public_key: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl ProtoEncode for EncryptionRequest {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_string(buf, &self.server_id);
        codec::write_short_bytes(buf, &self.public_key);
        codec::write_short_bytes(buf, &self.verify_token);
    }
}

impl ProtoDecode for EncryptionRequest {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            server_id: codec::read_string(buf, 20)?,
            public_key: codec::read_short_bytes(buf)?,
            verify_token: codec::read_short_bytes(buf)?,
        })
    }
}

/// Encryption Response (0x01), client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionResponse {
    pub shared_secret: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl ProtoEncode for EncryptionResponse {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_short_bytes(buf, &self.shared_secret);
        codec::write_short_bytes(buf, &self.verify_token);
    }
}

impl ProtoDecode for EncryptionResponse {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            shared_secret: codec::read_short_bytes(buf)?,
            verify_token: codec::read_short_bytes(buf)?,
        })
    }
}

/// Login Success (0x02), server to client. The UUID is sent hyphenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub uuid: String,
    pub username: String,
}

impl ProtoEncode for LoginSuccess {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_string(buf, &self.uuid);
        codec::write_string(buf, &self.username);
    }
}

impl ProtoDecode for LoginSuccess {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            uuid: codec::read_string(buf, 36)?,
            username: codec::read_string(buf, MAX_NAME_LEN)?,
        })
    }
}

/// Disconnect (0x00 in Login, 0x40 in Play), server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    /// JSON chat component.
    pub reason: String,
}

impl Disconnect {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            reason: ChatComponent::text(message).to_json(),
        }
    }
}

impl ProtoEncode for Disconnect {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_string(buf, &self.reason);
    }
}

impl ProtoDecode for Disconnect {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            reason: codec::read_string(buf, 32767)?,
        })
    }
}
