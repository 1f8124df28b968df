//! Status state: server list ping.

use base64::Engine;
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::chat::ChatComponent;
use crate::codec::{self, ensure, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

/// Request (0x00), client to server. Empty body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRequest;

impl ProtoEncode for StatusRequest {
    fn proto_encode(&self, _buf: &mut impl BufMut) {}
}

impl ProtoDecode for StatusRequest {
    fn proto_decode(_buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self)
    }
}

/// Ping (0x01) from the client, echoed back as Pong (0x01).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPing {
    pub payload: i64,
}

impl ProtoEncode for StatusPing {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i64(self.payload);
    }
}

impl ProtoDecode for StatusPing {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 8)?;
        Ok(Self {
            payload: buf.get_i64(),
        })
    }
}

/// Response (0x00), server to client. A single JSON string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub json: String,
}

impl ProtoEncode for StatusResponse {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        codec::write_string(buf, &self.json);
    }
}

impl ProtoDecode for StatusResponse {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            json: codec::read_string(buf, 32767)?,
        })
    }
}

// ---------------------------------------------------------------------------
// JSON body
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub version: StatusVersion,
    pub players: StatusPlayers,
    pub description: ChatComponent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPlayers {
    pub max: u32,
    pub online: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<PlayerSample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSample {
    pub name: String,
    pub id: String,
}

impl ServerStatus {
    pub fn to_response(&self) -> Result<StatusResponse, ProtoError> {
        Ok(StatusResponse {
            json: serde_json::to_string(self)?,
        })
    }
}

/// Turn raw PNG bytes into the `data:` URI the client expects as favicon.
pub fn favicon_data_uri(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn ping_layout() {
        let mut buf = BytesMut::new();
        StatusPing { payload: 0x0102 }.proto_encode(&mut buf);
        assert_eq!(&buf[..], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
    }

    #[test]
    fn status_json_shape() {
        let status = ServerStatus {
            version: StatusVersion {
                name: "1.7.10".into(),
                protocol: 5,
            },
            players: StatusPlayers {
                max: 20,
                online: 1,
                sample: vec![PlayerSample {
                    name: "Steve".into(),
                    id: "00000000-0000-0000-0000-000000000000".into(),
                }],
            },
            description: ChatComponent::text("An Ember server"),
            favicon: None,
        };
        let json = status.to_response().unwrap().json;
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"]["protocol"], 5);
        assert_eq!(value["players"]["online"], 1);
        assert_eq!(value["players"]["sample"][0]["name"], "Steve");
        assert_eq!(value["description"]["text"], "An Ember server");
        assert!(value.get("favicon").is_none());
    }

    #[test]
    fn favicon_uri_prefix() {
        let uri = favicon_data_uri(&[0x89, b'P', b'N', b'G']);
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
    }
}
