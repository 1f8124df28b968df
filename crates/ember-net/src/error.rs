use ember_crypto::CryptoError;
use ember_proto::{ProtoError, ProtocolState};
use thiserror::Error;

use crate::services::AuthError;

/// Every way a connection can fail. All of them are fatal for the connection
/// they happen on; [`NetError::reason`] is the text shown to the client.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),

    #[error("cipher error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("unexpected packet 0x{id:02X} in {state} state")]
    UnexpectedFrame { state: ProtocolState, id: i32 },

    #[error("invalid player name {0:?}")]
    InvalidName(String),

    #[error("client protocol {client} is older than {server}")]
    OutdatedClient { client: i32, server: i32 },

    #[error("client protocol {client} is newer than {server}")]
    OutdatedServer { client: i32, server: i32 },

    #[error("name already logged in")]
    DuplicateLogin,

    #[error("server is full")]
    ServerFull,

    #[error("outgoing queue full")]
    QueueOverflow,

    #[error("dispatch queue exceeded {max} pending frames")]
    DispatchOverflow { max: usize },

    #[error("handler for packet 0x{id:02X} panicked")]
    HandlerPanicked { id: i32 },

    #[error("no data received within the read timeout")]
    ReadTimeout,

    #[error("keep-alive not answered in time")]
    KeepAliveTimeout,

    #[error("kicked: {0}")]
    Kicked(String),

    #[error("server shutting down")]
    ServerClosing,

    #[error("connection closed by peer")]
    Closed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NetError {
    /// Client-facing disconnect text.
    pub fn reason(&self) -> String {
        match self {
            Self::Proto(e) => format!("Protocol violation: {e}"),
            Self::UnexpectedFrame { state, id } => {
                format!("Protocol violation: unexpected packet 0x{id:02X} in {state} state")
            }
            Self::Crypto(_) => "Encryption error".into(),
            Self::Auth(AuthError::Rejected(msg)) => msg.clone(),
            Self::Auth(_) => "Failed to verify username!".into(),
            Self::InvalidName(_) => "Invalid username!".into(),
            Self::OutdatedClient { .. } => {
                format!("Outdated client! I'm still on {}", crate::constants::VERSION_NAME)
            }
            Self::OutdatedServer { .. } => {
                format!("Outdated server! I'm still on {}", crate::constants::VERSION_NAME)
            }
            Self::DuplicateLogin => "You are already logged in".into(),
            Self::ServerFull => "The server is full!".into(),
            Self::QueueOverflow | Self::DispatchOverflow { .. } => "Overflow".into(),
            Self::HandlerPanicked { .. } => "Internal server error".into(),
            Self::ReadTimeout | Self::KeepAliveTimeout => "Timed out".into(),
            Self::Kicked(msg) => msg.clone(),
            Self::ServerClosing => "Server closed".into(),
            Self::Io(_) | Self::Closed => "Disconnected".into(),
            Self::InvalidConfig(msg) => msg.clone(),
        }
    }

    /// Whether this error is a protocol violation by the client.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Proto(_) | Self::UnexpectedFrame { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_match_client_messages() {
        assert_eq!(NetError::DuplicateLogin.reason(), "You are already logged in");
        assert_eq!(NetError::ServerFull.reason(), "The server is full!");
        assert_eq!(NetError::KeepAliveTimeout.reason(), "Timed out");
        assert!(NetError::OutdatedClient { client: 3, server: 5 }
            .reason()
            .starts_with("Outdated client!"));
    }

    #[test]
    fn protocol_violations() {
        let e = NetError::UnexpectedFrame {
            state: ProtocolState::Login,
            id: 0,
        };
        assert!(e.is_protocol_violation());
        assert!(e.reason().starts_with("Protocol violation"));
        assert!(NetError::from(ProtoError::EmptyFrame).is_protocol_violation());
        assert!(!NetError::ServerFull.is_protocol_violation());
    }
}
