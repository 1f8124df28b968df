//! Protocol states.

use std::fmt;

use crate::error::ProtoError;

/// The state a connection is in; it decides which frame types are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    Handshake,
    Status,
    Login,
    Play,
}

impl ProtocolState {
    /// Map the `next_state` field of a Handshake frame.
    pub fn from_next_state(value: i32) -> Result<Self, ProtoError> {
        match value {
            1 => Ok(Self::Status),
            2 => Ok(Self::Login),
            other => Err(ProtoError::UnknownNextState(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handshake => "handshake",
            Self::Status => "status",
            Self::Login => "login",
            Self::Play => "play",
        }
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_state_mapping() {
        assert_eq!(ProtocolState::from_next_state(1).unwrap(), ProtocolState::Status);
        assert_eq!(ProtocolState::from_next_state(2).unwrap(), ProtocolState::Login);
        assert!(matches!(
            ProtocolState::from_next_state(3),
            Err(ProtoError::UnknownNextState(3))
        ));
    }
}
