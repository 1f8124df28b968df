//! Protocol-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("buffer too short: need {needed} more bytes, have {remaining}")]
    BufferTooShort { needed: usize, remaining: usize },

    #[error("VarInt encoding error: {0}")]
    VarInt(#[from] crate::types::VarIntError),

    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    #[error("string too long: {len} characters, limit {max}")]
    StringTooLong { len: usize, max: usize },

    #[error("negative length: {0}")]
    NegativeLength(i32),

    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("empty frame")]
    EmptyFrame,

    #[error("{remaining} trailing bytes after packet 0x{id:02X}")]
    TrailingBytes { id: i32, remaining: usize },

    #[error("unknown next state: {0}")]
    UnknownNextState(i32),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
