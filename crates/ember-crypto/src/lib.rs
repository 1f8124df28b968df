//! Cryptography: AES-128-CFB8 stream cipher and login key material.

pub mod cfb8;
pub mod keys;
pub mod pipeline;

pub use keys::{offline_uuid, shared_secret, verify_token};
pub use pipeline::{CipherPipeline, InboundCipher, OutboundCipher};

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key length: expected 16 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid IV length: expected 16 bytes, got {0}")]
    InvalidIvLength(usize),

    #[error("cipher already enabled")]
    AlreadyEnabled,
}
