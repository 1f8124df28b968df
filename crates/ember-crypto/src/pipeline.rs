//! Per-connection cipher state.
//!
//! Bytes pass through untouched until a direction is enabled. The two
//! directions are independent so the reader and writer can each switch at
//! their own exact stream position.

use bytes::Bytes;

use crate::cfb8::{self, Decryptor, Encryptor};
use crate::CryptoError;

/// Inbound half, owned by the connection's reader.
#[derive(Default)]
pub struct InboundCipher {
    cipher: Option<Decryptor>,
}

impl InboundCipher {
    pub fn enable(&mut self, key: &[u8], iv: &[u8]) -> Result<(), CryptoError> {
        if self.cipher.is_some() {
            return Err(CryptoError::AlreadyEnabled);
        }
        self.cipher = Some(cfb8::decryptor(key, iv)?);
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    /// Decrypt raw bytes in place. No-op while disabled.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        if let Some(cipher) = self.cipher.as_mut() {
            cfb8::decrypt_in_place(cipher, data);
        }
    }
}

/// Outbound half, owned by the connection's writer.
#[derive(Default)]
pub struct OutboundCipher {
    cipher: Option<Encryptor>,
}

impl OutboundCipher {
    pub fn enable(&mut self, key: &[u8], iv: &[u8]) -> Result<(), CryptoError> {
        if self.cipher.is_some() {
            return Err(CryptoError::AlreadyEnabled);
        }
        self.cipher = Some(cfb8::encryptor(key, iv)?);
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    /// Encrypt plaintext bytes in place. No-op while disabled.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        if let Some(cipher) = self.cipher.as_mut() {
            cfb8::encrypt_in_place(cipher, data);
        }
    }
}

/// Both directions of one connection.
#[derive(Default)]
pub struct CipherPipeline {
    inbound: InboundCipher,
    outbound: OutboundCipher,
}

impl CipherPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate AES-128/CFB8 for both directions from this point on.
    pub fn enable(&mut self, key: &[u8], iv: &[u8]) -> Result<(), CryptoError> {
        if self.inbound.is_enabled() || self.outbound.is_enabled() {
            return Err(CryptoError::AlreadyEnabled);
        }
        self.inbound.enable(key, iv)?;
        self.outbound.enable(key, iv)
    }

    pub fn is_enabled(&self) -> bool {
        self.inbound.is_enabled()
    }

    /// Raw bytes from the transport to plaintext.
    pub fn decode(&mut self, raw: &[u8]) -> Bytes {
        let mut data = raw.to_vec();
        self.inbound.decrypt(&mut data);
        Bytes::from(data)
    }

    /// Plaintext to raw bytes for the transport.
    pub fn encode(&mut self, plaintext: &[u8]) -> Bytes {
        let mut data = plaintext.to_vec();
        self.outbound.encrypt(&mut data);
        Bytes::from(data)
    }

    pub fn split(self) -> (InboundCipher, OutboundCipher) {
        (self.inbound, self.outbound)
    }
}
