//! AES-128 in CFB8 mode, one byte at a time.
//!
//! The cipher state runs continuously across calls: every byte of a direction
//! continues the stream where the previous call left off.

use aes::Aes128;
use ::cfb8::cipher::generic_array::GenericArray;
use ::cfb8::cipher::KeyIvInit;
use ::cfb8::cipher::{BlockDecryptMut, BlockEncryptMut};

use crate::CryptoError;

pub type Encryptor = ::cfb8::Encryptor<Aes128>;
pub type Decryptor = ::cfb8::Decryptor<Aes128>;

pub const KEY_LEN: usize = 16;

fn check(key: &[u8], iv: &[u8]) -> Result<(), CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength(key.len()));
    }
    if iv.len() != KEY_LEN {
        return Err(CryptoError::InvalidIvLength(iv.len()));
    }
    Ok(())
}

pub fn encryptor(key: &[u8], iv: &[u8]) -> Result<Encryptor, CryptoError> {
    check(key, iv)?;
    Ok(Encryptor::new(
        GenericArray::from_slice(key),
        GenericArray::from_slice(iv),
    ))
}

pub fn decryptor(key: &[u8], iv: &[u8]) -> Result<Decryptor, CryptoError> {
    check(key, iv)?;
    Ok(Decryptor::new(
        GenericArray::from_slice(key),
        GenericArray::from_slice(iv),
    ))
}

/// Encrypt `data` in place, continuing the stream.
pub fn encrypt_in_place(cipher: &mut Encryptor, data: &mut [u8]) {
    for byte in data.iter_mut() {
        let mut block = GenericArray::clone_from_slice(std::slice::from_ref(byte));
        cipher.encrypt_block_mut(&mut block);
        *byte = block[0];
    }
}

/// Decrypt `data` in place, continuing the stream.
pub fn decrypt_in_place(cipher: &mut Decryptor, data: &mut [u8]) {
    for byte in data.iter_mut() {
        let mut block = GenericArray::clone_from_slice(std::slice::from_ref(byte));
        cipher.decrypt_block_mut(&mut block);
        *byte = block[0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // NIST SP 800-38A, F.3.7 CFB8-AES128.Encrypt
    const NIST_KEY: [u8; 16] = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f,
        0x3c,
    ];
    const NIST_IV: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];
    const NIST_PLAIN: [u8; 18] = [
        0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93, 0x17,
        0x2a, 0xae, 0x2d,
    ];
    const NIST_CIPHER: [u8; 18] = [
        0x3b, 0x79, 0x42, 0x4c, 0x9c, 0x0d, 0xd4, 0x36, 0xba, 0xce, 0x9e, 0x0e, 0xd4, 0x58, 0x6a,
        0x4f, 0x32, 0xb9,
    ];

    #[test]
    fn nist_vector() {
        let mut enc = encryptor(&NIST_KEY, &NIST_IV).unwrap();
        let mut data = NIST_PLAIN;
        encrypt_in_place(&mut enc, &mut data);
        assert_eq!(data, NIST_CIPHER);

        let mut dec = decryptor(&NIST_KEY, &NIST_IV).unwrap();
        decrypt_in_place(&mut dec, &mut data);
        assert_eq!(data, NIST_PLAIN);
    }

    #[test]
    fn stream_continues_across_calls() {
        let key = [0x42u8; 16];
        let mut whole = *b"split me anywhere please";
        let mut parts = whole;

        let mut enc = encryptor(&key, &key).unwrap();
        encrypt_in_place(&mut enc, &mut whole);

        let mut enc = encryptor(&key, &key).unwrap();
        let (a, b) = parts.split_at_mut(5);
        encrypt_in_place(&mut enc, a);
        encrypt_in_place(&mut enc, b);

        assert_eq!(whole, parts);
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert_eq!(
            encryptor(&[0u8; 15], &[0u8; 16]).err(),
            Some(CryptoError::InvalidKeyLength(15))
        );
        assert_eq!(
            decryptor(&[0u8; 16], &[0u8; 32]).err(),
            Some(CryptoError::InvalidIvLength(32))
        );
    }
}
