//! Login key material: verify tokens, shared secrets and offline ids.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random 4-byte token the client must echo back encrypted.
pub fn verify_token() -> [u8; 4] {
    let mut token = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut token);
    token
}

/// Random 16-byte shared secret, as a client would generate it.
pub fn shared_secret() -> [u8; 16] {
    let mut secret = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

/// Stable id for an unauthenticated player name.
///
/// ```text
/// id = SHA256("OfflinePlayer:" + name)[0..16], version 3, IETF variant
/// ```
pub fn offline_uuid(name: &str) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update(b"OfflinePlayer:");
    hasher.update(name.as_bytes());
    let hash = hasher.finalize();

    let mut id = [0u8; 16];
    id.copy_from_slice(&hash[..16]);
    id[6] = (id[6] & 0x0F) | 0x30;
    id[8] = (id[8] & 0x3F) | 0x80;
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_uuid_is_stable_and_versioned() {
        let a = offline_uuid("Steve");
        assert_eq!(a, offline_uuid("Steve"));
        assert_ne!(a, offline_uuid("Alex"));
        assert_eq!(a[6] >> 4, 3);
        assert_eq!(a[8] & 0xC0, 0x80);
    }

    #[test]
    fn offline_uuid_is_case_sensitive() {
        assert_ne!(offline_uuid("steve"), offline_uuid("Steve"));
    }

    #[test]
    fn random_material_varies() {
        // 2^-128 chance of a false failure.
        assert_ne!(shared_secret(), shared_secret());
    }
}
