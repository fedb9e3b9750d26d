//! Cipher envelope: ciphertext plus the non-secret values needed to open it
//!
//! The blob store receives `ciphertext` as an opaque byte blob with no
//! embedded header; `iv` and `kdf_salt` are persisted out-of-band as
//! sibling fields in the file's metadata record and supplied back at
//! decrypt time. Both are random per encryption and safe in cleartext.

use crate::error::{CipherError, CipherResult};
use crate::{IV_SIZE, SALT_SIZE};

/// Output of [`crate::encrypt`]; sole input (besides the passphrase) of
/// [`crate::decrypt`].
///
/// `iv` and `kdf_salt` are lowercase hex on write; decoding accepts either
/// case. An IV must never be reused with the same key for a different
/// plaintext, which random generation makes a non-issue here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherEnvelope {
    /// AES-256-CBC output; length is a non-zero multiple of 16.
    pub ciphertext: Vec<u8>,
    /// Hex-encoded 16-byte initialization vector.
    pub iv: String,
    /// Hex-encoded 16-byte Argon2id salt.
    pub kdf_salt: String,
}

impl CipherEnvelope {
    pub fn new(ciphertext: Vec<u8>, iv: &[u8; IV_SIZE], kdf_salt: &[u8; SALT_SIZE]) -> Self {
        Self {
            ciphertext,
            iv: hex::encode(iv),
            kdf_salt: hex::encode(kdf_salt),
        }
    }

    /// Decode the IV field, enforcing the 16-byte invariant.
    pub fn iv_bytes(&self) -> CipherResult<[u8; IV_SIZE]> {
        decode_fixed_hex(&self.iv, "IV")
    }

    /// Decode the salt field, enforcing the 16-byte invariant.
    pub fn salt_bytes(&self) -> CipherResult<[u8; SALT_SIZE]> {
        decode_fixed_hex(&self.kdf_salt, "KDF salt")
    }
}

fn decode_fixed_hex<const N: usize>(field: &str, what: &str) -> CipherResult<[u8; N]> {
    let bytes = hex::decode(field)
        .map_err(|e| CipherError::Decryption(format!("malformed {what} hex: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        CipherError::Decryption(format!("{what} must be {N} bytes, got {}", b.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iv_and_salt_roundtrip() {
        let env = CipherEnvelope::new(vec![0u8; 16], &[0xABu8; IV_SIZE], &[0x1Fu8; SALT_SIZE]);

        assert_eq!(env.iv, "ab".repeat(IV_SIZE));
        assert_eq!(env.kdf_salt, "1f".repeat(SALT_SIZE));
        assert_eq!(env.iv_bytes().unwrap(), [0xABu8; IV_SIZE]);
        assert_eq!(env.salt_bytes().unwrap(), [0x1Fu8; SALT_SIZE]);
    }

    #[test]
    fn test_hex_is_lowercase_on_write_and_case_insensitive_on_read() {
        let mut env = CipherEnvelope::new(vec![], &[0xCDu8; IV_SIZE], &[0u8; SALT_SIZE]);
        assert_eq!(env.iv, env.iv.to_lowercase());

        env.iv = env.iv.to_uppercase();
        assert_eq!(env.iv_bytes().unwrap(), [0xCDu8; IV_SIZE]);
    }

    #[test]
    fn test_malformed_iv_rejected() {
        let mut env = CipherEnvelope::new(vec![], &[0u8; IV_SIZE], &[0u8; SALT_SIZE]);

        env.iv = "zz".repeat(IV_SIZE);
        assert!(matches!(env.iv_bytes(), Err(CipherError::Decryption(_))));

        env.iv = "ab".repeat(IV_SIZE - 1);
        assert!(matches!(env.iv_bytes(), Err(CipherError::Decryption(_))));
    }
}
