//! Passphrase → AES key derivation
//!
//! Argon2id v1.3 over the UTF-8 passphrase bytes with a random 16-byte
//! salt drawn per envelope. Cost parameters are an interoperability
//! contract: the envelope records the salt but not the costs, so an
//! envelope encrypted under non-default costs only opens on a client
//! supplying the same values.

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::error::{CipherError, CipherResult};
use crate::{KEY_SIZE, SALT_SIZE};

/// Argon2id cost parameters for the file cipher.
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub mem_cost_kib: u32,
    /// Passes over memory.
    pub time_cost: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 passes, 4 lanes.
    fn default() -> Self {
        Self {
            mem_cost_kib: 64 * 1024,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Derive the 256-bit AES key for one envelope.
    ///
    /// An empty passphrase is rejected: it would silently produce a key
    /// anyone can re-derive. Cost values Argon2 cannot honor surface as
    /// [`CipherError::KeyDerivation`].
    pub fn derive_key(
        &self,
        passphrase: &SecretString,
        salt: &[u8; SALT_SIZE],
    ) -> CipherResult<FileKey> {
        if passphrase.expose_secret().is_empty() {
            return Err(CipherError::KeyDerivation("empty passphrase".into()));
        }

        let params = Params::new(
            self.mem_cost_kib,
            self.time_cost,
            self.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| CipherError::KeyDerivation(format!("invalid Argon2id params: {e}")))?;

        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut *key)
            .map_err(|e| CipherError::KeyDerivation(format!("Argon2id KDF failed: {e}")))?;

        Ok(FileKey(key))
    }
}

/// A derived AES-256 key, wiped from memory on drop.
pub struct FileKey(Zeroizing<[u8; KEY_SIZE]>);

impl FileKey {
    pub(crate) fn bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

// Keeps the key out of logs reached through `{:?}`.
impl std::fmt::Debug for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FileKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap parameters so the test suite doesn't spend seconds in Argon2.
    fn fast_params() -> KdfParams {
        KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("open-sesame-42");
        let salt = [7u8; SALT_SIZE];

        let key1 = fast_params().derive_key(&passphrase, &salt).unwrap();
        let key2 = fast_params().derive_key(&passphrase, &salt).unwrap();

        assert_eq!(key1.bytes(), key2.bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let salt = [7u8; SALT_SIZE];

        let key1 = fast_params()
            .derive_key(&SecretString::from("passphrase-a"), &salt)
            .unwrap();
        let key2 = fast_params()
            .derive_key(&SecretString::from("passphrase-b"), &salt)
            .unwrap();

        assert_ne!(
            key1.bytes(),
            key2.bytes(),
            "different passphrases must produce different keys"
        );
    }

    #[test]
    fn test_kdf_different_salts() {
        let passphrase = SecretString::from("same-passphrase");

        let key1 = fast_params()
            .derive_key(&passphrase, &[1u8; SALT_SIZE])
            .unwrap();
        let key2 = fast_params()
            .derive_key(&passphrase, &[2u8; SALT_SIZE])
            .unwrap();

        assert_ne!(
            key1.bytes(),
            key2.bytes(),
            "different salts must produce different keys"
        );
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        let result = fast_params().derive_key(&SecretString::from(""), &[0u8; SALT_SIZE]);
        assert!(matches!(result, Err(CipherError::KeyDerivation(_))));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = FileKey(Zeroizing::new([0xAAu8; KEY_SIZE]));
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("170"), "no raw byte values in Debug");
    }
}
