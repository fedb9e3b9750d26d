use thiserror::Error;

pub type CipherResult<T> = Result<T, CipherError>;

/// Failure surface of the file cipher.
///
/// `Decryption` deliberately does not distinguish a wrong passphrase from
/// corrupted ciphertext; both manifest as the same padding failure and the
/// caller is told "likely wrong passphrase" either way. Error messages
/// never carry key or plaintext material.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}
