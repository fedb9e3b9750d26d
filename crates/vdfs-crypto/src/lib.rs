//! vdfs-crypto: Client-side file encryption for VaultDrive
//!
//! Files are encrypted on the client before they reach the blob store.
//! The server only ever sees ciphertext plus two non-secret hex values
//! (IV and KDF salt) that ride alongside it in the file's metadata record.
//!
//! Pipeline: passphrase → Argon2id → 256-bit key; plaintext → PKCS#7 pad →
//! AES-256-CBC → [`CipherEnvelope`].
//!
//! There is no key escrow: losing the passphrase loses the plaintext.

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod kdf;

pub use cipher::{decrypt, decrypt_with, encrypt, encrypt_with};
pub use envelope::CipherEnvelope;
pub use error::CipherError;
pub use kdf::{FileKey, KdfParams};

/// AES block size in bytes; ciphertext length is always a multiple of this.
pub const BLOCK_SIZE: usize = 16;

/// Size of the random per-envelope initialization vector.
pub const IV_SIZE: usize = 16;

/// Size of the random per-envelope Argon2id salt.
pub const SALT_SIZE: usize = 16;

/// Size of the derived AES-256 key (256-bit).
pub const KEY_SIZE: usize = 32;
