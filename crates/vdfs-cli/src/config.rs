use serde::{Deserialize, Serialize};

use vdfs_crypto::KdfParams;

/// CLI configuration (loaded from vaultdrive.toml; defaults otherwise).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VdfsConfig {
    pub totp: TotpConfig,
    pub kdf: KdfConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TotpConfig {
    /// Issuer label shown in authenticator apps (default: VaultDrive)
    pub issuer: String,
    /// Verification window in 30-second steps each side (default: 1)
    pub window: u32,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: "VaultDrive".to_string(),
            window: vdfs_totp::DEFAULT_WINDOW,
        }
    }
}

/// Argon2id costs for the file cipher.
///
/// Changing these breaks decryption of envelopes encrypted under the old
/// values; the envelope does not record them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        let params = KdfParams::default();
        Self {
            mem_cost_kib: params.mem_cost_kib,
            time_cost: params.time_cost,
            parallelism: params.parallelism,
        }
    }
}

impl KdfConfig {
    pub fn params(&self) -> KdfParams {
        KdfParams {
            mem_cost_kib: self.mem_cost_kib,
            time_cost: self.time_cost,
            parallelism: self.parallelism,
        }
    }
}
