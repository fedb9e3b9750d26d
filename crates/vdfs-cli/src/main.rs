//! vdfs: VaultDrive command-line client
//!
//! Commands:
//!   encrypt <file> [--out PATH]   - encrypt a file under a passphrase
//!   decrypt <file> [--out PATH]   - decrypt a blob + sidecar metadata
//!   totp enroll --account LABEL   - start two-factor enrollment
//!   totp confirm --code CODE      - activate the pending factor
//!   totp code                     - print the current 6-digit code
//!   totp verify --code CODE       - check a code against the active factor
//!   config show                   - display current configuration
//!
//! The encrypted blob is written with no embedded header; the IV and KDF
//! salt land in a `.meta.json` sidecar, standing in for the metadata
//! record the hosting application keeps per file.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use vdfs_crypto::CipherEnvelope;
use vdfs_totp::{SystemClock, TwoFactorState};

mod config;
use config::VdfsConfig;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "vdfs",
    version,
    about = "VaultDrive client-side encryption and two-factor tools",
    long_about = "vdfs: encrypt files before they leave this machine and manage \
                  the TOTP second factor for your VaultDrive account"
)]
struct Cli {
    /// Path to vaultdrive.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "VDFS_CONFIG",
        default_value = "~/.config/vaultdrive/config.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file under a passphrase
    Encrypt {
        /// File to encrypt
        file: PathBuf,
        /// Output blob path (default: <file>.vd)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Decrypt a blob produced by `encrypt`
    Decrypt {
        /// Encrypted blob path (expects <file>.meta.json beside it)
        file: PathBuf,
        /// Output path (default: blob path without its .vd suffix)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Two-factor enrollment and verification
    Totp {
        #[command(subcommand)]
        action: TotpAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum TotpAction {
    /// Generate a fresh secret and print the provisioning URI
    Enroll {
        /// Account label shown in the authenticator app (e.g. your email)
        #[arg(long)]
        account: String,
        /// Two-factor state file
        #[arg(long, env = "VDFS_TOTP_STATE", default_value = "~/.config/vaultdrive/totp.json")]
        state: PathBuf,
    },

    /// Confirm enrollment with a code from the authenticator app
    Confirm {
        /// 6-digit code
        #[arg(long)]
        code: String,
        #[arg(long, env = "VDFS_TOTP_STATE", default_value = "~/.config/vaultdrive/totp.json")]
        state: PathBuf,
    },

    /// Print the current code for the stored secret
    Code {
        #[arg(long, env = "VDFS_TOTP_STATE", default_value = "~/.config/vaultdrive/totp.json")]
        state: PathBuf,
    },

    /// Verify a code against the active factor
    Verify {
        /// 6-digit code
        #[arg(long)]
        code: String,
        #[arg(long, env = "VDFS_TOTP_STATE", default_value = "~/.config/vaultdrive/totp.json")]
        state: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Sidecar metadata ──────────────────────────────────────────────────────────

/// Written next to the blob as `<blob>.meta.json`; the blob itself is
/// headerless, so losing this file loses the IV and salt with it.
#[derive(Debug, Serialize, Deserialize)]
struct FileMeta {
    version: u32,
    iv: String,
    kdf_salt: String,
}

const META_VERSION: u32 = 1;

/// On-disk form of the enrollment state plus the account label it was
/// provisioned under.
#[derive(Debug, Serialize, Deserialize)]
struct TotpStateFile {
    account: String,
    #[serde(flatten)]
    state: TwoFactorState,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Encrypt { file, out } => cmd_encrypt(&config, &file, out.as_deref()),
        Commands::Decrypt { file, out } => cmd_decrypt(&config, &file, out.as_deref()),
        Commands::Totp { action } => match action {
            TotpAction::Enroll { account, state } => {
                cmd_totp_enroll(&config, &account, &expand_tilde(&state))
            }
            TotpAction::Confirm { code, state } => {
                cmd_totp_confirm(&code, &expand_tilde(&state))
            }
            TotpAction::Code { state } => cmd_totp_code(&expand_tilde(&state)),
            TotpAction::Verify { code, state } => {
                cmd_totp_verify(&config, &code, &expand_tilde(&state))
            }
        },
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<VdfsConfig> {
    let path = expand_tilde(path);
    if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        tracing::debug!("no config file, using defaults");
        Ok(VdfsConfig::default())
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if s.starts_with("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(format!("{}/{}", home, &s[2..]))
    } else {
        path.to_path_buf()
    }
}

// ── Passphrase entry ──────────────────────────────────────────────────────────

fn prompt_passphrase(confirm: bool) -> Result<SecretString> {
    let first = rpassword::prompt_password("Passphrase: ").context("reading passphrase")?;
    if first.is_empty() {
        bail!("passphrase must not be empty");
    }
    if confirm {
        let second =
            rpassword::prompt_password("Confirm passphrase: ").context("reading passphrase")?;
        if first != second {
            bail!("passphrases do not match");
        }
    }
    Ok(SecretString::from(first))
}

// ── `vdfs encrypt` ────────────────────────────────────────────────────────────

fn cmd_encrypt(config: &VdfsConfig, file: &Path, out: Option<&Path>) -> Result<()> {
    let plaintext =
        fs::read(file).with_context(|| format!("reading input: {}", file.display()))?;

    let out_path = out
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| blob_path_for(file));
    let meta_path = meta_path_for(&out_path);

    let passphrase = prompt_passphrase(true)?;
    let envelope = vdfs_crypto::encrypt_with(&plaintext, &passphrase, &config.kdf.params())
        .context("encrypting file")?;

    let meta = FileMeta {
        version: META_VERSION,
        iv: envelope.iv.clone(),
        kdf_salt: envelope.kdf_salt.clone(),
    };

    fs::write(&out_path, &envelope.ciphertext)
        .with_context(|| format!("writing blob: {}", out_path.display()))?;
    fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?)
        .with_context(|| format!("writing metadata: {}", meta_path.display()))?;

    println!("Encrypted: {} → {}", file.display(), out_path.display());
    println!("  bytes:    {}", envelope.ciphertext.len());
    println!("  metadata: {}", meta_path.display());
    println!();
    println!("Keep the passphrase safe: without it this file cannot be recovered.");

    Ok(())
}

// ── `vdfs decrypt` ────────────────────────────────────────────────────────────

fn cmd_decrypt(config: &VdfsConfig, file: &Path, out: Option<&Path>) -> Result<()> {
    let ciphertext =
        fs::read(file).with_context(|| format!("reading blob: {}", file.display()))?;

    let meta_path = meta_path_for(file);
    let meta_raw = fs::read_to_string(&meta_path)
        .with_context(|| format!("reading metadata sidecar: {}", meta_path.display()))?;
    let meta: FileMeta = serde_json::from_str(&meta_raw)
        .with_context(|| format!("parsing metadata: {}", meta_path.display()))?;
    if meta.version != META_VERSION {
        bail!("unsupported metadata version: {}", meta.version);
    }

    let envelope = CipherEnvelope {
        ciphertext,
        iv: meta.iv,
        kdf_salt: meta.kdf_salt,
    };

    let out_path = out
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| plain_path_for(file));

    let passphrase = prompt_passphrase(false)?;
    let plaintext = vdfs_crypto::decrypt_with(&envelope, &passphrase, &config.kdf.params())
        .context("decryption failed (incorrect passphrase?)")?;

    fs::write(&out_path, &plaintext)
        .with_context(|| format!("writing output: {}", out_path.display()))?;

    println!("Decrypted: {} → {}", file.display(), out_path.display());
    println!("  bytes: {}", plaintext.len());

    Ok(())
}

// ── Blob/metadata path conventions ────────────────────────────────────────────

const BLOB_SUFFIX: &str = "vd";

fn blob_path_for(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".");
    name.push(BLOB_SUFFIX);
    PathBuf::from(name)
}

fn plain_path_for(blob: &Path) -> PathBuf {
    match blob.extension() {
        Some(ext) if ext == BLOB_SUFFIX => blob.with_extension(""),
        _ => {
            let mut name = blob.as_os_str().to_os_string();
            name.push(".out");
            PathBuf::from(name)
        }
    }
}

fn meta_path_for(blob: &Path) -> PathBuf {
    let mut name = blob.as_os_str().to_os_string();
    name.push(".meta.json");
    PathBuf::from(name)
}

// ── Two-factor state file ─────────────────────────────────────────────────────

fn load_totp_state(path: &Path) -> Result<TotpStateFile> {
    let raw = fs::read_to_string(path).with_context(|| {
        format!(
            "reading two-factor state: {} (run `vdfs totp enroll` first?)",
            path.display()
        )
    })?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing two-factor state: {}", path.display()))
}

fn store_totp_state(path: &Path, state: &TotpStateFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating state directory: {}", parent.display()))?;
    }
    fs::write(path, serde_json::to_vec_pretty(state)?)
        .with_context(|| format!("writing two-factor state: {}", path.display()))
}

// ── `vdfs totp enroll` ────────────────────────────────────────────────────────

fn cmd_totp_enroll(config: &VdfsConfig, account: &str, state_path: &Path) -> Result<()> {
    // A state file that exists but fails to parse is surfaced, not
    // overwritten: it may hold an active secret.
    let mut file = if state_path.exists() {
        load_totp_state(state_path)?
    } else {
        TotpStateFile {
            account: account.to_string(),
            state: TwoFactorState::default(),
        }
    };
    file.account = account.to_string();

    let secret = file
        .state
        .begin_enrollment()
        .context("two-factor is already enabled; disable it before re-enrolling")?;
    let uri = vdfs_totp::provisioning_uri(&config.totp.issuer, account, &secret);

    store_totp_state(state_path, &file)?;

    println!("Scan this URI with your authenticator app (or enter the secret manually):");
    println!();
    println!("  {uri}");
    println!();
    println!("  secret: {secret}");
    println!();
    println!("Then run `vdfs totp confirm --code <6 digits>` to activate.");

    Ok(())
}

// ── `vdfs totp confirm` ───────────────────────────────────────────────────────

fn cmd_totp_confirm(code: &str, state_path: &Path) -> Result<()> {
    let mut file = load_totp_state(state_path)?;

    let advanced = file
        .state
        .confirm(code, &SystemClock)
        .context("confirming enrollment")?;
    if !advanced {
        bail!("code did not match; check the authenticator and try again");
    }

    store_totp_state(state_path, &file)?;
    println!("Two-factor enabled for {}.", file.account);

    Ok(())
}

// ── `vdfs totp code` ──────────────────────────────────────────────────────────

fn cmd_totp_code(state_path: &Path) -> Result<()> {
    let file = load_totp_state(state_path)?;
    let secret = file
        .state
        .secret()
        .context("no two-factor secret stored; run `vdfs totp enroll` first")?;

    let code = vdfs_totp::generate_code(secret, 0, &SystemClock)?;
    println!("{code}");

    Ok(())
}

// ── `vdfs totp verify` ────────────────────────────────────────────────────────

fn cmd_totp_verify(config: &VdfsConfig, code: &str, state_path: &Path) -> Result<()> {
    let file = load_totp_state(state_path)?;

    let ok = file
        .state
        .verify_login(code, config.totp.window, &SystemClock)
        .context("verifying code (is enrollment confirmed?)")?;

    if ok {
        println!("valid");
        Ok(())
    } else {
        println!("invalid");
        std::process::exit(1);
    }
}

// ── `vdfs config show` ────────────────────────────────────────────────────────

fn cmd_config_show(config: &VdfsConfig, config_path: &Path) -> Result<()> {
    let config_path = expand_tilde(config_path);
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
