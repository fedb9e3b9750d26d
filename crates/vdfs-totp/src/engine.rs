//! HOTP/TOTP code generation and sliding-window verification
//!
//! RFC 4226 dynamic truncation over HMAC-SHA1, with the counter taken as
//! `floor(now / 30) + offset` per RFC 6238. Stateless: a code is a pure
//! function of (secret, time step, offset).

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use tracing::debug;

use crate::base32;
use crate::clock::Clock;
use crate::error::{TotpError, TotpResult};
use crate::{CODE_DIGITS, SECRET_LEN, STEP_SECS};

type HmacSha1 = Hmac<Sha1>;

/// Generate a fresh 160-bit secret, Base32-encoded (32 characters).
///
/// `thread_rng` is a CSPRNG; the secret is the long-lived credential the
/// whole second factor rests on.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    base32::encode(&bytes)
}

/// Build the `otpauth://` URI that authenticator apps import via QR code.
///
/// Issuer and account label are percent-encoded per URI component rules;
/// the secret is Base32 and needs no escaping. QR rendering is the
/// caller's concern.
pub fn provisioning_uri(issuer: &str, account_label: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}",
        urlencoding::encode(issuer),
        urlencoding::encode(account_label),
        secret,
        urlencoding::encode(issuer),
    )
}

/// Generate the 6-digit code for the time step `step_offset` steps away
/// from the clock's current one.
pub fn generate_code(secret: &str, step_offset: i64, clock: &dyn Clock) -> TotpResult<String> {
    let key = base32::decode(secret);
    if key.is_empty() {
        return Err(TotpError::InvalidSecret);
    }

    // Clamp at zero so an offset cannot step before the epoch.
    let counter = ((clock.unix_now() / STEP_SECS) as i64 + step_offset).max(0) as u64;
    hotp(&key, counter)
}

/// Check a user-entered code against every step in `[-window, +window]`.
///
/// Whitespace in the candidate is ignored ("123 456" from a copy-paste
/// verifies). Window 1 tolerates ±30 s of clock skew between the
/// authenticator and this machine.
pub fn verify_code(
    candidate: &str,
    secret: &str,
    window: u32,
    clock: &dyn Clock,
) -> TotpResult<bool> {
    let candidate: String = candidate.chars().filter(|c| !c.is_whitespace()).collect();

    let window = i64::from(window);
    for step_offset in -window..=window {
        if generate_code(secret, step_offset, clock)? == candidate {
            debug!(step_offset, "TOTP code accepted");
            return Ok(true);
        }
    }

    debug!("TOTP code rejected");
    Ok(false)
}

/// RFC 4226 §5.3: HMAC-SHA1 over the big-endian counter, dynamic
/// truncation to a 31-bit integer, reduced modulo 10^6.
fn hotp(key: &[u8], counter: u64) -> TotpResult<String> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|_| TotpError::InvalidSecret)?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0F) as usize;
    let binary = (u32::from(digest[offset] & 0x7F) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    Ok(format!("{:0width$}", binary % 1_000_000, width = CODE_DIGITS))
}
