//! Two-phase second-factor enrollment
//!
//! The account store persists this state machine next to the user record:
//!
//! ```text
//! Unprovisioned ──begin_enrollment──▶ PendingVerification{secret}
//! PendingVerification ──confirm(valid code)──▶ Enabled{secret}
//! any phase ──disable──▶ Unprovisioned
//! ```
//!
//! A pending secret is provisional: beginning again replaces it, and the
//! factor counts for nothing at login until the user has proven their
//! authenticator produces matching codes. Once `Enabled`, the secret is
//! immutable; re-enrollment requires an explicit `disable` first, since a
//! regenerated secret invalidates the app the user already provisioned.
//!
//! The machine itself is pure: every transition is a plain function of
//! (state, input, clock), and persistence stays with the caller.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::Clock;
use crate::engine::{generate_secret, provisioning_uri, verify_code};
use crate::error::{TotpError, TotpResult};
use crate::DEFAULT_WINDOW;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TwoFactorState {
    /// No second factor configured.
    Unprovisioned,
    /// A secret has been issued but the user has not yet proven their
    /// authenticator holds it. Not honored at login.
    PendingVerification { secret: String },
    /// Enrollment confirmed; the secret is live and immutable.
    Enabled { secret: String },
}

impl TwoFactorState {
    fn phase(&self) -> &'static str {
        match self {
            Self::Unprovisioned => "unprovisioned",
            Self::PendingVerification { .. } => "pending_verification",
            Self::Enabled { .. } => "enabled",
        }
    }

    /// Issue a fresh secret and move to `PendingVerification`.
    ///
    /// Allowed from `Unprovisioned` and from `PendingVerification` (the
    /// user abandoned a setup screen and started over). Errors from
    /// `Enabled`: an active factor must be disabled explicitly first.
    pub fn begin_enrollment(&mut self) -> TotpResult<String> {
        match self {
            Self::Enabled { .. } => Err(TotpError::InvalidPhase(self.phase())),
            _ => {
                let secret = generate_secret();
                *self = Self::PendingVerification {
                    secret: secret.clone(),
                };
                info!("two-factor enrollment started");
                Ok(secret)
            }
        }
    }

    /// Prove the authenticator was provisioned correctly and activate the
    /// factor. Returns whether the state advanced; a wrong code leaves the
    /// pending secret in place for another attempt.
    pub fn confirm(&mut self, candidate: &str, clock: &dyn Clock) -> TotpResult<bool> {
        let Self::PendingVerification { secret } = self else {
            return Err(TotpError::InvalidPhase(self.phase()));
        };

        if !verify_code(candidate, secret, DEFAULT_WINDOW, clock)? {
            return Ok(false);
        }

        let secret = std::mem::take(secret);
        *self = Self::Enabled { secret };
        info!("two-factor enrollment confirmed");
        Ok(true)
    }

    /// Check a login code against the active secret.
    pub fn verify_login(&self, candidate: &str, window: u32, clock: &dyn Clock) -> TotpResult<bool> {
        let Self::Enabled { secret } = self else {
            return Err(TotpError::InvalidPhase(self.phase()));
        };
        verify_code(candidate, secret, window, clock)
    }

    /// Drop the factor entirely, from any phase.
    pub fn disable(&mut self) {
        if !matches!(self, Self::Unprovisioned) {
            info!("two-factor disabled");
        }
        *self = Self::Unprovisioned;
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// The current secret, pending or enabled.
    pub fn secret(&self) -> Option<&str> {
        match self {
            Self::Unprovisioned => None,
            Self::PendingVerification { secret } | Self::Enabled { secret } => Some(secret),
        }
    }

    /// The `otpauth://` URI for the current secret, if any.
    pub fn provisioning_uri(&self, issuer: &str, account_label: &str) -> Option<String> {
        self.secret()
            .map(|secret| provisioning_uri(issuer, account_label, secret))
    }
}

impl Default for TwoFactorState {
    fn default() -> Self {
        Self::Unprovisioned
    }
}

// Hand-written so the secret never reaches logs through `{:?}`.
impl std::fmt::Debug for TwoFactorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoFactorState")
            .field("phase", &self.phase())
            .finish()
    }
}
