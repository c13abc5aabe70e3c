//! Configuration for the Twofold managers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AuthError, AuthResult};

/// Options governing sign-in, lockout, resend cooldowns and password policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityOptions {
    /// Require two-factor authentication for every user with at least one
    /// suitable channel, regardless of their personal setting. A user with
    /// no suitable channel still signs in with their password alone; there
    /// is no channel to drive the handshake with.
    pub force_two_factor: bool,

    /// Default seconds a user must wait between two token sends.
    pub resend_seconds: u64,

    /// Per-channel overrides of `resend_seconds`, keyed by channel name.
    #[serde(default)]
    pub resend_overrides: HashMap<String, u64>,

    /// Lockout policy applied on failed codes and passwords.
    pub lockout: LockoutOptions,

    /// Time-based code parameters.
    pub totp: TotpOptions,

    /// Password strength requirements.
    pub password: PasswordPolicy,

    /// Seconds a password-reset token stays valid.
    pub reset_token_ttl_secs: u64,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            force_two_factor: false,
            resend_seconds: 60,
            resend_overrides: HashMap::new(),
            lockout: LockoutOptions::default(),
            totp: TotpOptions::default(),
            password: PasswordPolicy::default(),
            reset_token_ttl_secs: 15 * 60,
        }
    }
}

impl IdentityOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resend cooldown for the named channel, honoring overrides.
    pub fn resend_seconds_for(&self, channel: &str) -> u64 {
        self.resend_overrides
            .get(channel)
            .copied()
            .unwrap_or(self.resend_seconds)
    }

    /// Forces two-factor authentication on.
    pub fn force_two_factor(mut self) -> Self {
        self.force_two_factor = true;
        self
    }

    /// Sets the default resend cooldown.
    pub fn resend_seconds(mut self, seconds: u64) -> Self {
        self.resend_seconds = seconds;
        self
    }

    /// Overrides the resend cooldown for one channel.
    pub fn resend_override(mut self, channel: impl Into<String>, seconds: u64) -> Self {
        self.resend_overrides.insert(channel.into(), seconds);
        self
    }

    /// Replaces the lockout policy.
    pub fn lockout(mut self, lockout: LockoutOptions) -> Self {
        self.lockout = lockout;
        self
    }

    /// Replaces the password policy.
    pub fn password(mut self, password: PasswordPolicy) -> Self {
        self.password = password;
        self
    }
}

/// Lockout accounting policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutOptions {
    /// Whether lockout is applied at all.
    pub enabled: bool,
    /// Failed attempts before the account locks.
    pub max_failed_attempts: u32,
    /// How long the lockout lasts, in seconds.
    pub duration_secs: u64,
}

impl Default for LockoutOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: 5,
            duration_secs: 5 * 60,
        }
    }
}

/// Parameters of the security-stamp-based time codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TotpOptions {
    /// Number of digits in a code.
    pub digits: usize,
    /// Time step in seconds.
    pub period: u64,
}

impl Default for TotpOptions {
    fn default() -> Self {
        Self {
            digits: 6,
            period: 180,
        }
    }
}

/// Password strength requirements checked before hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Minimum password length.
    pub min_length: usize,
    /// Require at least one ASCII digit.
    pub require_digit: bool,
    /// Require at least one letter.
    pub require_letter: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_digit: true,
            require_letter: true,
        }
    }
}

impl PasswordPolicy {
    /// Checks a candidate password against the policy.
    pub fn check(&self, password: &str) -> AuthResult<()> {
        if password.chars().count() < self.min_length {
            return Err(AuthError::weak_password(format!(
                "must be at least {} characters long",
                self.min_length
            )));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(AuthError::weak_password("must contain at least one digit"));
        }
        if self.require_letter && !password.chars().any(|c| c.is_alphabetic()) {
            return Err(AuthError::weak_password("must contain at least one letter"));
        }
        Ok(())
    }
}
