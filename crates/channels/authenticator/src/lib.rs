//! # Twofold Authenticator Channel
//!
//! Two-factor channel backed by an authenticator app (Google Authenticator,
//! Authy, etc.). The shared secret lives on the user record, so no token is
//! ever sent: the user reads the current code off their device.

use async_trait::async_trait;
use totp_rs::{Algorithm, TOTP};

use twofold_core::error::AuthResult;
use twofold_core::manager::UserManager;
use twofold_core::traits::{TokenChannel, TwoFactorChannel};
use twofold_core::types::{SendTokenOutcome, User};

/// Extension key holding the user's base32-encoded authenticator secret.
pub const AUTHENTICATOR_SECRET_KEY: &str = "authenticator_secret";

/// Convenience accessors for the authenticator secret on a [`User`].
pub trait AuthenticatorUserExt {
    fn authenticator_secret(&self) -> Option<String>;
    fn set_authenticator_secret(&mut self, secret: &str);
    fn clear_authenticator_secret(&mut self);
}

impl AuthenticatorUserExt for User {
    fn authenticator_secret(&self) -> Option<String> {
        self.get_extension(AUTHENTICATOR_SECRET_KEY)
    }

    fn set_authenticator_secret(&mut self, secret: &str) {
        self.set_extension(AUTHENTICATOR_SECRET_KEY, secret);
    }

    fn clear_authenticator_secret(&mut self) {
        self.remove_extension(AUTHENTICATOR_SECRET_KEY);
    }
}

/// Generates a new base32-encoded authenticator secret.
pub fn generate_secret() -> String {
    use rand::RngCore;
    let mut rng = rand::thread_rng();
    let mut secret = vec![0u8; 20];
    rng.fill_bytes(&mut secret);
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &secret)
}

/// Two-factor channel validating codes from an authenticator app.
pub struct AuthenticatorChannel {
    issuer: String,
    digits: usize,
    period: u64,
}

impl AuthenticatorChannel {
    /// Creates a channel with the standard 6-digit, 30-second profile.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            digits: 6,
            period: 30,
        }
    }

    /// Generates an `otpauth://` provisioning URI for QR-code enrollment.
    pub fn provisioning_uri(&self, account: &str, secret: &str) -> String {
        format!(
            "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
            url_encode(&self.issuer),
            url_encode(account),
            secret,
            url_encode(&self.issuer),
            self.digits,
            self.period
        )
    }

    fn totp_for(&self, secret: &str) -> Option<TOTP> {
        let secret_bytes =
            base32::decode(base32::Alphabet::Rfc4648 { padding: false }, secret)?;
        Some(TOTP::new_unchecked(
            Algorithm::SHA1,
            self.digits,
            1,
            self.period,
            secret_bytes,
        ))
    }
}

#[async_trait]
impl TwoFactorChannel for AuthenticatorChannel {
    fn name(&self) -> &str {
        "Authenticator"
    }

    fn request_message(&self) -> &str {
        "Enter the code from your authenticator app."
    }

    async fn is_suitable(&self, _manager: &UserManager, user: &User) -> AuthResult<bool> {
        Ok(user.authenticator_secret().is_some())
    }
}

#[async_trait]
impl TokenChannel for AuthenticatorChannel {
    fn needs_send(&self) -> bool {
        false
    }

    async fn send_token(
        &self,
        _manager: &UserManager,
        _user: &User,
    ) -> AuthResult<SendTokenOutcome> {
        // The app generates codes on the device; nothing leaves the server.
        Ok(SendTokenOutcome::NotNeeded)
    }

    async fn validate_token(
        &self,
        code: &str,
        _manager: &UserManager,
        user: &User,
    ) -> AuthResult<bool> {
        let Some(secret) = user.authenticator_secret() else {
            return Ok(false);
        };
        let Some(totp) = self.totp_for(&secret) else {
            return Ok(false);
        };
        Ok(totp.check_current(code).unwrap_or(false))
    }

    async fn time_to_wait(&self, _manager: &UserManager, _user: &User) -> AuthResult<u64> {
        Ok(0)
    }
}

/// Minimal percent-encoding for `otpauth://` URI components.
fn url_encode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            ' ' => "%20".to_string(),
            _ => format!("%{:02X}", c as u8),
        })
        .collect()
}
