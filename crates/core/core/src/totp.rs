//! Time-based codes keyed on the user's security stamp.

use async_trait::async_trait;
use std::sync::Arc;
use totp_rs::{Algorithm, TOTP};

use crate::config::TotpOptions;
use crate::error::{AuthError, AuthResult};
use crate::traits::TokenGenerator;
use crate::types::{User, purposes};

/// Produces the per-user entropy modifier for a channel, or `None` when the
/// contact detail the channel keys on is missing.
pub type StampModifier = Arc<dyn Fn(&str, &User) -> Option<String> + Send + Sync>;

/// A [`TokenGenerator`] producing RFC 6238 codes derived from the user's
/// security stamp and a channel-specific modifier.
///
/// Rotating the security stamp invalidates every outstanding code. One step
/// of clock skew is accepted in both directions.
#[derive(Clone)]
pub struct SecurityStampTotp {
    digits: usize,
    period: u64,
    modifier: StampModifier,
}

impl SecurityStampTotp {
    /// Creates a generator with the given code parameters and modifier.
    pub fn new(options: TotpOptions, modifier: StampModifier) -> Self {
        Self {
            digits: options.digits,
            period: options.period,
            modifier,
        }
    }

    /// Convenience constructor for channels whose modifier is a plain
    /// `"{channel}:{purpose}:{detail}"` string.
    pub fn for_channel<F>(options: TotpOptions, modifier: F) -> Self
    where
        F: Fn(&str, &User) -> Option<String> + Send + Sync + 'static,
    {
        Self::new(options, Arc::new(modifier))
    }

    fn totp_for(&self, purpose: &str, user: &User) -> AuthResult<Option<TOTP>> {
        let Some(modifier) = (self.modifier)(purpose, user) else {
            return Ok(None);
        };
        let mut secret = user.security_stamp.as_bytes().to_vec();
        secret.extend_from_slice(modifier.as_bytes());
        Ok(Some(TOTP::new_unchecked(
            Algorithm::SHA1,
            self.digits,
            1,
            self.period,
            secret,
        )))
    }
}

#[async_trait]
impl TokenGenerator for SecurityStampTotp {
    async fn can_generate(&self, user: &User) -> AuthResult<bool> {
        Ok((self.modifier)(purposes::TWO_FACTOR, user).is_some())
    }

    async fn generate(&self, purpose: &str, user: &User) -> AuthResult<String> {
        let totp = self
            .totp_for(purpose, user)?
            .ok_or_else(|| AuthError::channel(purpose, "user has no usable contact detail"))?;
        totp.generate_current()
            .map_err(|e| AuthError::internal(format!("system clock error: {e}")))
    }

    async fn validate(&self, purpose: &str, token: &str, user: &User) -> AuthResult<bool> {
        let Some(totp) = self.totp_for(purpose, user)? else {
            return Ok(false);
        };
        totp.check_current(token)
            .map_err(|e| AuthError::internal(format!("system clock error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> SecurityStampTotp {
        SecurityStampTotp::for_channel(TotpOptions::default(), |purpose, user| {
            Some(format!("Test:{purpose}:{}", user.email))
        })
    }

    #[tokio::test]
    async fn generated_code_validates() {
        let user = User::new("u1".into(), "u1@example.com".into());
        let totp = generator();
        let code = totp.generate(purposes::TWO_FACTOR, &user).await.unwrap();
        assert!(
            totp.validate(purposes::TWO_FACTOR, &code, &user)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn purpose_is_part_of_the_key() {
        let user = User::new("u1".into(), "u1@example.com".into());
        let totp = generator();
        let code = totp.generate(purposes::TWO_FACTOR, &user).await.unwrap();
        assert!(
            !totp
                .validate(purposes::RESET_PASSWORD, &code, &user)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn stamp_rotation_invalidates_codes() {
        let mut user = User::new("u1".into(), "u1@example.com".into());
        let totp = generator();
        let code = totp.generate(purposes::TWO_FACTOR, &user).await.unwrap();
        user.rotate_security_stamp();
        assert!(
            !totp
                .validate(purposes::TWO_FACTOR, &code, &user)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn missing_detail_means_no_generation() {
        let user = User::default();
        let totp = SecurityStampTotp::for_channel(TotpOptions::default(), |_, _| None);
        assert!(!totp.can_generate(&user).await.unwrap());
        assert!(totp.generate(purposes::TWO_FACTOR, &user).await.is_err());
        assert!(
            !totp
                .validate(purposes::TWO_FACTOR, "123456", &user)
                .await
                .unwrap()
        );
    }
}
