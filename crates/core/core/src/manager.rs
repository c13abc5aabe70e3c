//! The user manager: user lookup, passwords, lockout accounting and the
//! token-table bookkeeping the two-factor machinery relies on.
//!
//! The base store has no columns for "remembered 2FA channel" or "last token
//! send time"; both are persisted as opaque entries in the generic token
//! table under the internal provider key.

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::IdentityOptions;
use crate::error::{AuthError, AuthResult};
use crate::traits::{TokenChannel, UserStore};
use crate::types::{INTERNAL_PROVIDER, User};

const TWO_FACTOR_PROVIDER_TOKEN: &str = "TwoFactorProvider";
const LAST_TOKEN_TIME_TOKEN: &str = "LastTokenTime";
const RESET_PASSWORD_TOKEN: &str = "ResetPassword";

#[derive(Debug, Serialize, Deserialize)]
struct ResetTokenRecord {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Provides the APIs for managing users in a persistence store, plus the
/// registry of two-factor channels.
pub struct UserManager {
    store: Arc<dyn UserStore>,
    channels: Vec<Arc<dyn TokenChannel>>,
    options: IdentityOptions,
}

impl UserManager {
    /// Creates a manager over the given store.
    pub fn new(store: Arc<dyn UserStore>, options: IdentityOptions) -> Self {
        Self {
            store,
            channels: Vec::new(),
            options,
        }
    }

    /// Registers a two-factor channel.
    pub fn register_channel(&mut self, channel: Arc<dyn TokenChannel>) {
        self.channels.push(channel);
    }

    /// Builder-style variant of [`register_channel`](Self::register_channel).
    pub fn with_channel(mut self, channel: Arc<dyn TokenChannel>) -> Self {
        self.register_channel(channel);
        self
    }

    /// The configured options.
    pub fn options(&self) -> &IdentityOptions {
        &self.options
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    // ==================== User Operations ====================

    /// Creates a new user.
    pub async fn create_user(&self, user: &User) -> AuthResult<User> {
        self.store.create_user(user).await
    }

    /// Updates an existing user.
    pub async fn update_user(&self, user: &User) -> AuthResult<User> {
        self.store.update_user(user).await
    }

    /// Finds a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        self.store.get_user_by_id(id).await
    }

    /// Finds a user by email.
    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        self.store.get_user_by_email(email).await
    }

    /// Finds a user by phone number.
    pub async fn find_by_phone(&self, phone_number: &str) -> AuthResult<Option<User>> {
        self.store.get_user_by_phone(phone_number).await
    }

    // ==================== Channel Registry ====================

    /// All registered channels.
    pub fn channels(&self) -> &[Arc<dyn TokenChannel>] {
        &self.channels
    }

    /// Looks up a registered channel by name.
    pub fn channel(&self, name: &str) -> Option<Arc<dyn TokenChannel>> {
        self.channels.iter().find(|c| c.name() == name).cloned()
    }

    /// The registered channels suitable for this user.
    pub async fn valid_two_factor_channels(
        &self,
        user: &User,
    ) -> AuthResult<Vec<Arc<dyn TokenChannel>>> {
        let mut suitable = Vec::new();
        for channel in &self.channels {
            if channel.is_suitable(self, user).await? {
                suitable.push(Arc::clone(channel));
            }
        }
        Ok(suitable)
    }

    // ==================== Two-Factor Bookkeeping ====================

    /// Persists the channel the user wants remembered for future sign-ins.
    pub async fn set_two_factor_provider(&self, user: &User, channel: &str) -> AuthResult<()> {
        if self.channel(channel).is_none() {
            return Err(AuthError::UnknownChannel {
                name: channel.to_string(),
            });
        }
        self.store
            .set_token(&user.id, INTERNAL_PROVIDER, TWO_FACTOR_PROVIDER_TOKEN, channel)
            .await
    }

    /// Forgets the remembered channel.
    pub async fn remove_two_factor_provider(&self, user: &User) -> AuthResult<()> {
        self.store
            .remove_token(&user.id, INTERNAL_PROVIDER, TWO_FACTOR_PROVIDER_TOKEN)
            .await
    }

    /// The remembered channel name, if any.
    pub async fn two_factor_provider(&self, user: &User) -> AuthResult<Option<String>> {
        self.store
            .get_token(&user.id, INTERNAL_PROVIDER, TWO_FACTOR_PROVIDER_TOKEN)
            .await
    }

    /// When a token was last sent to this user, if ever recorded.
    ///
    /// An unparsable stored value is treated as absent rather than an error.
    pub async fn last_token_time(&self, user: &User) -> AuthResult<Option<DateTime<Utc>>> {
        let Some(raw) = self
            .store
            .get_token(&user.id, INTERNAL_PROVIDER, LAST_TOKEN_TIME_TOKEN)
            .await?
        else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(dt) => Ok(Some(dt.with_timezone(&Utc))),
            Err(_) => {
                warn!(user = %user.id, "discarding malformed last-send timestamp");
                Ok(None)
            }
        }
    }

    /// Refreshes the last-send timestamp to now. Always moves forward.
    pub async fn record_token_sent(&self, user: &User) -> AuthResult<()> {
        self.store
            .set_token(
                &user.id,
                INTERNAL_PROVIDER,
                LAST_TOKEN_TIME_TOKEN,
                &Utc::now().to_rfc3339(),
            )
            .await
    }

    // ==================== Passwords ====================

    /// Validates the password against the policy, hashes it and rotates the
    /// security stamp. The caller persists the user afterwards.
    pub fn set_password(&self, user: &mut User, password: &str) -> AuthResult<()> {
        self.options.password.check(password)?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)?
            .to_string();
        user.password_hash = Some(hash);
        user.rotate_security_stamp();
        Ok(())
    }

    /// Verifies a password against the stored hash.
    pub fn verify_password(&self, user: &User, password: &str) -> bool {
        let Some(hash) = user.password_hash.as_deref() else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Generates a password-reset token for the user and stores it in the
    /// token table. A new request overwrites any outstanding token.
    pub async fn generate_password_reset_token(&self, user: &User) -> AuthResult<String> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let record = ResetTokenRecord {
            token: token.clone(),
            expires_at: Utc::now() + Duration::seconds(self.options.reset_token_ttl_secs as i64),
        };
        self.store
            .set_token(
                &user.id,
                INTERNAL_PROVIDER,
                RESET_PASSWORD_TOKEN,
                &serde_json::to_string(&record)?,
            )
            .await?;
        Ok(token)
    }

    /// Resets the password after validating the reset token.
    ///
    /// On success the token is consumed, the security stamp rotated and the
    /// lockout state cleared.
    pub async fn reset_password(
        &self,
        user: &User,
        token: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let Some(raw) = self
            .store
            .get_token(&user.id, INTERNAL_PROVIDER, RESET_PASSWORD_TOKEN)
            .await?
        else {
            return Err(AuthError::InvalidToken);
        };
        let record: ResetTokenRecord = serde_json::from_str(&raw)?;
        if record.token != token {
            return Err(AuthError::InvalidToken);
        }
        if record.expires_at < Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        let mut updated = user.clone();
        self.set_password(&mut updated, new_password)?;
        updated.failed_count = 0;
        updated.lockout_until = None;
        self.store.update_user(&updated).await?;
        self.store
            .remove_token(&user.id, INTERNAL_PROVIDER, RESET_PASSWORD_TOKEN)
            .await?;
        debug!(user = %user.id, "password reset completed");
        Ok(())
    }

    // ==================== Lockout Accounting ====================

    /// Whether the user is currently locked out.
    pub fn is_locked_out(&self, user: &User) -> bool {
        if !self.options.lockout.enabled {
            return false;
        }
        matches!(user.lockout_until, Some(until) if until > Utc::now())
    }

    /// Records a failed attempt; returns true when the account just locked.
    pub async fn access_failed(&self, user: &User) -> AuthResult<bool> {
        if !self.options.lockout.enabled {
            return Ok(false);
        }
        let mut updated = user.clone();
        updated.failed_count += 1;
        let locked = updated.failed_count >= self.options.lockout.max_failed_attempts;
        if locked {
            updated.lockout_until =
                Some(Utc::now() + Duration::seconds(self.options.lockout.duration_secs as i64));
            updated.failed_count = 0;
            warn!(user = %user.id, "account locked out after repeated failures");
        }
        updated.updated_at = Utc::now();
        self.store.update_user(&updated).await?;
        Ok(locked)
    }

    /// Clears the failure counter after a successful sign-in.
    pub async fn reset_lockout(&self, user: &User) -> AuthResult<()> {
        if user.failed_count == 0 && user.lockout_until.is_none() {
            return Ok(());
        }
        let mut updated = user.clone();
        updated.failed_count = 0;
        updated.lockout_until = None;
        updated.updated_at = Utc::now();
        self.store.update_user(&updated).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// Minimal map-backed store for manager unit tests.
    #[derive(Default)]
    struct MapStore {
        users: RwLock<HashMap<String, User>>,
        tokens: RwLock<HashMap<(String, String, String), String>>,
    }

    #[async_trait]
    impl UserStore for MapStore {
        async fn create_user(&self, user: &User) -> AuthResult<User> {
            self.users
                .write()
                .await
                .insert(user.id.clone(), user.clone());
            Ok(user.clone())
        }

        async fn get_user_by_id(&self, id: &str) -> AuthResult<Option<User>> {
            Ok(self.users.read().await.get(id).cloned())
        }

        async fn get_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn get_user_by_phone(&self, phone_number: &str) -> AuthResult<Option<User>> {
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|u| u.phone_number.as_deref() == Some(phone_number))
                .cloned())
        }

        async fn update_user(&self, user: &User) -> AuthResult<User> {
            self.users
                .write()
                .await
                .insert(user.id.clone(), user.clone());
            Ok(user.clone())
        }

        async fn delete_user(&self, id: &str) -> AuthResult<()> {
            self.users.write().await.remove(id);
            Ok(())
        }

        async fn set_token(
            &self,
            owner_id: &str,
            provider: &str,
            name: &str,
            value: &str,
        ) -> AuthResult<()> {
            self.tokens.write().await.insert(
                (owner_id.into(), provider.into(), name.into()),
                value.into(),
            );
            Ok(())
        }

        async fn get_token(
            &self,
            owner_id: &str,
            provider: &str,
            name: &str,
        ) -> AuthResult<Option<String>> {
            Ok(self
                .tokens
                .read()
                .await
                .get(&(owner_id.into(), provider.into(), name.into()))
                .cloned())
        }

        async fn remove_token(&self, owner_id: &str, provider: &str, name: &str) -> AuthResult<()> {
            self.tokens
                .write()
                .await
                .remove(&(owner_id.into(), provider.into(), name.into()));
            Ok(())
        }
    }

    fn manager() -> UserManager {
        UserManager::new(Arc::new(MapStore::default()), IdentityOptions::default())
    }

    #[tokio::test]
    async fn password_roundtrip() {
        let users = manager();
        let mut user = User::new("u1".into(), "u1@example.com".into());
        users.set_password(&mut user, "correct horse 1").unwrap();
        assert!(users.verify_password(&user, "correct horse 1"));
        assert!(!users.verify_password(&user, "wrong"));
    }

    #[tokio::test]
    async fn weak_password_rejected() {
        let users = manager();
        let mut user = User::default();
        assert!(matches!(
            users.set_password(&mut user, "short"),
            Err(AuthError::WeakPassword { .. })
        ));
        assert!(user.password_hash.is_none());
    }

    #[tokio::test]
    async fn last_token_time_roundtrip() {
        let users = manager();
        let user = User::new("u1".into(), "u1@example.com".into());
        assert_eq!(users.last_token_time(&user).await.unwrap(), None);
        users.record_token_sent(&user).await.unwrap();
        let recorded = users.last_token_time(&user).await.unwrap().unwrap();
        assert!(Utc::now() - recorded < Duration::seconds(5));
    }

    #[tokio::test]
    async fn malformed_last_token_time_is_ignored() {
        let users = manager();
        let user = User::new("u1".into(), "u1@example.com".into());
        users
            .store()
            .set_token(&user.id, INTERNAL_PROVIDER, LAST_TOKEN_TIME_TOKEN, "garbage")
            .await
            .unwrap();
        assert_eq!(users.last_token_time(&user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let users = manager();
        let mut user = User::new("u1".into(), "u1@example.com".into());
        users.set_password(&mut user, "original pass 1").unwrap();
        users.create_user(&user).await.unwrap();

        let token = users.generate_password_reset_token(&user).await.unwrap();
        users
            .reset_password(&user, &token, "fresh password 2")
            .await
            .unwrap();

        let stored = users.find_by_id("u1").await.unwrap().unwrap();
        assert!(users.verify_password(&stored, "fresh password 2"));
        assert_ne!(stored.security_stamp, user.security_stamp);

        // consumed
        assert!(matches!(
            users.reset_password(&stored, &token, "third password 3").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn wrong_reset_token_rejected() {
        let users = manager();
        let user = User::new("u1".into(), "u1@example.com".into());
        users.create_user(&user).await.unwrap();
        users.generate_password_reset_token(&user).await.unwrap();
        assert!(matches!(
            users.reset_password(&user, "nope", "valid password 1").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn lockout_trips_after_max_failures() {
        let users = manager();
        let user = User::new("u1".into(), "u1@example.com".into());
        users.create_user(&user).await.unwrap();

        let max = users.options().lockout.max_failed_attempts;
        let mut current = user.clone();
        for attempt in 1..=max {
            let locked = users.access_failed(&current).await.unwrap();
            current = users.find_by_id("u1").await.unwrap().unwrap();
            assert_eq!(locked, attempt == max);
        }
        assert!(users.is_locked_out(&current));

        users.reset_lockout(&current).await.unwrap();
        let current = users.find_by_id("u1").await.unwrap().unwrap();
        assert!(!users.is_locked_out(&current));
    }
}
