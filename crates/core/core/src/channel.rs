//! Generator-backed channel skeleton.
//!
//! Concrete channels embed a [`ChannelCore`] and implement only the
//! transport ([`TokenDelivery`]); the core drives the resend cooldown, token
//! generation and send bookkeeping in one place.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::error::AuthResult;
use crate::manager::UserManager;
use crate::traits::{TokenDelivery, TokenGenerator};
use crate::types::{SendTokenOutcome, User, purposes};

/// Shared state and behavior of a generator-backed token channel.
pub struct ChannelCore {
    name: String,
    generator: Arc<dyn TokenGenerator>,
    resend_seconds: u64,
}

impl ChannelCore {
    /// Creates a channel core.
    pub fn new(
        name: impl Into<String>,
        generator: Arc<dyn TokenGenerator>,
        resend_seconds: u64,
    ) -> Self {
        Self {
            name: name.into(),
            generator,
            resend_seconds,
        }
    }

    /// The channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the generator can produce codes for this user.
    pub async fn is_suitable(&self, user: &User) -> AuthResult<bool> {
        self.generator.can_generate(user).await
    }

    /// Seconds remaining before a resend is allowed.
    ///
    /// Purely a stored-timestamp comparison: the last-send time recorded in
    /// the token table plus the configured window, evaluated lazily against
    /// now. No timer is armed anywhere.
    pub async fn time_to_wait(&self, manager: &UserManager, user: &User) -> AuthResult<u64> {
        let Some(last) = manager.last_token_time(user).await? else {
            return Ok(0);
        };
        let next = last + Duration::seconds(self.resend_seconds as i64);
        let now = Utc::now();
        if next <= now {
            return Ok(0);
        }
        Ok((next - now).num_seconds().max(1) as u64)
    }

    /// Generates a token and hands it to `delivery`, refreshing the
    /// last-send timestamp on success.
    pub async fn send_token(
        &self,
        delivery: &dyn TokenDelivery,
        manager: &UserManager,
        user: &User,
    ) -> AuthResult<SendTokenOutcome> {
        let wait = self.time_to_wait(manager, user).await?;
        if wait > 0 {
            debug!(channel = %self.name, user = %user.id, wait, "resend window still open");
            return Ok(SendTokenOutcome::wait(wait));
        }

        let token = self.generator.generate(purposes::TWO_FACTOR, user).await?;
        let outcome = delivery.deliver(&token, manager, user).await?;
        if outcome.succeeded() {
            manager.record_token_sent(user).await?;
        }
        debug!(channel = %self.name, user = %user.id, %outcome, "token send processed");
        Ok(outcome)
    }

    /// Validates a two-factor code through the channel's generator.
    pub async fn validate_token(&self, code: &str, user: &User) -> AuthResult<bool> {
        self.generator
            .validate(purposes::TWO_FACTOR, code, user)
            .await
    }
}
