//! Two-factor codes delivered by email.

use async_trait::async_trait;
use std::sync::Arc;

use twofold_core::channel::ChannelCore;
use twofold_core::config::IdentityOptions;
use twofold_core::error::AuthResult;
use twofold_core::manager::UserManager;
use twofold_core::totp::SecurityStampTotp;
use twofold_core::traits::{TokenChannel, TokenDelivery, TwoFactorChannel};
use twofold_core::types::{SendTokenOutcome, User};

use crate::EmailSender;

pub const CHANNEL_NAME: &str = "Email";

/// Token channel that mails time-based codes to the user's confirmed
/// email address.
pub struct EmailChannel {
    core: ChannelCore,
    sender: Arc<dyn EmailSender>,
}

impl EmailChannel {
    pub fn new(options: &IdentityOptions, sender: Arc<dyn EmailSender>) -> Self {
        let generator = SecurityStampTotp::for_channel(options.totp, |purpose, user| {
            if !user.email_verified || user.email.is_empty() {
                return None;
            }
            Some(format!("{CHANNEL_NAME}:{purpose}:{}", user.email))
        });
        Self {
            core: ChannelCore::new(
                CHANNEL_NAME,
                Arc::new(generator),
                options.resend_seconds_for(CHANNEL_NAME),
            ),
            sender,
        }
    }
}

#[async_trait]
impl TwoFactorChannel for EmailChannel {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn request_message(&self) -> &str {
        "A sign-in code will be sent to your email address."
    }

    async fn is_suitable(&self, _manager: &UserManager, user: &User) -> AuthResult<bool> {
        self.core.is_suitable(user).await
    }
}

#[async_trait]
impl TokenChannel for EmailChannel {
    fn needs_send(&self) -> bool {
        true
    }

    async fn send_token(&self, manager: &UserManager, user: &User) -> AuthResult<SendTokenOutcome> {
        self.core.send_token(self, manager, user).await
    }

    async fn validate_token(
        &self,
        code: &str,
        _manager: &UserManager,
        user: &User,
    ) -> AuthResult<bool> {
        self.core.validate_token(code, user).await
    }

    async fn time_to_wait(&self, manager: &UserManager, user: &User) -> AuthResult<u64> {
        self.core.time_to_wait(manager, user).await
    }
}

#[async_trait]
impl TokenDelivery for EmailChannel {
    async fn deliver(
        &self,
        token: &str,
        _manager: &UserManager,
        user: &User,
    ) -> AuthResult<SendTokenOutcome> {
        self.sender
            .send(
                &user.email,
                "Your sign-in code",
                &format!("Your sign-in code is {token}. It expires shortly."),
            )
            .await?;
        Ok(SendTokenOutcome::Sent)
    }
}
