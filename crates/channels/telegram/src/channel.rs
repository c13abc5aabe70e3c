//! Two-factor codes delivered through the bot chat.

use async_trait::async_trait;
use std::sync::Arc;

use twofold_core::channel::ChannelCore;
use twofold_core::config::IdentityOptions;
use twofold_core::error::AuthResult;
use twofold_core::manager::UserManager;
use twofold_core::totp::SecurityStampTotp;
use twofold_core::traits::{TokenChannel, TokenDelivery, TwoFactorChannel};
use twofold_core::types::{SendTokenOutcome, User};

use crate::client::TelegramApi;
use crate::store::TelegramUserExt;

pub const CHANNEL_NAME: &str = "Telegram";

/// Token channel that messages time-based codes to the user's linked
/// Telegram account.
pub struct TelegramChannel {
    core: ChannelCore,
    api: Arc<dyn TelegramApi>,
}

impl TelegramChannel {
    pub fn new(options: &IdentityOptions, api: Arc<dyn TelegramApi>) -> Self {
        let generator = SecurityStampTotp::for_channel(options.totp, |purpose, user| {
            let telegram_id = user.telegram_id()?;
            Some(format!("{CHANNEL_NAME}:{purpose}:{telegram_id}"))
        });
        Self {
            core: ChannelCore::new(
                CHANNEL_NAME,
                Arc::new(generator),
                options.resend_seconds_for(CHANNEL_NAME),
            ),
            api,
        }
    }
}

#[async_trait]
impl TwoFactorChannel for TelegramChannel {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn request_message(&self) -> &str {
        "An authentication code was sent to your Telegram account. Enter that code below."
    }

    async fn is_suitable(&self, _manager: &UserManager, user: &User) -> AuthResult<bool> {
        self.core.is_suitable(user).await
    }
}

#[async_trait]
impl TokenChannel for TelegramChannel {
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
impl TokenDelivery for TelegramChannel {
    async fn deliver(
        &self,
        token: &str,
        _manager: &UserManager,
        user: &User,
    ) -> AuthResult<SendTokenOutcome> {
        let Some(telegram_id) = user.telegram_id() else {
            return Ok(SendTokenOutcome::Failed);
        };
        self.api
            .send_message(
                telegram_id,
                &format!("Please, to authenticate use this code {token}"),
                None,
            )
            .await?;
        Ok(SendTokenOutcome::Sent)
    }
}
