//! Password reset through the bot chat.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use twofold_core::error::AuthResult;
use twofold_core::manager::UserManager;
use twofold_core::reset::ResetPasswordService;
use twofold_core::types::INTERNAL_PROVIDER;

use crate::client::TelegramApi;
use crate::store::{RESET_PASSWORD_MESSAGE, TelegramStore, TelegramUserExt};
use crate::wire::ReplyMarkup;

/// Prompt sent into the chat; the user answers it with their new password.
pub const RESET_PROMPT: &str = "[RESETPWD] Reply to this message with new password";

/// Data model of a Telegram reset request.
#[derive(Debug, Deserialize)]
pub struct TelegramResetRequest {
    pub phone_number: String,
}

/// Reset service that prompts the user's linked Telegram chat for a new
/// password. The bot handler picks up the reply and completes the reset.
///
/// Requests for unknown numbers, or for accounts without a linked chat,
/// complete silently with the same confirmation.
pub struct TelegramResetService {
    api: Arc<dyn TelegramApi>,
    store: Arc<dyn TelegramStore>,
}

impl TelegramResetService {
    pub fn new(api: Arc<dyn TelegramApi>, store: Arc<dyn TelegramStore>) -> Self {
        Self { api, store }
    }
}

#[async_trait]
impl ResetPasswordService for TelegramResetService {
    fn name(&self) -> &str {
        "Telegram"
    }

    fn request_message(&self) -> &str {
        "Insert your phone number"
    }

    fn confirmation_message(&self) -> &str {
        "Please check your telegram conversations to reset your password"
    }

    async fn process(&self, manager: &UserManager, payload: Value) -> AuthResult<()> {
        let request: TelegramResetRequest = serde_json::from_value(payload)?;
        let Some(user) = manager.find_by_phone(&request.phone_number).await? else {
            debug!("reset requested for unknown phone number");
            return Ok(());
        };
        let Some(chat_id) = user.telegram_id() else {
            debug!(user = %user.id, "reset requested for account without a linked chat");
            return Ok(());
        };

        // A previous prompt may still be pending in the chat; drop it so only
        // the newest one is answerable.
        if let Some(stale) = self
            .store
            .get_chat_token(chat_id, INTERNAL_PROVIDER, RESET_PASSWORD_MESSAGE)
            .await?
            && let Ok(message_id) = stale.parse::<i64>()
        {
            let _ = self.api.delete_message(chat_id, message_id).await;
        }

        let message_id = self
            .api
            .send_message(chat_id, RESET_PROMPT, Some(ReplyMarkup::force_reply()))
            .await?;
        self.store
            .set_chat_token(
                chat_id,
                INTERNAL_PROVIDER,
                RESET_PASSWORD_MESSAGE,
                &message_id.to_string(),
            )
            .await?;
        Ok(())
    }
}
