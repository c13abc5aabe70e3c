//! Dispatches bot updates for the chat-driven identity flows.
//!
//! Control messages sent by the bot carry a bracketed tag as their first
//! characters (`[RESETPWD]`, `[UNKNWUSR]`). When a user replies to one of
//! the bot's own control messages, the tag selects the flow that consumes
//! the reply. Everything else is left to other handlers.

use std::sync::Arc;
use tracing::{debug, warn};

use twofold_core::error::{AuthError, AuthResult};
use twofold_core::manager::UserManager;
use twofold_core::types::INTERNAL_PROVIDER;

use crate::client::TelegramApi;
use crate::store::{
    REGISTER_USER_MESSAGE, RESET_PASSWORD_MESSAGE, TelegramStore, TelegramUserExt,
};
use crate::wire::{Message, ReplyMarkup, Update};

const TAG_RESET_PASSWORD: &str = "RESETPWD";
const TAG_UNKNOWN_USER: &str = "UNKNWUSR";

const REGISTER_PROMPT: &str =
    "[UNKNWUSR] Unknown user!\nPlease post your contact card to be identified";
const WRONG_CONTACT_PROMPT: &str =
    "[UNKNWUSR] This isn't your contact card!\nPlease post the right one";

/// Handles replies to the bot's control messages.
pub struct BotHandler {
    api: Arc<dyn TelegramApi>,
    store: Arc<dyn TelegramStore>,
    users: Arc<UserManager>,
    bot_id: i64,
}

impl BotHandler {
    /// Creates a handler for a bot whose id is already known.
    pub fn new(
        api: Arc<dyn TelegramApi>,
        store: Arc<dyn TelegramStore>,
        users: Arc<UserManager>,
        bot_id: i64,
    ) -> Self {
        Self {
            api,
            store,
            users,
            bot_id,
        }
    }

    /// Creates a handler, asking the Bot API for the bot's own id.
    pub async fn connect(
        api: Arc<dyn TelegramApi>,
        store: Arc<dyn TelegramStore>,
        users: Arc<UserManager>,
    ) -> AuthResult<Self> {
        let profile = api.get_me().await?;
        Ok(Self::new(api, store, users, profile.id))
    }

    /// Processes one update. Returns `true` when the update was a reply to
    /// one of this bot's control messages and has been consumed.
    pub async fn handle_update(&self, update: &Update) -> AuthResult<bool> {
        let Some(message) = &update.message else {
            return Ok(false);
        };
        let Some(reply_to) = &message.reply_to_message else {
            return Ok(false);
        };
        if message.from.is_none() {
            return Ok(false);
        }
        if !matches!(&reply_to.from, Some(from) if from.id == self.bot_id) {
            return Ok(false);
        }
        let Some(tag) = reply_to.text.as_deref().and_then(parse_tag) else {
            return Ok(false);
        };

        match tag {
            TAG_RESET_PASSWORD => self.reset_password(message).await,
            TAG_UNKNOWN_USER => self.register_user(message).await,
            other => {
                debug!(tag = other, "unrecognized control tag");
                Ok(false)
            }
        }
    }

    /// Asks an unknown chat to identify itself with a contact card, tracking
    /// the prompt so a later reply can be tied back to it.
    pub async fn ask_to_register(&self, chat_id: i64) -> AuthResult<()> {
        let message_id = self
            .api
            .send_message(
                chat_id,
                REGISTER_PROMPT,
                Some(ReplyMarkup::contact_keyboard("Send\nCONTACT CARD", "Cancel")),
            )
            .await?;
        self.store
            .set_chat_token(
                chat_id,
                INTERNAL_PROVIDER,
                REGISTER_USER_MESSAGE,
                &message_id.to_string(),
            )
            .await?;
        Ok(())
    }

    /// Consumes a reply to a `[RESETPWD]` prompt: the reply text is the new
    /// password.
    async fn reset_password(&self, message: &Message) -> AuthResult<bool> {
        let chat_id = message.chat.id;

        // The reply contains the plaintext password; get it out of the chat
        // history first.
        self.api.delete_message(chat_id, message.message_id).await?;

        let sender = match &message.from {
            Some(sender) => sender,
            None => return Ok(true),
        };
        let Some(user) = self.store.find_by_telegram_id(sender.id).await? else {
            // The chat isn't linked to any account; switch to the
            // identification flow.
            self.ask_to_register(chat_id).await?;
            return Ok(true);
        };

        let token = self.users.generate_password_reset_token(&user).await?;
        let new_password = message.text.as_deref().unwrap_or_default();
        match self.users.reset_password(&user, &token, new_password).await {
            Ok(()) => {
                self.store
                    .remove_chat_token(chat_id, INTERNAL_PROVIDER, RESET_PASSWORD_MESSAGE)
                    .await?;
                self.api
                    .send_message(chat_id, "Your password has been reset", None)
                    .await?;
                Ok(true)
            }
            Err(AuthError::WeakPassword { reason }) => {
                // Tell the user what was wrong and re-arm the prompt.
                let message_id = self
                    .api
                    .send_message(
                        chat_id,
                        &format!(
                            "[RESETPWD] Password {reason}\n\nReply to this message with new password"
                        ),
                        Some(ReplyMarkup::force_reply()),
                    )
                    .await?;
                self.store
                    .set_chat_token(
                        chat_id,
                        INTERNAL_PROVIDER,
                        RESET_PASSWORD_MESSAGE,
                        &message_id.to_string(),
                    )
                    .await?;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Consumes a reply to an `[UNKNWUSR]` prompt: a contact card identifies
    /// the sender, anything else cancels the flow.
    async fn register_user(&self, message: &Message) -> AuthResult<bool> {
        let chat_id = message.chat.id;
        self.api.delete_message(chat_id, message.message_id).await?;

        let sender = match &message.from {
            Some(sender) => sender,
            None => return Ok(true),
        };
        let Some(contact) = &message.contact else {
            // Not a contact card, the user backed out.
            self.store
                .remove_chat_token(chat_id, INTERNAL_PROVIDER, REGISTER_USER_MESSAGE)
                .await?;
            return Ok(true);
        };

        if contact.user_id != Some(sender.id) {
            // Someone else's card proves nothing about the sender.
            warn!(chat_id, "contact card does not belong to the sender");
            let message_id = self
                .api
                .send_message(
                    chat_id,
                    WRONG_CONTACT_PROMPT,
                    Some(ReplyMarkup::contact_keyboard("Send\nCONTACT CARD", "Cancel")),
                )
                .await?;
            self.store
                .set_chat_token(
                    chat_id,
                    INTERNAL_PROVIDER,
                    REGISTER_USER_MESSAGE,
                    &message_id.to_string(),
                )
                .await?;
            return Ok(true);
        }

        self.store
            .remove_chat_token(chat_id, INTERNAL_PROVIDER, REGISTER_USER_MESSAGE)
            .await?;

        let Some(mut user) = self.users.find_by_phone(&contact.phone_number).await? else {
            self.api
                .send_message(chat_id, "No account matches your contact card", None)
                .await?;
            return Ok(true);
        };

        // Linking a chat is a credential change, so the stamp rotates.
        user.set_telegram_id(sender.id);
        user.rotate_security_stamp();
        self.users.update_user(&user).await?;
        self.api
            .send_message(chat_id, "Your Telegram account has been linked", None)
            .await?;
        Ok(true)
    }
}

/// Extracts the control tag from a `[TAG] ...` message.
fn parse_tag(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}
