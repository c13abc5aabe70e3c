//! Telegram-specific persistence.

use async_trait::async_trait;

use twofold_core::error::AuthResult;
use twofold_core::types::User;

/// Extension key holding the user's Telegram account id.
pub const TELEGRAM_ID_KEY: &str = "telegram_id";

/// Chat token holding the message id of the pending reset prompt.
pub const RESET_PASSWORD_MESSAGE: &str = "ResetPasswordMessage";

/// Chat token holding the message id of the pending registration prompt.
pub const REGISTER_USER_MESSAGE: &str = "RegisterUserMessage";

/// Convenience accessors for the Telegram id on a [`User`].
pub trait TelegramUserExt {
    fn telegram_id(&self) -> Option<i64>;
    fn set_telegram_id(&mut self, telegram_id: i64);
    fn clear_telegram_id(&mut self);
}

impl TelegramUserExt for User {
    fn telegram_id(&self) -> Option<i64> {
        self.get_extension(TELEGRAM_ID_KEY)
    }

    fn set_telegram_id(&mut self, telegram_id: i64) {
        self.set_extension(TELEGRAM_ID_KEY, telegram_id);
    }

    fn clear_telegram_id(&mut self) {
        self.remove_extension(TELEGRAM_ID_KEY);
    }
}

/// Extra store surface the Telegram flows need.
///
/// Chat tokens mirror the generic user token table, but are keyed by a chat
/// id instead of a user id: the registration flow must track state for chats
/// that do not belong to any known user yet.
#[async_trait]
pub trait TelegramStore: Send + Sync {
    /// Finds the user whose account is linked to the given Telegram id.
    async fn find_by_telegram_id(&self, telegram_id: i64) -> AuthResult<Option<User>>;

    /// Stores a chat token, overwriting any existing `(chat, provider, name)`
    /// entry.
    async fn set_chat_token(
        &self,
        chat_id: i64,
        provider: &str,
        name: &str,
        value: &str,
    ) -> AuthResult<()>;

    /// Gets a stored chat token.
    async fn get_chat_token(
        &self,
        chat_id: i64,
        provider: &str,
        name: &str,
    ) -> AuthResult<Option<String>>;

    /// Removes a chat token. Removing a missing token is not an error.
    async fn remove_chat_token(&self, chat_id: i64, provider: &str, name: &str) -> AuthResult<()>;
}
