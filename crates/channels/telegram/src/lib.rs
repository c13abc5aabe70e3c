//! # Twofold Telegram Channel
//!
//! Telegram integration: a two-factor token channel over the bot chat, a
//! chat-driven password-reset service, and the bot-side handler that
//! consumes replies to the bot's control messages.

pub mod channel;
pub mod client;
pub mod handler;
pub mod reset;
pub mod store;
pub mod wire;

pub use channel::TelegramChannel;
pub use client::{BotClient, BotProfile, TelegramApi};
pub use handler::BotHandler;
pub use reset::{TelegramResetRequest, TelegramResetService};
pub use store::{
    REGISTER_USER_MESSAGE, RESET_PASSWORD_MESSAGE, TELEGRAM_ID_KEY, TelegramStore, TelegramUserExt,
};
pub use wire::{Chat, Contact, KeyboardButton, Message, ReplyMarkup, Sender, Update};
