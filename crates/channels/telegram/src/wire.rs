//! Bot API wire types.
//!
//! Only the handful of fields the handler inspects are modeled; unknown
//! fields are ignored on deserialization.

use serde::{Deserialize, Serialize};

/// An incoming update from the Bot API.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// An incoming chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<Sender>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,
    #[serde(default)]
    pub contact: Option<Contact>,
}

/// The author of a message.
#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
}

/// The chat a message belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A shared contact card.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Outbound reply markup for `sendMessage`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    ForceReply {
        force_reply: bool,
    },
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
        one_time_keyboard: bool,
    },
}

impl ReplyMarkup {
    /// Markup that opens the reply interface on the user's client.
    pub fn force_reply() -> Self {
        Self::ForceReply { force_reply: true }
    }

    /// One-time keyboard asking the user to share their own contact card.
    pub fn contact_keyboard(share_label: &str, cancel_label: &str) -> Self {
        Self::Keyboard {
            keyboard: vec![
                vec![KeyboardButton {
                    text: share_label.to_string(),
                    request_contact: Some(true),
                }],
                vec![KeyboardButton {
                    text: cancel_label.to_string(),
                    request_contact: None,
                }],
            ],
            resize_keyboard: true,
            one_time_keyboard: true,
        }
    }
}

/// A button on a reply keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_contact: Option<bool>,
}
