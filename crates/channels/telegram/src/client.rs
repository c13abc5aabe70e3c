//! Thin HTTP client for the Telegram Bot API.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use twofold_core::error::{AuthError, AuthResult};

use crate::wire::ReplyMarkup;

const CHANNEL: &str = "Telegram";

/// The bot's own identity, as reported by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotProfile {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// The subset of the Bot API the channel and handler need.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// Sends a text message, returning the new message's id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<ReplyMarkup>,
    ) -> AuthResult<i64>;

    /// Deletes a message from a chat. Deleting an already-gone message is
    /// not an error.
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> AuthResult<()>;

    /// Returns the bot's own profile.
    async fn get_me(&self) -> AuthResult<BotProfile>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Bot API client over HTTPS.
pub struct BotClient {
    http: reqwest::Client,
    base: String,
}

impl BotClient {
    /// Creates a client for the bot identified by `token`.
    pub fn new(token: &str) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AuthError::configuration(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base: format!("https://api.telegram.org/bot{token}"),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &Value) -> AuthResult<T> {
        let url = format!("{}/{method}", self.base);
        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AuthError::channel(CHANNEL, format!("{method}: {e}")))?;
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| AuthError::channel(CHANNEL, format!("{method}: {e}")))?;
        if !body.ok {
            let description = body.description.unwrap_or_else(|| "request failed".into());
            return Err(AuthError::channel(CHANNEL, format!("{method}: {description}")));
        }
        body.result
            .ok_or_else(|| AuthError::channel(CHANNEL, format!("{method}: empty result")))
    }
}

#[async_trait]
impl TelegramApi for BotClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<ReplyMarkup>,
    ) -> AuthResult<i64> {
        let mut payload = json!({ "chat_id": chat_id, "text": text });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }
        let sent: SentMessage = self.call("sendMessage", &payload).await?;
        debug!(chat_id, message_id = sent.message_id, "message sent");
        Ok(sent.message_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> AuthResult<()> {
        let payload = json!({ "chat_id": chat_id, "message_id": message_id });
        match self.call::<bool>("deleteMessage", &payload).await {
            Ok(_) => Ok(()),
            // The message may already be gone or too old to delete.
            Err(AuthError::Channel { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn get_me(&self) -> AuthResult<BotProfile> {
        self.call("getMe", &json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_without_result() {
        let body: ApiResponse<SentMessage> = serde_json::from_value(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        }))
        .unwrap();
        assert!(!body.ok);
        assert!(body.result.is_none());
        assert_eq!(body.description.as_deref(), Some("Bad Request: chat not found"));
    }

    #[test]
    fn envelope_parses_sent_message() {
        let body: ApiResponse<SentMessage> = serde_json::from_value(json!({
            "ok": true,
            "result": { "message_id": 7, "date": 1700000000 }
        }))
        .unwrap();
        assert!(body.ok);
        assert_eq!(body.result.unwrap().message_id, 7);
        assert!(body.description.is_none());
    }
}
