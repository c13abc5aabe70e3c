//! Password reset over email.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use twofold_core::error::{AuthError, AuthResult};
use twofold_core::manager::UserManager;
use twofold_core::reset::ResetPasswordService;

use crate::EmailSender;

/// Data model of an email reset request.
#[derive(Debug, Deserialize)]
pub struct EmailResetRequest {
    pub email: String,
}

/// Builds the link a user follows to complete the reset, from the encoded
/// token.
pub type ResetLinkBuilder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Encodes a reset token for safe embedding in a URL.
pub fn encode_reset_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(token.as_bytes())
}

/// Decodes a reset token from its URL form.
pub fn decode_reset_token(encoded: &str) -> AuthResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    String::from_utf8(bytes).map_err(|_| AuthError::InvalidToken)
}

/// Reset service that mails a one-time link to the account's address.
///
/// Requests for unknown or unconfirmed addresses complete silently with the
/// same confirmation, so the endpoint never reveals whether an account
/// exists.
pub struct EmailResetService {
    sender: Arc<dyn EmailSender>,
    link_builder: ResetLinkBuilder,
}

impl EmailResetService {
    pub fn new(sender: Arc<dyn EmailSender>, link_builder: ResetLinkBuilder) -> Self {
        Self {
            sender,
            link_builder,
        }
    }
}

#[async_trait]
impl ResetPasswordService for EmailResetService {
    fn name(&self) -> &str {
        "Email"
    }

    fn request_message(&self) -> &str {
        "Enter the email address of your account."
    }

    fn confirmation_message(&self) -> &str {
        "If the address belongs to an account, a reset link has been sent."
    }

    async fn process(&self, manager: &UserManager, payload: Value) -> AuthResult<()> {
        let request: EmailResetRequest = serde_json::from_value(payload)?;
        let Some(user) = manager.find_by_email(&request.email).await? else {
            debug!("reset requested for unknown address");
            return Ok(());
        };
        if !user.email_verified {
            debug!(user = %user.id, "reset requested for unconfirmed address");
            return Ok(());
        }

        let token = manager.generate_password_reset_token(&user).await?;
        let link = (self.link_builder)(&encode_reset_token(&token));
        self.sender
            .send(
                &user.email,
                "Reset your password",
                &format!("Follow this link to choose a new password: {link}"),
            )
            .await?;
        Ok(())
    }
}
