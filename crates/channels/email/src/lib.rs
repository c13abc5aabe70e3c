//! # Twofold Email Channel
//!
//! Email-based two-factor authentication and password reset. The channel
//! mails short-lived codes to confirmed addresses; the reset service mails
//! a one-time link carrying an opaque reset token.

use async_trait::async_trait;

use twofold_core::error::AuthResult;

mod channel;
mod reset;

pub use channel::EmailChannel;
pub use reset::{
    EmailResetRequest, EmailResetService, ResetLinkBuilder, decode_reset_token, encode_reset_token,
};

/// Outbound mail transport.
///
/// Implementations wrap whatever mail infrastructure the application uses;
/// the channel only ever hands over plain text.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> AuthResult<()>;
}
