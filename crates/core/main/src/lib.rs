//! # Twofold
//!
//! Multi-channel two-factor authentication and password reset for Rust.
//!
//! Twofold wires pluggable token channels (email, SMS, Telegram,
//! authenticator apps) into a common sign-in orchestration, and exposes a
//! registry of password-reset services sharing one anti-enumeration
//! contract.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use twofold::prelude::*;
//! use twofold_adapter_memory::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AuthError> {
//!     let store = Arc::new(MemoryStore::new());
//!     let options = IdentityOptions::default();
//!     let channel = Arc::new(EmailChannel::new(&options, my_mailer));
//!     let users = Arc::new(
//!         UserManager::new(store, options).with_channel(channel),
//!     );
//!     let signin = SignInManager::new(users);
//!
//!     match signin.password_sign_in("user@example.com", "hunter42!").await? {
//!         SignInOutcome::TwoFactorRequired(ticket) => { /* send + verify a code */ }
//!         outcome => println!("{outcome:?}"),
//!     }
//!     Ok(())
//! }
//! ```

// Re-export core types
pub use twofold_core::*;

// Re-export the channel crates under stable module names
pub use twofold_channel_authenticator as authenticator;
pub use twofold_channel_email as email;
pub use twofold_channel_sms as sms;
pub use twofold_channel_telegram as telegram;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use twofold_core::config::{IdentityOptions, LockoutOptions, PasswordPolicy, TotpOptions};
    pub use twofold_core::error::{AuthError, AuthResult};
    pub use twofold_core::manager::UserManager;
    pub use twofold_core::reset::{ResetPasswordService, ResetServiceRegistry};
    pub use twofold_core::signin::{SignInManager, SignInOutcome, TwoFactorTicket};
    pub use twofold_core::traits::{TokenChannel, TwoFactorChannel, UserStore};
    pub use twofold_core::types::{SendTokenOutcome, User};

    pub use twofold_channel_authenticator::{AuthenticatorChannel, AuthenticatorUserExt};
    pub use twofold_channel_email::{EmailChannel, EmailResetService, EmailSender};
    pub use twofold_channel_sms::{SmsChannel, SmsSender};
    pub use twofold_channel_telegram::{
        BotHandler, TelegramChannel, TelegramResetService, TelegramStore, TelegramUserExt,
    };
}
