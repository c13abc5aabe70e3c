//! # Twofold Core
//!
//! This crate provides the foundational types and traits for the Twofold
//! identity system. It defines the user model, error types, the trait
//! interfaces that channels and storage adapters implement, and the managers
//! that orchestrate two-factor sign-in and password resets.

pub mod channel;
pub mod config;
pub mod error;
pub mod manager;
pub mod reset;
pub mod signin;
pub mod totp;
pub mod traits;
pub mod types;

// Re-export commonly used items at the crate root
pub use channel::ChannelCore;
pub use config::{IdentityOptions, LockoutOptions, PasswordPolicy, TotpOptions};
pub use error::{AuthError, AuthResult};
pub use manager::UserManager;
pub use reset::{ResetPasswordService, ResetServiceRegistry};
pub use signin::{SignInManager, SignInOutcome, TwoFactorTicket};
pub use totp::{SecurityStampTotp, StampModifier};
pub use traits::{TokenChannel, TokenDelivery, TokenGenerator, TwoFactorChannel, UserStore};
pub use types::{purposes, SendTokenOutcome, User, INTERNAL_PROVIDER};
