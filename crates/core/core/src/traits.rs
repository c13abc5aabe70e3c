//! Core traits for Twofold.
//!
//! This module defines the trait interfaces that channels, token generators,
//! and storage adapters must implement to integrate with the managers.

use async_trait::async_trait;

use crate::error::AuthResult;
use crate::manager::UserManager;
use crate::types::{SendTokenOutcome, User};

/// Trait for storage adapters (database backends).
///
/// Besides user persistence, adapters expose a generic token table keyed by
/// `(owner, provider, name)`. The managers overload that table for opaque
/// bookkeeping: remembered two-factor channel, last-send timestamp, pending
/// reset tokens. Adapters never interpret the values.
#[async_trait]
pub trait UserStore: Send + Sync {
    // ==================== User Operations ====================

    /// Creates a new user.
    async fn create_user(&self, user: &User) -> AuthResult<User>;

    /// Gets a user by ID.
    async fn get_user_by_id(&self, id: &str) -> AuthResult<Option<User>>;

    /// Gets a user by email.
    async fn get_user_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Gets a user by phone number.
    async fn get_user_by_phone(&self, phone_number: &str) -> AuthResult<Option<User>>;

    /// Updates an existing user.
    async fn update_user(&self, user: &User) -> AuthResult<User>;

    /// Deletes a user by ID.
    async fn delete_user(&self, id: &str) -> AuthResult<()>;

    // ==================== Token Operations ====================

    /// Stores a token value, overwriting any existing `(owner, provider, name)` entry.
    async fn set_token(
        &self,
        owner_id: &str,
        provider: &str,
        name: &str,
        value: &str,
    ) -> AuthResult<()>;

    /// Gets a stored token value.
    async fn get_token(
        &self,
        owner_id: &str,
        provider: &str,
        name: &str,
    ) -> AuthResult<Option<String>>;

    /// Removes a stored token. Removing a missing token is not an error.
    async fn remove_token(&self, owner_id: &str, provider: &str, name: &str) -> AuthResult<()>;
}

/// Trait for token generators.
///
/// A generator produces and validates short-lived codes for a user and a
/// purpose (`purposes::TWO_FACTOR`, `purposes::RESET_PASSWORD`). Generators
/// are stateless: validation never consults the store.
#[async_trait]
pub trait TokenGenerator: Send + Sync {
    /// Returns whether a token can be generated for this user, e.g. whether
    /// the contact detail the generator keys on is present.
    async fn can_generate(&self, user: &User) -> AuthResult<bool>;

    /// Generates a token for the given purpose.
    async fn generate(&self, purpose: &str, user: &User) -> AuthResult<String>;

    /// Validates a token for the given purpose.
    async fn validate(&self, purpose: &str, token: &str, user: &User) -> AuthResult<bool>;
}

/// A pluggable two-factor authentication channel.
///
/// Implementations adapt a delivery mechanism (email, SMS, chat bot,
/// authenticator app) to the common contract the sign-in orchestration
/// drives.
#[async_trait]
pub trait TwoFactorChannel: Send + Sync {
    /// The name identifying the channel (also used as the remembered
    /// provider value).
    fn name(&self) -> &str;

    /// Message to show to users when they choose this channel.
    fn request_message(&self) -> &str;

    /// Returns whether this channel can authenticate the given user, e.g.
    /// whether the required contact detail is present and confirmed.
    async fn is_suitable(&self, manager: &UserManager, user: &User) -> AuthResult<bool>;
}

/// A two-factor channel that exchanges explicit tokens with the user.
#[async_trait]
pub trait TokenChannel: TwoFactorChannel {
    /// Whether `send_token` must be called before the user can enter a code.
    /// Channels backed by an authenticator app return `false`.
    fn needs_send(&self) -> bool;

    /// Generates a token and delivers it to the user, enforcing the resend
    /// cooldown.
    async fn send_token(&self, manager: &UserManager, user: &User) -> AuthResult<SendTokenOutcome>;

    /// Validates a code entered by the user.
    async fn validate_token(
        &self,
        code: &str,
        manager: &UserManager,
        user: &User,
    ) -> AuthResult<bool>;

    /// Seconds remaining before another token may be sent. Zero when a send
    /// is allowed now.
    async fn time_to_wait(&self, manager: &UserManager, user: &User) -> AuthResult<u64>;
}

/// The delivery step of a token channel.
///
/// `ChannelCore::send_token` drives the cooldown and generation and then
/// hands the token to this trait, so concrete channels only implement the
/// transport.
#[async_trait]
pub trait TokenDelivery: Send + Sync {
    /// Delivers a generated token to the user.
    async fn deliver(
        &self,
        token: &str,
        manager: &UserManager,
        user: &User,
    ) -> AuthResult<SendTokenOutcome>;
}
