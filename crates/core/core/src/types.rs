//! Core data types for Twofold.
//!
//! This module defines the canonical `User` struct plus the outcome enums
//! shared across channels and the sign-in orchestration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Represents an identity record in the system.
///
/// The `User` struct contains the base fields the managers operate on, plus
/// an `extensions` map that holds channel-specific data (authenticator
/// secret, external chat identifiers). Channel crates provide trait-based
/// accessors to interact with their extension fields in a type-safe manner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user (typically a UUID).
    pub id: String,

    /// User's email address.
    pub email: String,

    /// Whether the user's email has been confirmed.
    #[serde(default)]
    pub email_verified: bool,

    /// Optional phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Whether the phone number has been confirmed.
    #[serde(default)]
    pub phone_number_verified: bool,

    /// Argon2 password hash, if a password is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    /// Random value rotated whenever credentials change. Time-based codes
    /// are keyed on it, so rotation invalidates outstanding codes.
    pub security_stamp: String,

    /// Whether the user opted into two-factor authentication.
    #[serde(default)]
    pub two_factor_enabled: bool,

    /// Consecutive failed sign-in attempts since the last success.
    #[serde(default)]
    pub failed_count: u32,

    /// Until when the account is locked out, if it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockout_until: Option<DateTime<Utc>>,

    /// Timestamp when the user was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,

    /// Extension data from channel crates.
    #[serde(default, flatten)]
    pub extensions: HashMap<String, Value>,
}

impl User {
    /// Creates a new user with the given ID and email.
    ///
    /// The user is created unconfirmed, without a password, and with a fresh
    /// security stamp.
    pub fn new(id: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            email_verified: false,
            phone_number: None,
            phone_number_verified: false,
            password_hash: None,
            security_stamp: uuid::Uuid::new_v4().simple().to_string(),
            two_factor_enabled: false,
            failed_count: 0,
            lockout_until: None,
            created_at: now,
            updated_at: now,
            extensions: HashMap::new(),
        }
    }

    /// Gets an extension value by key, deserializing it to the requested type.
    ///
    /// Returns `None` if the key doesn't exist or deserialization fails.
    pub fn get_extension<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.extensions
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Sets an extension value by key.
    pub fn set_extension<T: Serialize>(&mut self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.extensions.insert(key.to_string(), json_value);
            self.updated_at = Utc::now();
        }
    }

    /// Removes an extension value by key, returning it if it existed.
    pub fn remove_extension(&mut self, key: &str) -> Option<Value> {
        let result = self.extensions.remove(key);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    /// Rotates the security stamp, invalidating outstanding time-based codes.
    pub fn rotate_security_stamp(&mut self) {
        self.security_stamp = uuid::Uuid::new_v4().simple().to_string();
        self.updated_at = Utc::now();
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), String::new())
    }
}

/// The result of asking a channel to send a two-factor token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTokenOutcome {
    /// The token was delivered.
    Sent,
    /// Delivery failed and retrying will not help.
    Failed,
    /// Delivery failed but another try is possible.
    Retry,
    /// The channel has no sending step (e.g. authenticator app).
    NotNeeded,
    /// A token was sent too recently; wait this many seconds before resending.
    Wait(u64),
}

impl SendTokenOutcome {
    /// Creates a wait outcome, clamped so callers always see at least one second.
    pub fn wait(seconds: u64) -> Self {
        Self::Wait(seconds.max(1))
    }

    /// Returns true if the token was delivered.
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

impl fmt::Display for SendTokenOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Retry => write!(f, "Retry"),
            Self::NotNeeded => write!(f, "NotNeeded"),
            Self::Wait(seconds) => write!(f, "Wait {seconds} sec"),
        }
    }
}

/// Well-known token purposes used across the toolkit.
pub mod purposes {
    /// Codes exchanged during the two-factor handshake.
    pub const TWO_FACTOR: &str = "TwoFactor";
    /// Tokens authorizing a password reset.
    pub const RESET_PASSWORD: &str = "ResetPassword";
}

/// Provider key under which the managers store their own bookkeeping tokens
/// in the generic token table.
pub const INTERNAL_PROVIDER: &str = "[twofold]";
