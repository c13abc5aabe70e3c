//! Error types for Twofold.
//!
//! This module defines the `AuthError` enum which represents all possible
//! errors that can occur within the authentication toolkit.

use thiserror::Error;

/// The main error type for Twofold operations.
#[derive(Debug, Error)]
pub enum AuthError {
    // ==================== Authentication Errors ====================
    /// The provided credentials are invalid.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The user was not found.
    #[error("User not found")]
    UserNotFound,

    // ==================== Validation Errors ====================
    /// The password does not meet requirements.
    #[error("Password does not meet requirements: {reason}")]
    WeakPassword { reason: String },

    // ==================== Token Errors ====================
    /// The token is invalid or malformed.
    #[error("Invalid token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    // ==================== Storage Errors ====================
    /// A storage operation failed.
    #[error("Store error: {message}")]
    Store { message: String },

    /// The requested record was not found.
    #[error("Record not found: {entity} with {key}={value}")]
    NotFound {
        entity: String,
        key: String,
        value: String,
    },

    /// A unique constraint was violated (e.g. duplicate email).
    #[error("Duplicate entry: {entity} with {field}={value} already exists")]
    DuplicateEntry {
        entity: String,
        field: String,
        value: String,
    },

    // ==================== Channel Errors ====================
    /// A channel delivery or lookup failed.
    #[error("Channel error in '{channel}': {message}")]
    Channel { channel: String, message: String },

    /// No registered channel matches the requested name.
    #[error("Unknown two-factor channel: {name}")]
    UnknownChannel { name: String },

    /// No registered reset-password service matches the requested name.
    #[error("Unknown reset-password service: {name}")]
    UnknownResetService { name: String },

    // ==================== Configuration Errors ====================
    /// The configuration is invalid. Surfaces on first use and is not caught.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ==================== Internal Errors ====================
    /// Password hashing or verification failed unexpectedly.
    #[error("Password hash error: {message}")]
    PasswordHash { message: String },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// An internal error occurred.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    /// Creates a new store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    pub fn not_found(
        entity: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a new duplicate entry error.
    pub fn duplicate(
        entity: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::DuplicateEntry {
            entity: entity.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a new channel error.
    pub fn channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new weak password error.
    pub fn weak_password(reason: impl Into<String>) -> Self {
        Self::WeakPassword {
            reason: reason.into(),
        }
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash {
            message: err.to_string(),
        }
    }
}

/// Convenient result type for Twofold operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AuthError::channel("Email", "smtp unreachable");
        assert_eq!(err.to_string(), "Channel error in 'Email': smtp unreachable");

        let err = AuthError::duplicate("user", "email", "a@b.c");
        assert!(err.to_string().contains("a@b.c"));
    }
}
