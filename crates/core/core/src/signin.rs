//! Sign-in orchestration and the two-factor handshake.
//!
//! The flow is a handful of states driven by the caller:
//! password check → (no channel configured | choose among eligible channels)
//! → awaiting code → succeeded, locked out, or a retryable failure.

use std::sync::Arc;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::manager::UserManager;
use crate::traits::TokenChannel;
use crate::types::{SendTokenOutcome, User};

/// Correlates the password step with the later code step of one sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoFactorTicket {
    /// The user that passed the first factor.
    pub user_id: String,
}

/// The result of a sign-in step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The user is signed in.
    Succeeded,
    /// The first factor passed; a second factor is required.
    TwoFactorRequired(TwoFactorTicket),
    /// The account is locked out.
    LockedOut,
    /// The attempt failed; the caller may retry until lockout trips.
    Failed,
}

/// Provides the APIs for user sign-in.
pub struct SignInManager {
    users: Arc<UserManager>,
}

impl SignInManager {
    /// Creates a sign-in manager over the given user manager.
    pub fn new(users: Arc<UserManager>) -> Self {
        Self { users }
    }

    /// The underlying user manager.
    pub fn users(&self) -> &Arc<UserManager> {
        &self.users
    }

    /// Whether two-factor authentication applies to this user: either forced
    /// globally or opted into with at least one suitable channel.
    pub async fn is_two_factor_enabled(&self, user: &User) -> AuthResult<bool> {
        if self.users.options().force_two_factor {
            return Ok(true);
        }
        if !user.two_factor_enabled {
            return Ok(false);
        }
        Ok(!self.users.valid_two_factor_channels(user).await?.is_empty())
    }

    /// Performs the first factor: email plus password.
    ///
    /// Unknown emails and wrong passwords are indistinguishable (`Failed`).
    pub async fn password_sign_in(&self, email: &str, password: &str) -> AuthResult<SignInOutcome> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(SignInOutcome::Failed);
        };
        if self.users.is_locked_out(&user) {
            return Ok(SignInOutcome::LockedOut);
        }
        if !self.users.verify_password(&user, password) {
            let locked = self.users.access_failed(&user).await?;
            return Ok(if locked {
                SignInOutcome::LockedOut
            } else {
                SignInOutcome::Failed
            });
        }

        if self.is_two_factor_enabled(&user).await? {
            let eligible = self.users.valid_two_factor_channels(&user).await?;
            if !eligible.is_empty() {
                debug!(user = %user.id, channels = eligible.len(), "entering two-factor handshake");
                return Ok(SignInOutcome::TwoFactorRequired(TwoFactorTicket {
                    user_id: user.id.clone(),
                }));
            }
            // Forced 2FA with no way to satisfy it still lets the password
            // stand alone; there is no channel to choose from.
        }

        self.users.reset_lockout(&user).await?;
        Ok(SignInOutcome::Succeeded)
    }

    /// The channels the ticket's user may choose from.
    pub async fn two_factor_channels(
        &self,
        ticket: &TwoFactorTicket,
    ) -> AuthResult<Vec<Arc<dyn TokenChannel>>> {
        let user = self.resolve(ticket).await?;
        self.users.valid_two_factor_channels(&user).await
    }

    /// The channel remembered from an earlier sign-in, when still suitable.
    pub async fn remembered_channel(
        &self,
        ticket: &TwoFactorTicket,
    ) -> AuthResult<Option<Arc<dyn TokenChannel>>> {
        let user = self.resolve(ticket).await?;
        let Some(name) = self.users.two_factor_provider(&user).await? else {
            return Ok(None);
        };
        let Some(channel) = self.users.channel(&name) else {
            return Ok(None);
        };
        if channel.is_suitable(&self.users, &user).await? {
            Ok(Some(channel))
        } else {
            Ok(None)
        }
    }

    /// Sends (or re-sends) a code over the named channel. `Wait(n)` from the
    /// channel's cooldown is surfaced untouched.
    pub async fn send_two_factor_token(
        &self,
        ticket: &TwoFactorTicket,
        channel: &str,
    ) -> AuthResult<SendTokenOutcome> {
        let user = self.resolve(ticket).await?;
        let channel = self
            .users
            .channel(channel)
            .ok_or_else(|| AuthError::UnknownChannel {
                name: channel.to_string(),
            })?;
        if !channel.needs_send() {
            return Ok(SendTokenOutcome::NotNeeded);
        }
        channel.send_token(&self.users, &user).await
    }

    /// Performs the second factor: validates the code, with lockout
    /// accounting on failure. With `remember_channel` the chosen channel is
    /// persisted as the user's default for future sign-ins.
    pub async fn two_factor_sign_in(
        &self,
        ticket: &TwoFactorTicket,
        channel: &str,
        code: &str,
        remember_channel: bool,
    ) -> AuthResult<SignInOutcome> {
        let Some(user) = self.users.find_by_id(&ticket.user_id).await? else {
            return Ok(SignInOutcome::Failed);
        };
        if self.users.is_locked_out(&user) {
            return Ok(SignInOutcome::LockedOut);
        }
        let channel = self
            .users
            .channel(channel)
            .ok_or_else(|| AuthError::UnknownChannel {
                name: channel.to_string(),
            })?;

        if channel.validate_token(code, &self.users, &user).await? {
            self.users.reset_lockout(&user).await?;
            if remember_channel {
                self.users
                    .set_two_factor_provider(&user, channel.name())
                    .await?;
            }
            debug!(user = %user.id, channel = channel.name(), "two-factor sign-in succeeded");
            return Ok(SignInOutcome::Succeeded);
        }

        // A wrong code feeds the same lockout counter as a wrong password.
        let locked = self.users.access_failed(&user).await?;
        Ok(if locked {
            SignInOutcome::LockedOut
        } else {
            SignInOutcome::Failed
        })
    }

    async fn resolve(&self, ticket: &TwoFactorTicket) -> AuthResult<User> {
        self.users
            .find_by_id(&ticket.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
