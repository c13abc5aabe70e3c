//! # Twofold SMS Channel
//!
//! Two-factor codes delivered as text messages to a confirmed phone number.

use async_trait::async_trait;
use std::sync::Arc;

use twofold_core::channel::ChannelCore;
use twofold_core::config::IdentityOptions;
use twofold_core::error::AuthResult;
use twofold_core::manager::UserManager;
use twofold_core::totp::SecurityStampTotp;
use twofold_core::traits::{TokenChannel, TokenDelivery, TwoFactorChannel};
use twofold_core::types::{SendTokenOutcome, User};

pub const CHANNEL_NAME: &str = "Sms";

/// Outbound SMS transport.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> AuthResult<()>;
}

/// Token channel that texts time-based codes to the user's confirmed
/// phone number.
pub struct SmsChannel {
    core: ChannelCore,
    sender: Arc<dyn SmsSender>,
}

impl SmsChannel {
    pub fn new(options: &IdentityOptions, sender: Arc<dyn SmsSender>) -> Self {
        let generator = SecurityStampTotp::for_channel(options.totp, |purpose, user| {
            if !user.phone_number_verified {
                return None;
            }
            let phone = user.phone_number.as_deref()?;
            Some(format!("{CHANNEL_NAME}:{purpose}:{phone}"))
        });
        Self {
            core: ChannelCore::new(
                CHANNEL_NAME,
                Arc::new(generator),
                options.resend_seconds_for(CHANNEL_NAME),
            ),
            sender,
        }
    }
}

#[async_trait]
impl TwoFactorChannel for SmsChannel {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn request_message(&self) -> &str {
        "A sign-in code will be sent to your phone by SMS."
    }

    async fn is_suitable(&self, _manager: &UserManager, user: &User) -> AuthResult<bool> {
        self.core.is_suitable(user).await
    }
}

#[async_trait]
impl TokenChannel for SmsChannel {
    fn needs_send(&self) -> bool {
        true
    }

    async fn send_token(&self, manager: &UserManager, user: &User) -> AuthResult<SendTokenOutcome> {
        self.core.send_token(self, manager, user).await
    }

    async fn validate_token(
        &self,
        code: &str,
        _manager: &UserManager,
        user: &User,
    ) -> AuthResult<bool> {
        self.core.validate_token(code, user).await
    }

    async fn time_to_wait(&self, manager: &UserManager, user: &User) -> AuthResult<u64> {
        self.core.time_to_wait(manager, user).await
    }
}

#[async_trait]
impl TokenDelivery for SmsChannel {
    async fn deliver(
        &self,
        token: &str,
        _manager: &UserManager,
        user: &User,
    ) -> AuthResult<SendTokenOutcome> {
        let Some(phone) = user.phone_number.as_deref() else {
            return Ok(SendTokenOutcome::Failed);
        };
        self.sender
            .send(phone, &format!("Your sign-in code is {token}"))
            .await?;
        Ok(SendTokenOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use twofold_core::traits::UserStore;

    struct RecordingSender {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SmsSender for RecordingSender {
        async fn send(&self, to: &str, _body: &str) -> AuthResult<()> {
            self.sent.lock().unwrap().push(to.into());
            Ok(())
        }
    }

    struct TokenMapStore {
        tokens: Mutex<HashMap<(String, String, String), String>>,
    }

    #[async_trait]
    impl UserStore for TokenMapStore {
        async fn create_user(&self, user: &User) -> AuthResult<User> {
            Ok(user.clone())
        }
        async fn get_user_by_id(&self, _id: &str) -> AuthResult<Option<User>> {
            Ok(None)
        }
        async fn get_user_by_email(&self, _email: &str) -> AuthResult<Option<User>> {
            Ok(None)
        }
        async fn get_user_by_phone(&self, _phone: &str) -> AuthResult<Option<User>> {
            Ok(None)
        }
        async fn update_user(&self, user: &User) -> AuthResult<User> {
            Ok(user.clone())
        }
        async fn delete_user(&self, _id: &str) -> AuthResult<()> {
            Ok(())
        }
        async fn set_token(&self, o: &str, p: &str, n: &str, v: &str) -> AuthResult<()> {
            self.tokens
                .lock()
                .unwrap()
                .insert((o.into(), p.into(), n.into()), v.into());
            Ok(())
        }
        async fn get_token(&self, o: &str, p: &str, n: &str) -> AuthResult<Option<String>> {
            Ok(self
                .tokens
                .lock()
                .unwrap()
                .get(&(o.into(), p.into(), n.into()))
                .cloned())
        }
        async fn remove_token(&self, o: &str, p: &str, n: &str) -> AuthResult<()> {
            self.tokens
                .lock()
                .unwrap()
                .remove(&(o.into(), p.into(), n.into()));
            Ok(())
        }
    }

    fn manager() -> UserManager {
        UserManager::new(
            Arc::new(TokenMapStore {
                tokens: Mutex::new(HashMap::new()),
            }),
            IdentityOptions::default(),
        )
    }

    #[tokio::test]
    async fn unverified_phone_is_unsuitable() {
        let channel = SmsChannel::new(
            &IdentityOptions::default(),
            Arc::new(RecordingSender {
                sent: Mutex::new(Vec::new()),
            }),
        );
        let manager = manager();
        let mut user = User::new("u1".into(), "u1@example.com".into());
        user.phone_number = Some("+15550100".into());
        assert!(!channel.is_suitable(&manager, &user).await.unwrap());
        user.phone_number_verified = true;
        assert!(channel.is_suitable(&manager, &user).await.unwrap());
    }

    #[tokio::test]
    async fn sends_to_the_stored_number() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let channel = SmsChannel::new(&IdentityOptions::default(), sender.clone());
        let manager = manager();
        let mut user = User::new("u1".into(), "u1@example.com".into());
        user.phone_number = Some("+15550100".into());
        user.phone_number_verified = true;

        assert_eq!(
            channel.send_token(&manager, &user).await.unwrap(),
            SendTokenOutcome::Sent
        );
        assert_eq!(sender.sent.lock().unwrap().as_slice(), ["+15550100"]);
    }
}
