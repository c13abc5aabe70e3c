//! # Twofold Memory Adapter
//!
//! An in-memory storage adapter for Twofold, primarily intended for testing
//! and development purposes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use twofold_adapter_memory::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let users = UserManager::new(store.clone(), IdentityOptions::default());
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use twofold_channel_telegram::{TelegramStore, TelegramUserExt};
use twofold_core::error::{AuthError, AuthResult};
use twofold_core::traits::UserStore;
use twofold_core::types::User;

type UserTokenKey = (String, String, String);
type ChatTokenKey = (i64, String, String);

/// In-memory storage adapter for Twofold.
///
/// Stores all data behind `RwLock`ed maps and is suitable for testing and
/// development. Data is lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    tokens: Arc<RwLock<HashMap<UserTokenKey, String>>>,
    chat_tokens: Arc<RwLock<HashMap<ChatTokenKey, String>>>,
}

impl MemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &User) -> AuthResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::duplicate("user", "email", &user.email));
        }
        if users.contains_key(&user.id) {
            return Err(AuthError::duplicate("user", "id", &user.id));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn get_user_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get_user_by_phone(&self, phone_number: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.phone_number.as_deref() == Some(phone_number))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> AuthResult<User> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(AuthError::not_found("user", "id", &user.id));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> AuthResult<()> {
        let mut users = self.users.write().await;
        if users.remove(id).is_none() {
            return Err(AuthError::not_found("user", "id", id));
        }
        drop(users);
        // Orphaned tokens would otherwise shadow a future user with the
        // same id.
        self.tokens.write().await.retain(|(owner, _, _), _| owner != id);
        Ok(())
    }

    async fn set_token(
        &self,
        owner_id: &str,
        provider: &str,
        name: &str,
        value: &str,
    ) -> AuthResult<()> {
        self.tokens.write().await.insert(
            (owner_id.to_string(), provider.to_string(), name.to_string()),
            value.to_string(),
        );
        Ok(())
    }

    async fn get_token(
        &self,
        owner_id: &str,
        provider: &str,
        name: &str,
    ) -> AuthResult<Option<String>> {
        Ok(self
            .tokens
            .read()
            .await
            .get(&(owner_id.to_string(), provider.to_string(), name.to_string()))
            .cloned())
    }

    async fn remove_token(&self, owner_id: &str, provider: &str, name: &str) -> AuthResult<()> {
        self.tokens.write().await.remove(&(
            owner_id.to_string(),
            provider.to_string(),
            name.to_string(),
        ));
        Ok(())
    }
}

#[async_trait]
impl TelegramStore for MemoryStore {
    async fn find_by_telegram_id(&self, telegram_id: i64) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.telegram_id() == Some(telegram_id))
            .cloned())
    }

    async fn set_chat_token(
        &self,
        chat_id: i64,
        provider: &str,
        name: &str,
        value: &str,
    ) -> AuthResult<()> {
        self.chat_tokens.write().await.insert(
            (chat_id, provider.to_string(), name.to_string()),
            value.to_string(),
        );
        Ok(())
    }

    async fn get_chat_token(
        &self,
        chat_id: i64,
        provider: &str,
        name: &str,
    ) -> AuthResult<Option<String>> {
        Ok(self
            .chat_tokens
            .read()
            .await
            .get(&(chat_id, provider.to_string(), name.to_string()))
            .cloned())
    }

    async fn remove_chat_token(&self, chat_id: i64, provider: &str, name: &str) -> AuthResult<()> {
        self.chat_tokens
            .write()
            .await
            .remove(&(chat_id, provider.to_string(), name.to_string()));
        Ok(())
    }
}
