//! Pluggable ways to request a password reset.
//!
//! Each service declares a small data model; callers pick a service by name
//! and hand over the raw form payload, which the service deserializes into
//! its own model before processing.
//!
//! Whatever the outcome of the lookup, a processed request produces the same
//! confirmation: no path may reveal whether an account exists.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::manager::UserManager;

/// A named strategy a user can choose to request a password reset.
#[async_trait]
pub trait ResetPasswordService: Send + Sync {
    /// Name of the service shown to users when choosing a reset method.
    fn name(&self) -> &str;

    /// Message to show to users when they choose this service.
    fn request_message(&self) -> &str;

    /// Message to show to users after the request is accepted. The same
    /// message is returned whether or not the account exists.
    fn confirmation_message(&self) -> &str;

    /// Processes a reset request. `payload` is the raw form data; the
    /// service deserializes it into its own data model.
    async fn process(&self, manager: &UserManager, payload: Value) -> AuthResult<()>;
}

/// Registry of reset-password services, selected by name at request time.
#[derive(Default)]
pub struct ResetServiceRegistry {
    services: Vec<Arc<dyn ResetPasswordService>>,
}

impl ResetServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service.
    pub fn register(&mut self, service: Arc<dyn ResetPasswordService>) {
        self.services.push(service);
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_service(mut self, service: Arc<dyn ResetPasswordService>) -> Self {
        self.register(service);
        self
    }

    /// All registered services, in registration order.
    pub fn services(&self) -> &[Arc<dyn ResetPasswordService>] {
        &self.services
    }

    /// Looks up a service by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ResetPasswordService>> {
        self.services.iter().find(|s| s.name() == name).cloned()
    }

    /// Dispatches a request to the named service and returns its uniform
    /// confirmation message.
    pub async fn dispatch(
        &self,
        manager: &UserManager,
        name: &str,
        payload: Value,
    ) -> AuthResult<String> {
        let service = self.get(name).ok_or_else(|| AuthError::UnknownResetService {
            name: name.to_string(),
        })?;
        debug!(service = name, "dispatching reset-password request");
        service.process(manager, payload).await?;
        Ok(service.confirmation_message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Deserialize)]
    struct StubModel {
        email: String,
    }

    struct StubService {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResetPasswordService for StubService {
        fn name(&self) -> &str {
            "Stub"
        }

        fn request_message(&self) -> &str {
            "Enter your email"
        }

        fn confirmation_message(&self) -> &str {
            "Check your inbox"
        }

        async fn process(&self, _manager: &UserManager, payload: Value) -> AuthResult<()> {
            let model: StubModel = serde_json::from_value(payload)?;
            self.seen.lock().unwrap().push(model.email);
            Ok(())
        }
    }

    fn manager() -> UserManager {
        use crate::config::IdentityOptions;
        use crate::traits::UserStore;
        use crate::types::User;

        struct NullStore;

        #[async_trait]
        impl UserStore for NullStore {
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
            async fn set_token(&self, _o: &str, _p: &str, _n: &str, _v: &str) -> AuthResult<()> {
                Ok(())
            }
            async fn get_token(
                &self,
                _o: &str,
                _p: &str,
                _n: &str,
            ) -> AuthResult<Option<String>> {
                Ok(None)
            }
            async fn remove_token(&self, _o: &str, _p: &str, _n: &str) -> AuthResult<()> {
                Ok(())
            }
        }

        UserManager::new(Arc::new(NullStore), IdentityOptions::default())
    }

    #[tokio::test]
    async fn dispatch_by_name() {
        let registry = ResetServiceRegistry::new().with_service(Arc::new(StubService {
            seen: Mutex::new(Vec::new()),
        }));
        let confirmation = registry
            .dispatch(&manager(), "Stub", json!({ "email": "a@b.c" }))
            .await
            .unwrap();
        assert_eq!(confirmation, "Check your inbox");
    }

    #[tokio::test]
    async fn unknown_service_is_an_error() {
        let registry = ResetServiceRegistry::new();
        assert!(matches!(
            registry.dispatch(&manager(), "Nope", json!({})).await,
            Err(AuthError::UnknownResetService { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_serialization_error() {
        let registry = ResetServiceRegistry::new().with_service(Arc::new(StubService {
            seen: Mutex::new(Vec::new()),
        }));
        assert!(matches!(
            registry
                .dispatch(&manager(), "Stub", json!({ "wrong": true }))
                .await,
            Err(AuthError::Serialization { .. })
        ));
    }
}
