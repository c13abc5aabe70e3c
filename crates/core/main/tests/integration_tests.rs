//! End-to-end flows over the in-memory store.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

use twofold::prelude::*;
use twofold::telegram::{self, TelegramApi, TelegramResetService, Update};
use twofold_adapter_memory::MemoryStore;

const BOT_ID: i64 = 1000;

struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    fn last_code(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let (_, body) = sent.last().expect("no mail sent");
        body.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, _subject: &str, body: &str) -> AuthResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct MockApi {
    sent: Mutex<Vec<(i64, String)>>,
    next_id: Mutex<i64>,
}

#[async_trait]
impl TelegramApi for MockApi {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        _reply_markup: Option<telegram::ReplyMarkup>,
    ) -> AuthResult<i64> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(*next)
    }

    async fn delete_message(&self, _chat_id: i64, _message_id: i64) -> AuthResult<()> {
        Ok(())
    }

    async fn get_me(&self) -> AuthResult<telegram::BotProfile> {
        Ok(telegram::BotProfile {
            id: BOT_ID,
            username: Some("twofoldbot".into()),
        })
    }
}

struct Fixture {
    users: Arc<UserManager>,
    signin: SignInManager,
    mailer: Arc<RecordingMailer>,
}

async fn email_fixture(options: IdentityOptions) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let mailer = RecordingMailer::new();
    let channel = Arc::new(EmailChannel::new(&options, mailer.clone()));
    let users = Arc::new(UserManager::new(store, options).with_channel(channel));
    let signin = SignInManager::new(users.clone());
    Fixture {
        users,
        signin,
        mailer,
    }
}

async fn seed_user(fixture: &Fixture, two_factor: bool, verified: bool) -> User {
    let mut user = User::new("u1".into(), "u1@example.com".into());
    user.email_verified = verified;
    user.two_factor_enabled = two_factor;
    fixture.users.set_password(&mut user, "correct horse 1").unwrap();
    fixture.users.create_user(&user).await.unwrap()
}

#[tokio::test]
async fn email_two_factor_round_trip_remembers_the_channel() {
    let fixture = email_fixture(IdentityOptions::default()).await;
    seed_user(&fixture, true, true).await;

    let outcome = fixture
        .signin
        .password_sign_in("u1@example.com", "correct horse 1")
        .await
        .unwrap();
    let SignInOutcome::TwoFactorRequired(ticket) = outcome else {
        panic!("expected a two-factor handshake, got {outcome:?}");
    };

    assert!(fixture.signin.remembered_channel(&ticket).await.unwrap().is_none());
    assert_eq!(
        fixture
            .signin
            .send_two_factor_token(&ticket, "Email")
            .await
            .unwrap(),
        SendTokenOutcome::Sent
    );

    let code = fixture.mailer.last_code();
    assert_eq!(
        fixture
            .signin
            .two_factor_sign_in(&ticket, "Email", &code, true)
            .await
            .unwrap(),
        SignInOutcome::Succeeded
    );

    // The chosen channel is now the user's default.
    let remembered = fixture
        .signin
        .remembered_channel(&ticket)
        .await
        .unwrap()
        .expect("channel should be remembered");
    assert_eq!(remembered.name(), "Email");
}

#[tokio::test]
async fn immediate_resend_is_throttled() {
    let fixture = email_fixture(IdentityOptions::default()).await;
    seed_user(&fixture, true, true).await;

    let SignInOutcome::TwoFactorRequired(ticket) = fixture
        .signin
        .password_sign_in("u1@example.com", "correct horse 1")
        .await
        .unwrap()
    else {
        panic!("expected a two-factor handshake");
    };

    assert_eq!(
        fixture
            .signin
            .send_two_factor_token(&ticket, "Email")
            .await
            .unwrap(),
        SendTokenOutcome::Sent
    );
    match fixture
        .signin
        .send_two_factor_token(&ticket, "Email")
        .await
        .unwrap()
    {
        SendTokenOutcome::Wait(seconds) => assert!(seconds >= 1),
        other => panic!("expected Wait, got {other:?}"),
    }
    assert_eq!(fixture.mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn wrong_codes_trip_the_lockout() {
    let fixture = email_fixture(IdentityOptions::default()).await;
    seed_user(&fixture, true, true).await;

    let SignInOutcome::TwoFactorRequired(ticket) = fixture
        .signin
        .password_sign_in("u1@example.com", "correct horse 1")
        .await
        .unwrap()
    else {
        panic!("expected a two-factor handshake");
    };

    let mut last = SignInOutcome::Failed;
    for _ in 0..5 {
        last = fixture
            .signin
            .two_factor_sign_in(&ticket, "Email", "000000", false)
            .await
            .unwrap();
        if last == SignInOutcome::LockedOut {
            break;
        }
    }
    assert_eq!(last, SignInOutcome::LockedOut);

    // Even the right password bounces while the lockout lasts.
    assert_eq!(
        fixture
            .signin
            .password_sign_in("u1@example.com", "correct horse 1")
            .await
            .unwrap(),
        SignInOutcome::LockedOut
    );
}

#[tokio::test]
async fn unverified_email_disables_the_second_factor() {
    let fixture = email_fixture(IdentityOptions::default()).await;
    seed_user(&fixture, true, false).await;

    // Two-factor is opted in, but no channel is suitable.
    assert_eq!(
        fixture
            .signin
            .password_sign_in("u1@example.com", "correct horse 1")
            .await
            .unwrap(),
        SignInOutcome::Succeeded
    );
}

#[tokio::test]
async fn forced_two_factor_without_channels_falls_back_to_password() {
    let fixture = email_fixture(IdentityOptions::default().force_two_factor()).await;
    seed_user(&fixture, false, false).await;

    assert_eq!(
        fixture
            .signin
            .password_sign_in("u1@example.com", "correct horse 1")
            .await
            .unwrap(),
        SignInOutcome::Succeeded
    );
}

#[tokio::test]
async fn reset_requests_never_reveal_account_existence() {
    let fixture = email_fixture(IdentityOptions::default()).await;
    seed_user(&fixture, false, true).await;

    let mut registry = ResetServiceRegistry::new();
    registry.register(Arc::new(twofold::email::EmailResetService::new(
        fixture.mailer.clone(),
        Arc::new(|token| format!("https://app.test/reset/{token}")),
    )));

    let known = registry
        .dispatch(&fixture.users, "Email", json!({ "email": "u1@example.com" }))
        .await
        .unwrap();
    let unknown = registry
        .dispatch(&fixture.users, "Email", json!({ "email": "nobody@example.com" }))
        .await
        .unwrap();

    assert_eq!(known, unknown);
    // Only the real account got mail.
    assert_eq!(fixture.mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn telegram_reset_flow_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let api = Arc::new(MockApi::default());
    let users = Arc::new(UserManager::new(
        store.clone(),
        IdentityOptions::default(),
    ));

    let mut user = User::new("u1".into(), "u1@example.com".into());
    user.phone_number = Some("+15550100".into());
    user.phone_number_verified = true;
    {
        use twofold::telegram::TelegramUserExt;
        user.set_telegram_id(42);
    }
    users.create_user(&user).await.unwrap();

    let registry = ResetServiceRegistry::new()
        .with_service(Arc::new(TelegramResetService::new(api.clone(), store.clone())));
    registry
        .dispatch(&users, "Telegram", json!({ "phone_number": "+15550100" }))
        .await
        .unwrap();

    // The prompt landed in the linked chat.
    let (chat_id, prompt) = api.sent.lock().unwrap()[0].clone();
    assert_eq!(chat_id, 42);
    assert!(prompt.starts_with("[RESETPWD]"));

    // The user replies to the prompt with their new password.
    let handler = telegram::BotHandler::new(api.clone(), store.clone(), users.clone(), BOT_ID);
    let update: Update = serde_json::from_value(json!({
        "update_id": 1,
        "message": {
            "message_id": 50,
            "from": { "id": 42 },
            "chat": { "id": 42 },
            "text": "brand new pass 9",
            "reply_to_message": {
                "message_id": 1,
                "from": { "id": BOT_ID },
                "chat": { "id": 42 },
                "text": prompt
            }
        }
    }))
    .unwrap();
    assert!(handler.handle_update(&update).await.unwrap());

    let updated = users.find_by_id("u1").await.unwrap().unwrap();
    assert!(users.verify_password(&updated, "brand new pass 9"));
    assert!(!users.verify_password(&updated, "correct horse 1"));
}

#[tokio::test]
async fn new_reset_request_replaces_the_pending_prompt() {
    let store = Arc::new(MemoryStore::new());
    let api = Arc::new(MockApi::default());
    let users = Arc::new(UserManager::new(
        store.clone(),
        IdentityOptions::default(),
    ));

    let mut user = User::new("u1".into(), "u1@example.com".into());
    user.phone_number = Some("+15550100".into());
    {
        use twofold::telegram::TelegramUserExt;
        user.set_telegram_id(42);
    }
    users.create_user(&user).await.unwrap();

    let service = TelegramResetService::new(api.clone(), store.clone());
    service
        .process(&users, json!({ "phone_number": "+15550100" }))
        .await
        .unwrap();
    service
        .process(&users, json!({ "phone_number": "+15550100" }))
        .await
        .unwrap();

    // Only the latest prompt is tracked.
    let tracked = store
        .get_chat_token(
            42,
            twofold::types::INTERNAL_PROVIDER,
            telegram::RESET_PASSWORD_MESSAGE,
        )
        .await
        .unwrap();
    assert_eq!(tracked.as_deref(), Some("2"));
}
