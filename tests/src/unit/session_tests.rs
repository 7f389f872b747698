use crate::support::{ada, auth_body, Harness, TOKEN};
use mockito::Matcher;
use parley_core::api::ApiError;
use parley_core::session::SessionEvent;
use parley_core::store::PersistedCredentials;
use parley_core::{
    ApiClient, ClientSettings, CredentialStore, FileCredentialStore, SessionHandle, SessionStore,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn login_persists_token_and_authorizes_later_calls() {
    let mut harness = Harness::new().await;
    let mut events = harness.sessions.subscribe();
    let login_mock = harness
        .server
        .mock("POST", "/api/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(
            json!({ "email": "ada@example.com", "password": "secret" }),
        ))
        .with_status(200)
        .with_body(auth_body("fresh-token", &ada()))
        .create_async()
        .await;
    let profile_mock = harness
        .server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer fresh-token")
        .with_status(200)
        .with_body(json!({ "user": ada() }).to_string())
        .create_async()
        .await;

    let user = harness
        .sessions
        .login(" ada@example.com ", "secret")
        .await
        .expect("login");

    assert_eq!(user.full_name, "Ada Lovelace");
    assert!(harness.sessions.is_authenticated());
    assert_eq!(
        harness.persisted(),
        PersistedCredentials::logged_in("fresh-token")
    );
    assert_eq!(
        events.try_recv().expect("login event"),
        SessionEvent::LoggedIn {
            user_id: "u-1".into()
        }
    );

    harness.api.profile().await.expect("profile");
    login_mock.assert_async().await;
    profile_mock.assert_async().await;
}

#[tokio::test]
async fn rejected_login_keeps_previous_session() {
    let mut harness = Harness::signed_in().await;
    harness
        .server
        .mock("POST", "/api/login")
        .with_status(400)
        .with_body(r#"{"error":"Invalid credentials"}"#)
        .create_async()
        .await;

    let err = harness
        .sessions
        .login("ada@example.com", "wrong")
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Invalid credentials");
    assert!(harness.sessions.is_authenticated());
    assert_eq!(harness.persisted(), PersistedCredentials::logged_in(TOKEN));
}

#[tokio::test]
async fn unauthorized_login_reports_inline_message() {
    let mut harness = Harness::new().await;
    harness
        .server
        .mock("POST", "/api/login")
        .with_status(401)
        .with_body(r#"{"error":"Invalid email or password"}"#)
        .create_async()
        .await;

    let err = harness
        .sessions
        .login("ada@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(err.is_expired());
    assert_eq!(err.user_message(), "Invalid email or password");
    assert!(!harness.sessions.is_authenticated());
}

#[tokio::test]
async fn register_sends_full_name() {
    let mut harness = Harness::new().await;
    let register_mock = harness
        .server
        .mock("POST", "/api/register")
        .match_body(Matcher::Json(json!({
            "fullName": "Ada Lovelace",
            "email": "ada@example.com",
            "password": "secret"
        })))
        .with_status(201)
        .with_body(auth_body(TOKEN, &ada()))
        .create_async()
        .await;

    let user = harness
        .sessions
        .register("Ada Lovelace", "ada@example.com", "secret")
        .await
        .expect("register");

    assert_eq!(user.email, "ada@example.com");
    assert_eq!(harness.sessions.api().session().token().as_deref(), Some(TOKEN));
    register_mock.assert_async().await;
}

#[tokio::test]
async fn missing_fields_fail_without_a_request() {
    let mut harness = Harness::new().await;
    let any_request = harness
        .server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let login = harness.sessions.login("   ", "secret").await.unwrap_err();
    assert!(matches!(login, ApiError::Validation(_)));
    let register = harness
        .sessions
        .register("", "ada@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(register, ApiError::Validation(_)));

    any_request.assert_async().await;
}

#[tokio::test]
async fn restore_fetches_profile_for_stored_login() {
    let mut harness = Harness::with_credentials(PersistedCredentials::logged_in(TOKEN)).await;
    let profile_mock = harness
        .server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body(json!({ "user": ada() }).to_string())
        .create_async()
        .await;

    assert!(harness.sessions.is_loading());
    let user = harness.sessions.restore().await.expect("restored user");

    assert_eq!(user.id, "u-1");
    assert!(harness.sessions.is_authenticated());
    assert!(!harness.sessions.is_loading());
    profile_mock.assert_async().await;
}

#[tokio::test]
async fn restore_skips_token_without_logged_in_flag() {
    let mut harness = Harness::with_credentials(PersistedCredentials {
        token: Some(TOKEN.into()),
        logged_in: false,
    })
    .await;
    let profile_mock = harness
        .server
        .mock("GET", "/api/profile")
        .expect(0)
        .create_async()
        .await;

    assert_eq!(harness.sessions.restore().await, None);
    assert!(!harness.sessions.is_loading());
    assert!(!harness.sessions.is_authenticated());
    profile_mock.assert_async().await;
}

#[tokio::test]
async fn failed_restore_discards_credentials() {
    let mut harness = Harness::with_credentials(PersistedCredentials::logged_in(TOKEN)).await;
    harness
        .server
        .mock("GET", "/api/profile")
        .with_status(500)
        .create_async()
        .await;

    assert_eq!(harness.sessions.restore().await, None);
    assert_eq!(harness.persisted(), PersistedCredentials::default());
    assert_eq!(harness.sessions.api().session().token(), None);
    assert!(!harness.sessions.is_loading());
}

#[tokio::test]
async fn logout_clears_everything() {
    let harness = Harness::signed_in().await;
    let mut events = harness.sessions.subscribe();

    harness.sessions.logout();

    assert!(!harness.sessions.is_authenticated());
    assert_eq!(harness.sessions.user(), None);
    assert_eq!(harness.persisted(), PersistedCredentials::default());
    assert_eq!(events.try_recv().expect("logout event"), SessionEvent::LoggedOut);
}

#[tokio::test]
async fn stored_login_survives_restart() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/login")
        .with_status(200)
        .with_body(auth_body(TOKEN, &ada()))
        .create_async()
        .await;
    server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body(json!({ "user": ada() }).to_string())
        .create_async()
        .await;
    let dir = tempfile::TempDir::new().unwrap();

    let start = || {
        let store: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(dir.path().to_path_buf()));
        let settings = ClientSettings::for_url(&server.url(), dir.path().to_path_buf()).unwrap();
        SessionStore::new(ApiClient::new(&settings, SessionHandle::new(store)).unwrap())
    };

    let first = start();
    first.login("ada@example.com", "secret").await.unwrap();

    let second = start();
    assert!(!second.is_authenticated());
    let user = second.restore().await.expect("restored after restart");
    assert_eq!(user.full_name, "Ada Lovelace");
}
