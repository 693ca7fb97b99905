mod common;

use common::{api_path, logged_in, TestApp};
use pharmacy_frontend::middleware::Navigation;
use pharmacy_frontend::models::auth::RegisterRequest;
use pharmacy_frontend::models::{Route, Session, SessionEvent};
use pharmacy_frontend::ClientError;
use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_login(app: &TestApp, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(api_path("/login/")))
        .respond_with(response)
        .expect(1)
        .mount(&app.server)
        .await;
}

fn register_form(password: &str, confirm: &str) -> RegisterRequest {
    RegisterRequest {
        email: "jane@example.com".into(),
        username: "jane".into(),
        password: password.into(),
        confirm_password: confirm.into(),
    }
}

#[tokio::test]
async fn login_stores_session_and_lands_on_dashboard() {
    let app = TestApp::spawn(Session::default()).await;
    Mock::given(method("POST"))
        .and(path(api_path("/login/")))
        .and(body_json(json!({ "username": "jane", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "a",
            "refresh": "r",
            "username": "jane",
            "is_admin": false
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let mut events = app.state.subscribe();
    let outcome = app.state.auth.login("jane", "secret").await.unwrap();

    assert_eq!(outcome.username, "jane");
    assert!(!outcome.is_admin);
    assert_eq!(outcome.landing, Route::Dashboard);

    let session = app.session();
    assert_eq!(session.access_token(), Some("a"));
    assert_eq!(session.refresh_token(), Some("r"));
    assert_eq!(session.username.as_deref(), Some("jane"));
    assert!(!session.is_admin());

    assert_eq!(
        events.try_recv(),
        Ok(SessionEvent::LoggedIn {
            username: "jane".into(),
            is_admin: false
        })
    );
    assert_eq!(app.state.navigate("/dashboard"), Navigation::Render(Route::Dashboard));
    assert_eq!(app.state.navigate("/admin"), Navigation::Redirect(Route::Login));
}

#[tokio::test]
async fn login_never_sends_a_stale_bearer_token() {
    let app = TestApp::spawn(logged_in("stale", "r")).await;
    Mock::given(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.server)
        .await;
    mount_login(
        &app,
        ResponseTemplate::new(200).set_body_json(json!({ "access": "a2", "refresh": "r2" })),
    )
    .await;

    app.state.auth.login("jane", "secret").await.unwrap();

    assert_eq!(app.session().access_token(), Some("a2"));
    assert_eq!(app.session().refresh_token(), Some("r2"));
}

#[tokio::test]
async fn admin_username_is_treated_as_admin() {
    let app = TestApp::spawn(Session::default()).await;
    mount_login(
        &app,
        ResponseTemplate::new(200).set_body_json(json!({
            "access": "a",
            "refresh": "r",
            "username": "admin",
            "is_admin": false
        })),
    )
    .await;

    let outcome = app.state.auth.login("admin", "pw").await.unwrap();

    assert!(outcome.is_admin);
    assert_eq!(outcome.landing, Route::Admin);
    assert!(app.session().is_admin());
    assert_eq!(app.state.navigate("/admin"), Navigation::Render(Route::Admin));
}

#[tokio::test]
async fn server_admin_flag_is_honoured() {
    let app = TestApp::spawn(Session::default()).await;
    mount_login(
        &app,
        ResponseTemplate::new(200).set_body_json(json!({
            "access": "a",
            "refresh": "r",
            "username": "manager",
            "is_admin": true
        })),
    )
    .await;

    let outcome = app.state.auth.login("manager", "pw").await.unwrap();

    assert!(outcome.is_admin);
    assert_eq!(outcome.landing, Route::Admin);
}

#[tokio::test]
async fn missing_username_falls_back_to_submitted_one() {
    let app = TestApp::spawn(Session::default()).await;
    mount_login(
        &app,
        ResponseTemplate::new(200).set_body_json(json!({ "access": "a", "refresh": "r" })),
    )
    .await;

    let outcome = app.state.auth.login("Admin", "pw").await.unwrap();

    assert_eq!(outcome.username, "Admin");
    assert!(outcome.is_admin);
    assert_eq!(app.session().username.as_deref(), Some("Admin"));
}

#[tokio::test]
async fn refused_login_leaves_session_untouched() {
    let app = TestApp::spawn(logged_in("a", "r")).await;
    mount_login(
        &app,
        ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid credentials" })),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(api_path("/token/refresh/")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.server)
        .await;

    let mut events = app.state.subscribe();
    let err = app.state.auth.login("jane", "wrong").await.unwrap_err();

    match err {
        ClientError::Rejected(message) => assert_eq!(message, "Invalid credentials"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(app.session().access_token(), Some("a"));
    assert_eq!(app.session().refresh_token(), Some("r"));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn refused_login_without_message_uses_generic_text() {
    let app = TestApp::spawn(Session::default()).await;
    mount_login(&app, ResponseTemplate::new(400).set_body_string("Bad Request")).await;

    let err = app.state.auth.login("jane", "wrong").await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(app.session().is_empty());
}

#[tokio::test]
async fn empty_login_fields_send_nothing() {
    let app = TestApp::spawn(Session::default()).await;

    let err = app.state.auth.login("jane", "").await.unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(app.received_paths().await.is_empty());
}

#[tokio::test]
async fn register_mismatch_sends_nothing() {
    let app = TestApp::spawn(Session::default()).await;

    let err = app
        .state
        .auth
        .register(register_form("secret1", "secret2"))
        .await
        .unwrap_err();

    match err {
        ClientError::Validation(errors) => {
            let fields = errors.field_errors();
            assert_eq!(
                fields["confirm_password"][0].message.as_deref(),
                Some("Password and confirmation do not match")
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(app.received_paths().await.is_empty());
}

#[tokio::test]
async fn register_surfaces_server_message() {
    let app = TestApp::spawn(Session::default()).await;
    Mock::given(method("POST"))
        .and(path(api_path("/register/")))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Username already exists" })),
        )
        .expect(1)
        .mount(&app.server)
        .await;

    let err = app
        .state
        .auth
        .register(register_form("secret", "secret"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Rejected(ref m) if m == "Username already exists"));
}

#[tokio::test]
async fn register_success_does_not_log_in() {
    let app = TestApp::spawn(Session::default()).await;
    Mock::given(method("POST"))
        .and(path(api_path("/register/")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "User registered successfully",
            "user_id": 42
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let outcome = app
        .state
        .auth
        .register(register_form("secret", "secret"))
        .await
        .unwrap();

    assert_eq!(outcome.message, "User registered successfully");
    assert_eq!(outcome.user_id, Some(42));
    assert_eq!(outcome.next, Route::Login);
    assert!(app.session().is_empty());
}

#[tokio::test]
async fn logout_clears_everything() {
    let app = TestApp::spawn(Session::from_login(
        "a".into(),
        "r".into(),
        "admin".into(),
        true,
    ))
    .await;

    let mut events = app.state.subscribe();
    let next = app.state.auth.logout();

    assert_eq!(next, Route::Login);
    assert!(app.session().is_empty());
    assert_eq!(events.try_recv(), Ok(SessionEvent::LoggedOut));
    assert_eq!(app.state.navigate("/admin"), Navigation::Redirect(Route::Login));
    assert!(app.received_paths().await.is_empty());
}
