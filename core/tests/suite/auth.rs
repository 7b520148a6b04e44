use pretty_assertions::assert_eq;
use serde_json::json;
use vantalu_core::session::{AuthClient, Session, SessionError, SessionUser, SignUpOutcome};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_body() -> serde_json::Value {
    json!({
        "access_token": "jwt-access",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "jwt-refresh",
        "user": {
            "id": "user-1",
            "email": "sita@example.in",
            "user_metadata": { "name": "Sita" }
        }
    })
}

#[tokio::test]
async fn password_sign_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .and(body_json(json!({ "email": "sita@example.in", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthClient::new(&server.uri(), "anon-key");
    let session = auth.sign_in(" sita@example.in ", "secret").await.unwrap();
    assert_eq!(session.access_token, "jwt-access");
    assert_eq!(session.user.id, "user-1");
    assert_eq!(session.user.name.as_deref(), Some("Sita"));
    assert!(!session.is_expired());
}

#[tokio::test]
async fn bad_credentials_surface_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&server.uri(), "anon-key");
    let err = auth.sign_in("sita@example.in", "wrong").await.unwrap_err();
    match err {
        SessionError::Auth { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn sign_up_with_and_without_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_json(json!({
            "email": "new@example.in",
            "password": "secret",
            "data": { "name": "Ravi" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-9",
            "email": "new@example.in",
            "user_metadata": { "name": "Ravi" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_json(json!({
            "email": "sita@example.in",
            "password": "secret",
            "data": { "name": "Sita" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&server.uri(), "anon-key");
    let pending = auth.sign_up("new@example.in", "secret", "Ravi").await.unwrap();
    assert_eq!(
        pending,
        SignUpOutcome::ConfirmationRequired {
            user_id: "user-9".to_string(),
            email: "new@example.in".to_string(),
        }
    );

    let signed_in = auth.sign_up("sita@example.in", "secret", " Sita ").await.unwrap();
    assert!(matches!(signed_in, SignUpOutcome::SignedIn(ref s) if s.user.id == "user-1"));
}

#[tokio::test]
async fn refresh_and_sign_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "jwt-refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer jwt-access"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthClient::new(&server.uri(), "anon-key");
    let stale = Session {
        access_token: "old-access".to_string(),
        refresh_token: Some("jwt-refresh".to_string()),
        expires_at: Some(0),
        user: SessionUser {
            id: "user-1".to_string(),
            email: None,
            name: None,
        },
    };
    assert!(stale.is_expired());
    let fresh = auth.refresh(&stale).await.unwrap();
    assert!(!fresh.is_expired());
    auth.sign_out(&fresh).await.unwrap();
}
