//! OAuth grants and background renewal against a fake token endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use p4m_client::auth::{Authenticator, OAuthClient, Session, SessionEvent, TokenState};
use p4m_client::config::{ApiConfig, AuthConfig};
use p4m_client::errors::AuthError;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Clone, Default)]
struct TokenServer {
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
    reject_refresh: bool,
    password_expires_in: u64,
}

impl TokenServer {
    fn grants(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r["grant_type"].clone())
            .collect()
    }
}

async fn token(State(server): State<TokenServer>, Form(form): Form<HashMap<String, String>>) -> Response {
    server.requests.lock().unwrap().push(form.clone());
    match form.get("grant_type").map(String::as_str) {
        Some("password") if form.get("password").map(String::as_str) == Some("s3cret") => Json(json!({
            "access_token": "a1",
            "token_type": "Bearer",
            "expires_in": server.password_expires_in,
            "refresh_token": "r1"
        }))
        .into_response(),
        Some("refresh_token") if !server.reject_refresh => Json(json!({
            "access_token": "a2",
            "expires_in": 3600,
            "refresh_token": "r2"
        }))
        .into_response(),
        _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response(),
    }
}

async fn start(server: TokenServer) -> ApiConfig {
    let app = Router::new()
        .route("/api/v1/token", post(token))
        .with_state(server);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ApiConfig {
        host: format!("http://{}", addr),
        client_id: "web".into(),
        client_secret: "secret".into(),
        ..ApiConfig::default()
    }
}

fn fast_refresh() -> AuthConfig {
    AuthConfig {
        token_refresh_offset_ms: 950,
        ..AuthConfig::default()
    }
}

async fn next_matching(
    events: &mut broadcast::Receiver<SessionEvent>,
    wanted: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if wanted(&event) {
                return event;
            }
        }
    })
    .await
    .expect("session event did not arrive")
}

#[tokio::test]
async fn password_grant_signs_in_and_arms_refresh() {
    let server = TokenServer {
        password_expires_in: 3600,
        ..TokenServer::default()
    };
    let api = start(server.clone()).await;
    let session = Arc::new(Session::new());
    let auth = Authenticator::new(&api, &AuthConfig::default(), session.clone());

    let tokens = auth
        .authenticate("ada", "s3cret", true, &["read".to_string()])
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "a1");
    assert_eq!(tokens.refresh_token.as_deref(), Some("r1"));
    assert!(session.is_authenticated());
    assert_eq!(auth.scheduler().pending_count(), 1);

    let request = server.requests.lock().unwrap()[0].clone();
    assert_eq!(request["username"], "ada");
    assert_eq!(request["client_id"], "web");
    assert_eq!(request["remember_me"], "true");
    assert_eq!(request["scope"], "read");

    auth.invalidate();
}

#[tokio::test]
async fn wrong_password_is_rejected_with_oauth_code() {
    let api = start(TokenServer::default()).await;
    let session = Arc::new(Session::new());
    let auth = Authenticator::new(&api, &AuthConfig::default(), session.clone());

    let err = auth.authenticate("ada", "nope", false, &[]).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected { status: 400, .. }));
    assert_eq!(err.oauth_code(), Some("invalid_grant"));
    assert!(!session.is_authenticated());
    assert_eq!(auth.scheduler().pending_count(), 0);
}

#[tokio::test]
async fn refresh_fires_before_expiry_and_rearms() {
    let server = TokenServer {
        password_expires_in: 1,
        ..TokenServer::default()
    };
    let api = start(server.clone()).await;
    let session = Arc::new(Session::new());
    let mut events = session.subscribe();
    let auth = Authenticator::new(&api, &fast_refresh(), session.clone());

    auth.authenticate("ada", "s3cret", false, &[]).await.unwrap();
    let event = next_matching(&mut events, |e| matches!(e, SessionEvent::DataUpdated(_))).await;

    let SessionEvent::DataUpdated(tokens) = event else {
        unreachable!();
    };
    assert_eq!(tokens.access_token, "a2");
    assert_eq!(tokens.refresh_token.as_deref(), Some("r2"));
    assert_eq!(session.access_token().as_deref(), Some("a2"));
    assert_eq!(auth.scheduler().pending_count(), 1);
    assert_eq!(server.grants(), vec!["password", "refresh_token"]);

    auth.invalidate();
}

#[tokio::test]
async fn failed_refresh_ends_the_session() {
    let server = TokenServer {
        password_expires_in: 1,
        reject_refresh: true,
        ..TokenServer::default()
    };
    let api = start(server).await;
    let session = Arc::new(Session::new());
    let mut events = session.subscribe();
    let auth = Authenticator::new(&api, &fast_refresh(), session.clone());

    auth.authenticate("ada", "s3cret", false, &[]).await.unwrap();
    next_matching(&mut events, |e| matches!(e, SessionEvent::Invalidated)).await;

    assert!(!session.is_authenticated());
    assert!(session.take_expired_notice());
    assert_eq!(auth.scheduler().pending_count(), 0);
}

#[tokio::test]
async fn restoring_expired_tokens_renews_them() {
    let server = TokenServer::default();
    let api = start(server.clone()).await;
    let session = Arc::new(Session::new());
    let client = Arc::new(OAuthClient::new(&api));
    let auth = Authenticator::with_client(client, &AuthConfig::default(), session.clone());

    let stale = TokenState {
        access_token: "old".into(),
        refresh_token: Some("r0".into()),
        expires_in: Some(60),
        expires_at: Some(chrono::Utc::now().timestamp_millis() - 120_000),
        scope: None,
    };
    let restored = auth.restore(stale).await.unwrap();

    assert_eq!(restored.access_token, "a2");
    assert_eq!(session.access_token().as_deref(), Some("a2"));
    assert_eq!(server.grants(), vec!["refresh_token"]);
    assert_eq!(server.requests.lock().unwrap()[0]["refresh_token"], "r0");

    auth.invalidate();
}
