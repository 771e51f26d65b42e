// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Native client against a live local server.

use smartstudy::client::session::{CredentialStore, FileCredentialStore, Session};
use smartstudy::client::timer::{TimerClient, AWARD_ERROR_MESSAGE};
use smartstudy::client::{ApiClient, AwardTransport, ClientConfig, ClientError};
use smartstudy::models::api::RegisterRequest;
use smartstudy::models::UserId;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::spawn_server;

fn client_for(base_url: &str) -> ApiClient {
    ApiClient::new(&ClientConfig {
        api_url: base_url.to_string(),
        ..ClientConfig::default()
    })
    .unwrap()
}

/// Server that accepts connections and never answers; returns its base URL.
async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

fn impatient_client(base_url: &str) -> ApiClient {
    ApiClient::new(&ClientConfig {
        api_url: base_url.to_string(),
        award_timeout: Duration::from_millis(300),
    })
    .unwrap()
    .with_token("t")
}

fn ada() -> RegisterRequest {
    RegisterRequest {
        username: "ada".to_string(),
        email: "ada@example.com".to_string(),
        password: "hunter22".to_string(),
    }
}

#[tokio::test]
async fn test_register_then_award_through_client() {
    let (base_url, _) = spawn_server().await;
    let api = client_for(&base_url);

    let auth = api.register(&ada()).await.unwrap();
    let api = api.with_token(auth.token);

    let grant = api.award_time(&auth.user.id).await.unwrap();
    assert_eq!(grant.points, 10);
    assert_eq!(grant.message, "You earned 10 bonus points.");

    let profile = api.get_user(&auth.user.id).await.unwrap();
    assert_eq!(profile.bonus_points, 10);
}

#[tokio::test]
async fn test_client_error_mapping() {
    let (base_url, _) = spawn_server().await;
    let api = client_for(&base_url);
    api.register(&ada()).await.unwrap();

    assert_eq!(
        api.register(&ada()).await.unwrap_err(),
        ClientError::Validation("User already exists".to_string())
    );
    assert_eq!(
        api.login("ada@example.com", "wrong-password").await.unwrap_err(),
        ClientError::Validation("Invalid credentials".to_string())
    );

    let someone: UserId = "0123456789abcdef01234567".parse().unwrap();
    assert!(matches!(
        api.get_user(&someone).await,
        Err(ClientError::Auth(_))
    ));

    let api = api.with_token("not-a-jwt");
    assert!(matches!(
        api.award_time(&someone).await,
        Err(ClientError::Auth(_))
    ));
}

#[tokio::test]
async fn test_award_for_other_account_is_auth_error() {
    let (base_url, _) = spawn_server().await;
    let api = client_for(&base_url);

    let ada_auth = api.register(&ada()).await.unwrap();
    let bob = api
        .register(&RegisterRequest {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "hunter22".to_string(),
        })
        .await
        .unwrap();

    let api = api.with_token(ada_auth.token);
    assert!(matches!(
        api.award_time(&bob.user.id).await,
        Err(ClientError::Auth(_))
    ));
}

#[tokio::test]
async fn test_unreachable_server_is_transient() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client_for(&format!("http://{}", addr)).with_token("t");
    let id: UserId = "0123456789abcdef01234567".parse().unwrap();
    assert!(matches!(
        api.award_time(&id).await,
        Err(ClientError::TransientNetwork(_))
    ));
}

#[tokio::test]
async fn test_award_timeout_is_transient() {
    let api = impatient_client(&silent_server().await);
    let id: UserId = "0123456789abcdef01234567".parse().unwrap();

    let started = std::time::Instant::now();
    let result = api.award_time(&id).await;
    let waited = started.elapsed();

    assert!(matches!(result, Err(ClientError::TransientNetwork(_))), "{:?}", result);
    assert!(waited >= Duration::from_millis(300), "gave up after {:?}", waited);
    assert!(waited < Duration::from_secs(5), "hung for {:?}", waited);
}

#[tokio::test(start_paused = true)]
async fn test_timer_shows_one_notice_when_awards_time_out() {
    let api = impatient_client(&silent_server().await);
    let timer = TimerClient::new(Arc::new(api), Some("0123456789abcdef01234567".to_string()));

    timer.start();
    tokio::time::sleep(Duration::from_millis(61_500)).await;

    let state = timer.snapshot();
    assert!(state.is_running());
    assert_eq!(state.elapsed(), 61);
    assert_eq!(state.error_notice(), Some(AWARD_ERROR_MESSAGE));
    assert_eq!(state.bonus_points(), None);
    assert_eq!(state.last_awarded_boundary(), 0);
}

#[tokio::test]
async fn test_session_login_persists_and_hydrates() {
    let (base_url, _) = spawn_server().await;
    client_for(&base_url).register(&ada()).await.unwrap();

    let path = std::env::temp_dir()
        .join(format!("smartstudy-client-{}", UserId::generate().unwrap()))
        .join("session.json");
    let store = FileCredentialStore::new(&path);

    let mut session = Session::hydrate(store.clone(), client_for(&base_url))
        .await
        .unwrap();
    assert!(session.user().is_none());

    let user = session
        .login("ada@example.com", "hunter22")
        .await
        .unwrap()
        .clone();
    assert_eq!(user.username, "ada");
    assert_eq!(store.load().unwrap().unwrap().user_id, user.id);

    // A fresh session picks up the saved credentials and refreshes the profile.
    let restored = Session::hydrate(store.clone(), client_for(&base_url))
        .await
        .unwrap();
    let restored_user = restored.user().unwrap();
    assert_eq!(restored_user.id, user.id);
    assert_eq!(restored_user.email.as_deref(), Some("ada@example.com"));
    assert!(restored.api().token().is_some());

    session.logout().unwrap();
    assert!(session.user().is_none());
    assert!(session.api().token().is_none());
    assert_eq!(store.load().unwrap(), None);

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}
