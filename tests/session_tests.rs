// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session hydration from persisted credentials.
//!
//! The API client points at a closed port, so any profile refresh fails and
//! only the locally decided behaviour is exercised.

use smartstudy::client::session::{CredentialStore, Credentials, MemoryCredentialStore, Session};
use smartstudy::client::timer::TimerState;
use smartstudy::client::{ApiClient, ClientConfig};
use smartstudy::models::UserId;

mod common;
use common::create_test_jwt;

const KEY: &[u8] = b"client_never_sees_this_key_32b!!";

async fn offline_api() -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    ApiClient::new(&ClientConfig {
        api_url: format!("http://{}", addr),
        ..ClientConfig::default()
    })
    .unwrap()
}

fn stored(token: String, user_id: &UserId) -> MemoryCredentialStore {
    MemoryCredentialStore::new(Some(Credentials {
        token,
        user_id: user_id.clone(),
    }))
}

#[tokio::test]
async fn test_expired_credentials_are_cleared() {
    let id = UserId::generate().unwrap();
    let store = stored(create_test_jwt(id.as_str(), KEY, -10), &id);

    let session = Session::hydrate(store, offline_api().await).await.unwrap();
    assert!(session.user().is_none());
    assert!(session.api().token().is_none());
}

#[tokio::test]
async fn test_mismatched_user_id_is_cleared() {
    let id = UserId::generate().unwrap();
    let other = UserId::generate().unwrap();
    let store = stored(create_test_jwt(other.as_str(), KEY, 3600), &id);

    let session = Session::hydrate(store, offline_api().await).await.unwrap();
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_garbage_token_is_cleared() {
    let id = UserId::generate().unwrap();
    let store = stored("definitely.not.a-jwt".to_string(), &id);

    let session = Session::hydrate(store, offline_api().await).await.unwrap();
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_valid_credentials_survive_failed_refresh() {
    let id = UserId::generate().unwrap();
    let token = create_test_jwt(id.as_str(), KEY, 3600);
    let store = stored(token.clone(), &id);

    let session = Session::hydrate(store, offline_api().await).await.unwrap();
    let user = session.user().unwrap();
    assert_eq!(user.id, id);
    assert_eq!(user.username, "tester");
    assert_eq!(user.email, None);
    assert_eq!(session.api().token(), Some(token.as_str()));
    assert!(!session.is_expired_at(user.expires_at - 1));
    assert!(session.is_expired_at(user.expires_at));
}

#[tokio::test]
async fn test_rejected_credentials_removed_from_store() {
    let id = UserId::generate().unwrap();
    let token = create_test_jwt(id.as_str(), KEY, 3600);
    let store = stored(token, &id);
    let claims = smartstudy::client::session::peek_claims(
        &store.load().unwrap().unwrap().token,
    )
    .unwrap();

    // Hydrating at the expiry instant treats the token as expired.
    let session = Session::hydrate_at(store, offline_api().await, claims.exp)
        .await
        .unwrap();
    assert!(session.user().is_none());
    assert_eq!(session.store().load().unwrap(), None);
}

#[tokio::test]
async fn test_logout_clears_store() {
    let id = UserId::generate().unwrap();
    let store = stored(create_test_jwt(id.as_str(), KEY, 3600), &id);

    let mut session = Session::hydrate(store, offline_api().await).await.unwrap();
    assert!(session.store().load().unwrap().is_some());

    session.logout().unwrap();
    assert!(session.user().is_none());
    assert_eq!(session.store().load().unwrap(), None);
}

#[tokio::test]
async fn test_timer_balance_flows_back_into_session() {
    let id = UserId::generate().unwrap();
    let store = stored(create_test_jwt(id.as_str(), KEY, 3600), &id);
    let mut session = Session::hydrate(store, offline_api().await).await.unwrap();

    let timer = session.timer();
    assert_eq!(timer.snapshot().bonus_points(), Some(0));

    // No confirmed balance yet: the session keeps its own.
    session.sync_from_timer(&TimerState::new());
    assert_eq!(session.user().unwrap().bonus_points, 0);

    session.sync_from_timer(&TimerState::new().with_bonus_points(40));
    assert_eq!(session.user().unwrap().bonus_points, 40);
    assert_eq!(session.timer().snapshot().bonus_points(), Some(40));
}

#[tokio::test]
async fn test_logged_out_timer_has_no_balance() {
    let id = UserId::generate().unwrap();
    let store = stored(create_test_jwt(id.as_str(), KEY, -10), &id);
    let mut session = Session::hydrate(store, offline_api().await).await.unwrap();

    let timer = session.timer();
    assert_eq!(timer.snapshot().bonus_points(), None);

    session.sync_from_timer(&TimerState::new().with_bonus_points(40));
    assert!(session.user().is_none());
}
