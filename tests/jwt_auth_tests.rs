// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication tests.
//!
//! These tests verify that tokens issued at login can be decoded by the auth
//! middleware and by the client's claim peek, catching compatibility issues
//! early.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use smartstudy::client::session::peek_claims;
use smartstudy::config::DEFAULT_JWT_TTL_SECS;
use smartstudy::middleware::auth::{create_jwt, verify_jwt};
use smartstudy::models::UserId;

mod common;
use common::create_test_jwt;

/// Claims structure that must match what the middleware expects.
/// This is the canonical format - if either create_jwt or the middleware
/// changes, this test should catch the incompatibility.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    exp: u64,
    iat: u64,
}

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

#[test]
fn test_jwt_roundtrip() {
    let id = UserId::generate().unwrap();
    let token = create_jwt(&id, "ada", SIGNING_KEY, DEFAULT_JWT_TTL_SECS).unwrap();

    // Decode independently of the middleware
    let key = DecodingKey::from_secret(SIGNING_KEY);
    let token_data = decode::<Claims>(&token, &key, &Validation::new(Algorithm::HS256))
        .expect("Failed to decode JWT - check Claims struct compatibility");

    assert_eq!(token_data.claims.sub, id.to_string());
    assert_eq!(token_data.claims.username, "ada");
    assert_eq!(token_data.claims.exp - token_data.claims.iat, DEFAULT_JWT_TTL_SECS);
}

#[test]
fn test_jwt_sub_parses_as_user_id() {
    let id = UserId::generate().unwrap();
    let token = create_jwt(&id, "ada", SIGNING_KEY, 60).unwrap();

    let claims = verify_jwt(&token, SIGNING_KEY).unwrap();
    let parsed: UserId = claims.sub.parse().expect("sub claim should be a user id");
    assert_eq!(parsed, id);
}

#[test]
fn test_expired_token_has_no_leeway() {
    let id = UserId::generate().unwrap();
    let token = create_test_jwt(id.as_str(), SIGNING_KEY, -1);
    assert!(verify_jwt(&token, SIGNING_KEY).is_err());

    // The client can still read it, and sees when it expired.
    let claims = peek_claims(&token).unwrap();
    assert!(claims.exp < claims.iat);
}

#[test]
fn test_other_algorithms_rejected() {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let id = UserId::generate().unwrap();
    let now = smartstudy::time_utils::unix_now();
    let claims = Claims {
        sub: id.to_string(),
        username: "ada".to_string(),
        exp: now + 60,
        iat: now,
    };
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(verify_jwt(&token, SIGNING_KEY).is_err());
}
