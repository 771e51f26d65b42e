// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session context: who is logged in, with which token.
//!
//! A [`Session`] is hydrated once at startup from persisted credentials and
//! torn down by [`Session::logout`]. Components that need the current user
//! are handed the session explicitly.

use crate::client::timer::{TimerClient, TimerState};
use crate::client::{ApiClient, ClientError};
use crate::middleware::auth::Claims;
use crate::models::api::{AuthResponse, RegisterRequest};
use crate::models::UserId;
use crate::time_utils::unix_now;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// What gets persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub token: String,
    pub user_id: UserId,
}

/// Where credentials are persisted.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credentials>, ClientError>;
    fn save(&self, credentials: &Credentials) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Credentials kept in a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::Storage(e.to_string())),
        };
        match serde_json::from_str(&raw) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding unreadable credentials");
                Ok(None)
            }
        }
    }

    fn save(&self, credentials: &Credentials) -> Result<(), ClientError> {
        let json = serde_json::to_string(credentials)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        std::fs::write(&self.path, json).map_err(|e| ClientError::Storage(e.to_string()))
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new(initial: Option<Credentials>) -> Self {
        Self {
            slot: Mutex::new(initial),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, ClientError> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), ClientError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Read the claims of a session token without checking its signature.
///
/// Only the server can verify the signature; the client uses the claims to
/// decide whether a cached token is worth presenting at all.
pub fn peek_claims(token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}

/// The logged-in user as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    /// Display copy only; the server balance is authoritative
    pub bonus_points: u64,
    pub expires_at: u64,
}

/// Explicit session context.
pub struct Session<S: CredentialStore> {
    store: S,
    api: ApiClient,
    user: Option<SessionUser>,
}

impl<S: CredentialStore> Session<S> {
    /// Restore a session from `store`.
    ///
    /// Expired, unreadable or mismatched credentials are cleared and leave
    /// the session logged out. A failed profile refresh is not fatal; the
    /// claims are enough to continue.
    pub async fn hydrate(store: S, api: ApiClient) -> Result<Self, ClientError> {
        Self::hydrate_at(store, api, unix_now()).await
    }

    pub async fn hydrate_at(store: S, mut api: ApiClient, now: u64) -> Result<Self, ClientError> {
        let restored = store.load()?.and_then(|credentials| {
            let claims = peek_claims(&credentials.token)?;
            let valid = claims.exp > now && claims.sub == credentials.user_id.as_str();
            valid.then(|| (credentials, claims))
        });

        let Some((credentials, claims)) = restored else {
            store.clear()?;
            api.set_token(None);
            return Ok(Self {
                store,
                api,
                user: None,
            });
        };

        api.set_token(Some(credentials.token));
        let mut session = Self {
            store,
            api,
            user: Some(SessionUser {
                id: credentials.user_id,
                username: claims.username,
                email: None,
                bonus_points: 0,
                expires_at: claims.exp,
            }),
        };

        if let Err(e) = session.refresh_user().await {
            tracing::warn!(error = %e, "Could not refresh user after restoring session");
        }

        Ok(session)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&SessionUser, ClientError> {
        let response = self.api.login(email, password).await?;
        self.adopt(response)
    }

    pub async fn register(
        &mut self,
        request: &RegisterRequest,
    ) -> Result<&SessionUser, ClientError> {
        let response = self.api.register(request).await?;
        self.adopt(response)
    }

    fn adopt(&mut self, response: AuthResponse) -> Result<&SessionUser, ClientError> {
        let claims = peek_claims(&response.token)
            .ok_or_else(|| ClientError::Decode("server issued an unreadable token".to_string()))?;

        self.store.save(&Credentials {
            token: response.token.clone(),
            user_id: response.user.id.clone(),
        })?;
        self.api.set_token(Some(response.token));

        let user = self.user.insert(SessionUser {
            id: response.user.id,
            username: response.user.username,
            email: Some(response.user.email),
            bonus_points: response.user.bonus_points,
            expires_at: claims.exp,
        });
        tracing::info!(user_id = %user.id, "Session started");
        Ok(user)
    }

    /// Re-fetch the profile and update the cached balance.
    pub async fn refresh_user(&mut self) -> Result<(), ClientError> {
        let id = match &self.user {
            Some(user) => user.id.clone(),
            None => return Err(ClientError::Auth("not logged in".to_string())),
        };
        let profile = self.api.get_user(&id).await?;
        if let Some(user) = self.user.as_mut() {
            user.username = profile.username;
            user.email = Some(profile.email);
            user.bonus_points = profile.bonus_points;
        }
        Ok(())
    }

    /// Forget the user and wipe persisted credentials.
    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.user = None;
        self.api.set_token(None);
        self.store.clear()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store a balance reported by the server.
    pub fn set_bonus_points(&mut self, points: u64) {
        if let Some(user) = self.user.as_mut() {
            user.bonus_points = points;
        }
    }

    /// Study timer for the current user, seeded with the cached balance.
    ///
    /// Logged out, the timer has no user id and every award attempt fails
    /// locally.
    pub fn timer(&self) -> TimerClient<ApiClient> {
        let state = match &self.user {
            Some(user) => TimerState::new().with_bonus_points(user.bonus_points),
            None => TimerState::new(),
        };
        let user_id = self.user.as_ref().map(|user| user.id.to_string());
        TimerClient::with_state(Arc::new(self.api.clone()), user_id, state)
    }

    /// Copy the balance last confirmed through the timer into the session.
    pub fn sync_from_timer(&mut self, state: &TimerState) {
        if let Some(points) = state.bonus_points() {
            self.set_bonus_points(points);
        }
    }

    /// True once the token's `exp` has passed.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.user.as_ref().map_or(true, |user| user.expires_at <= now)
    }
}
