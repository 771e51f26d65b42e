// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Native client for the SmartStudy API.
//!
//! Handles:
//! - Account calls (register, login, profile)
//! - Study-time awards for the [`timer::TimerClient`]
//! - Session persistence ([`session`])
//! - Generative AI prompts ([`genai`])

pub mod genai;
pub mod session;
pub mod timer;

use crate::models::api::{
    ApiErrorBody, AuthResponse, LoginRequest, RegisterRequest, UpdateTimeRequest,
    UpdateTimeResponse, UserResponse,
};
use crate::models::{UserId, UserProfile};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// Award calls give up after this long; expiry counts as a failed award.
pub const DEFAULT_AWARD_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The session has no usable user id, so nothing was sent.
    #[error("Invalid user id")]
    InvalidUserId,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Server error: {0}")]
    Internal(String),

    #[error("Unexpected response ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .map(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Validation(message)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ClientError::TransientNetwork(message),
            s if s.is_server_error() => ClientError::Internal(message),
            s => ClientError::Api {
                status: s.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::TransientNetwork(err.to_string())
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, without trailing slash
    pub api_url: String,
    pub award_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            award_timeout: DEFAULT_AWARD_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Read `SMARTSTUDY_API_URL`, falling back to localhost.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(url) = std::env::var("SMARTSTUDY_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        config
    }
}

/// Balance returned by a successful award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardGrant {
    /// Authoritative balance after the award
    pub points: u64,
    pub message: String,
}

/// Anything that can credit one reward interval to an account.
pub trait AwardTransport: Send + Sync + 'static {
    fn award_time(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<AwardGrant, ClientError>> + Send;
}

/// HTTP client for the `/api/user` endpoints.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    award_timeout: Duration,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.award_timeout)
            .build()
            .map_err(|e| ClientError::Internal(format!("failed building HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            award_timeout: config.award_timeout,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let url = format!("{}/api/user/register", self.base_url);
        self.send_json(self.http.post(&url).json(request)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let url = format!("{}/api/user/login", self.base_url);
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(self.http.post(&url).json(&body)).await
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<UserProfile, ClientError> {
        let url = format!("{}/api/user/user/{}", self.base_url, user_id);
        let response: UserResponse = self.send_json(self.authorized(self.http.get(&url))?).await?;
        Ok(response.user)
    }

    fn authorized(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ClientError::Auth("not logged in".to_string()))?;
        Ok(builder.bearer_auth(token))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status, &body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl AwardTransport for ApiClient {
    async fn award_time(&self, user_id: &UserId) -> Result<AwardGrant, ClientError> {
        let url = format!("{}/api/user/update-time", self.base_url);
        let body = UpdateTimeRequest {
            user_id: Some(user_id.to_string()),
        };
        let request = self
            .authorized(self.http.post(&url).json(&body))?
            .timeout(self.award_timeout);

        let response: UpdateTimeResponse = self.send_json(request).await?;
        if !response.success {
            return Err(ClientError::Decode(
                "award response did not report success".to_string(),
            ));
        }

        Ok(AwardGrant {
            points: response.points,
            message: response.message,
        })
    }
}
