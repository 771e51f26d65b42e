// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generative language API client (Gemini `generateContent`).
//!
//! Used as an opaque `ask(prompt) -> text` capability by the tutor, quiz,
//! translation and recommendation features. Rate-limit responses are
//! retried with a linear backoff; anything else fails immediately.

use crate::client::ClientError;
use crate::models::{PerformanceMetrics, QuizQuestion, SubjectMarks};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Total attempts per prompt, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2000;

/// Sampling options for one prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            top_p: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Endpoint and key for the generative API.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// Full `...:generateContent` URL
    pub api_url: String,
    pub api_key: String,
}

impl GenAiConfig {
    /// Read `GEMINI_API_URL` and `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        let api_url = std::env::var("GEMINI_API_URL")
            .map_err(|_| ClientError::Validation("GEMINI_API_URL is not set".to_string()))?;
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ClientError::Validation("GEMINI_API_KEY is not set".to_string()))?;
        Ok(Self { api_url, api_key })
    }
}

/// Generative API client.
#[derive(Clone)]
pub struct GenAiClient {
    http: reqwest::Client,
    config: GenAiConfig,
    backoff: Duration,
}

impl GenAiClient {
    pub fn new(config: GenAiConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Internal(format!("failed building HTTP client: {}", e)))?;
        Ok(Self {
            http,
            config,
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Override the base backoff (attempt `n` waits `n * backoff`).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Send `prompt` with default sampling and return the generated text.
    pub async fn ask(&self, prompt: &str) -> Result<String, ClientError> {
        self.ask_with(prompt, GenerationConfig::default()).await
    }

    pub async fn ask_with(
        &self,
        prompt: &str,
        generation_config: GenerationConfig,
    ) -> Result<String, ClientError> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config,
        };

        let mut attempt = 1;
        loop {
            let response = self
                .http
                .post(&self.config.api_url)
                .query(&[("key", self.config.api_key.as_str())])
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < MAX_ATTEMPTS {
                let delay = self.backoff * attempt;
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "Generative API rate limited, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                tracing::error!(status = status.as_u16(), attempt, "Generative API request failed");
                return Err(ClientError::from_status(status, &text));
            }

            let parsed: GenerateResponse = response
                .json()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))?;

            return parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content.parts.into_iter().next())
                .map(|p| p.text)
                .ok_or_else(|| ClientError::Decode("response has no candidates".to_string()));
        }
    }

    /// Ask the model to turn OCR'd marksheet text into subject records.
    ///
    /// `instructions` is the caller's prompt; the extracted text is appended.
    pub async fn extract_marks(
        &self,
        instructions: &str,
        marksheet_text: &str,
    ) -> Result<Vec<SubjectMarks>, ClientError> {
        let prompt = format!("{}\n{}", instructions, marksheet_text);
        let generation_config = GenerationConfig {
            temperature: 0.3,
            ..GenerationConfig::default()
        };
        let reply = self.ask_with(&prompt, generation_config).await?;
        parse_marks_reply(&reply)
    }

    /// Ask the model for a practice quiz. `prompt` must request a JSON array
    /// of question records; surrounding prose in the reply is ignored.
    pub async fn generate_questions(&self, prompt: &str) -> Result<Vec<QuizQuestion>, ClientError> {
        let generation_config = GenerationConfig {
            top_p: Some(0.9),
            ..GenerationConfig::default()
        };
        let reply = self.ask_with(prompt, generation_config).await?;
        let questions = parse_questions_reply(&reply)?;
        tracing::debug!(count = questions.len(), "Generated quiz questions");
        Ok(questions)
    }

    /// Recommendation text for a marksheet, or the built-in advice if the
    /// model cannot be reached.
    pub async fn recommendations(&self, prompt: &str, metrics: &PerformanceMetrics) -> String {
        match self.ask(prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to built-in recommendations");
                metrics.fallback_recommendations().join("\n")
            }
        }
    }
}

/// Pull the JSON array out of a model reply that may wrap it in prose or
/// code fences.
fn parse_json_array<T: DeserializeOwned>(reply: &str) -> Result<Vec<T>, ClientError> {
    let start = reply.find('[');
    let end = reply.rfind(']');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => return Err(ClientError::Decode("no JSON array in reply".to_string())),
    };
    serde_json::from_str(json).map_err(|e| ClientError::Decode(e.to_string()))
}

pub fn parse_marks_reply(reply: &str) -> Result<Vec<SubjectMarks>, ClientError> {
    parse_json_array(reply)
}

/// Quiz questions from a model reply. A reply with no questions is an error.
pub fn parse_questions_reply(reply: &str) -> Result<Vec<QuizQuestion>, ClientError> {
    let questions: Vec<QuizQuestion> = parse_json_array(reply)?;
    if questions.is_empty() {
        return Err(ClientError::Decode("reply contains no questions".to_string()));
    }
    Ok(questions)
}
