//! Coach endpoint client
//!
//! One question in, one answer (or a classified failure) out. No retries and
//! no caching: every call is a fresh `POST /api/coach/ask`.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::coach::error::AskError;
use crate::config::CoachConfig;
use crate::types::{truncate_safe, Answer, Question};

/// Path of the question-answering endpoint, relative to the base URL
pub const ASK_PATH: &str = "/api/coach/ask";

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Anything that can answer a store question.
///
/// The session only talks to this trait, so tests can drive it with a mock
/// instead of a live backend.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Coach: Send + Sync {
    /// Ask one question about one store
    async fn ask(&self, store_id: i64, question: &str) -> Result<Answer, AskError>;
}

/// HTTP client for the coach backend
#[derive(Clone)]
pub struct CoachClient {
    client: Client,
    base_url: String,
}

impl CoachClient {
    /// Create a client with the default timeout
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from the `[coach]` config section
    pub fn from_config(config: &CoachConfig) -> anyhow::Result<Self> {
        Self::with_timeout(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the ask endpoint
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, ASK_PATH)
    }

    /// Send an already validated question
    pub async fn send(&self, question: &Question) -> Result<Answer, AskError> {
        debug!(
            store_id = question.store_id,
            question_len = question.text.len(),
            "Asking coach"
        );

        let response = self
            .client
            .post(self.endpoint())
            .json(question)
            .send()
            .await
            .map_err(|e| AskError::Unreachable(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                "Coach API error: {}",
                truncate_safe(&body, 200)
            );
            return Err(AskError::Unreachable(format!("status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AskError::Unreachable(format!("failed to read response body: {}", e)))?;

        parse_answer(&body)
    }
}

#[async_trait]
impl Coach for CoachClient {
    async fn ask(&self, store_id: i64, question: &str) -> Result<Answer, AskError> {
        let question = Question::new(store_id, question)?;
        self.send(&question).await
    }
}

/// Extract the `answer` string from a response body, unmodified
pub fn parse_answer(body: &str) -> Result<Answer, AskError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| AskError::MalformedResponse(format!("body is not JSON: {}", e)))?;

    match value.get("answer") {
        Some(Value::String(text)) => Ok(Answer::new(text.clone())),
        Some(other) => Err(AskError::MalformedResponse(format!(
            "`answer` is not a string: {}",
            truncate_safe(&other.to_string(), 80)
        ))),
        None => Err(AskError::MalformedResponse(
            "missing `answer` field".to_string(),
        )),
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = CoachClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.endpoint(), "http://localhost:8000/api/coach/ask");
    }

    #[test]
    fn test_parse_answer_returns_text_unmodified() {
        let body = r#"{"answer": "  Sales dropped 12% due to stockouts.\n", "extra": 1}"#;
        let answer = parse_answer(body).unwrap();
        assert_eq!(answer.text, "  Sales dropped 12% due to stockouts.\n");
    }

    #[test]
    fn test_parse_answer_missing_field() {
        let err = parse_answer(r#"{"detail": "ok"}"#).unwrap_err();
        assert!(matches!(err, AskError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_answer_non_string_field() {
        let err = parse_answer(r#"{"answer": null}"#).unwrap_err();
        assert!(matches!(err, AskError::MalformedResponse(_)));
        let err = parse_answer(r#"{"answer": ["a"]}"#).unwrap_err();
        assert!(matches!(err, AskError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_answer_not_json() {
        let err = parse_answer("<!doctype html><html></html>").unwrap_err();
        assert!(matches!(err, AskError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question_locally() {
        // Nothing listens on this address; reaching the network would yield Unreachable
        let client = CoachClient::new("http://127.0.0.1:9").unwrap();
        let err = client.ask(1, "   ").await.unwrap_err();
        assert!(matches!(err, AskError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_ask_rejects_non_positive_store_locally() {
        let client = CoachClient::new("http://127.0.0.1:9").unwrap();
        let err = client.ask(0, "How are sales?").await.unwrap_err();
        assert!(matches!(err, AskError::InvalidInput(_)));
    }
}
