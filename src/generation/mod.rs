//! Generation Service client
//!
//! Builds structured requests from dialog input, posts them to the
//! configured webhook, and parses the channel-dependent response shapes into
//! [`ArticleResult`] values. All failures come back as typed
//! [`GenerationError`]s; nothing here retries or panics.

pub mod request;
pub mod response;

use crate::bot::state::{ArticleResult, Platform};
use crate::config::ERROR_BODY_PREVIEW_CHARS;
use crate::utils::truncate_str;
use anyhow::Context;
use request::{DocumentPublishRequest, GenerationRequest};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when talking to the Generation Service
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Network failure or timeout before a response arrived
    #[error("Transport error: {0}")]
    Transport(String),
    /// Non-success status from the webhook
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Cleaned response excerpt
        message: String,
    },
    /// Response body matched no recognized shape
    #[error("Unrecognized response: {0}")]
    Parse(String),
}

/// Article-producing backend as seen by the dialog core
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArticleGenerator: Send + Sync {
    /// Produce a new article from a topic and description
    async fn generate(
        &self,
        chat_id: i64,
        platform: Platform,
        topic: &str,
        description: &str,
    ) -> Result<ArticleResult, GenerationError>;

    /// Rework existing text according to feedback
    async fn rewrite(
        &self,
        chat_id: i64,
        platform: Platform,
        original: &str,
        feedback: &str,
    ) -> Result<ArticleResult, GenerationError>;

    /// Ask the service to publish an already generated document
    async fn publish_document(&self, document_id: &str) -> Result<(), GenerationError>;
}

/// Webhook-backed [`ArticleGenerator`]
pub struct GenerationClient {
    client: reqwest::Client,
    webhook_url: String,
}

impl GenerationClient {
    /// Creates a client with both connect and read bounded by `timeout_secs`
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built; a client
    /// without the configured timeouts is never used as a fallback.
    pub fn new(webhook_url: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("failed to build generation HTTP client")?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// Posts a JSON body to the webhook and returns the raw response text
    async fn post_json<T: Serialize + Sync>(&self, body: &T) -> Result<String, GenerationError> {
        if let Ok(payload) = serde_json::to_string(body) {
            debug!("→ generation request: {payload}");
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        debug!(
            "← generation response ({status}): {}",
            truncate_str(&text, ERROR_BODY_PREVIEW_CHARS)
        );

        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: clean_error_body(&text),
            });
        }

        Ok(text)
    }
}

/// Strips proxy HTML pages and truncates long bodies before they land in an
/// error message
fn clean_error_body(body: &str) -> String {
    let trimmed = body.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        "Server returned HTML error page".to_string()
    } else if body.chars().count() > ERROR_BODY_PREVIEW_CHARS {
        format!(
            "{}... (truncated)",
            truncate_str(body, ERROR_BODY_PREVIEW_CHARS)
        )
    } else {
        body.to_string()
    }
}

#[async_trait::async_trait]
impl ArticleGenerator for GenerationClient {
    async fn generate(
        &self,
        chat_id: i64,
        platform: Platform,
        topic: &str,
        description: &str,
    ) -> Result<ArticleResult, GenerationError> {
        let request = GenerationRequest::generate(chat_id, platform, topic, description);
        let body = self.post_json(&request).await?;
        response::parse_article(platform, &body)
    }

    async fn rewrite(
        &self,
        chat_id: i64,
        platform: Platform,
        original: &str,
        feedback: &str,
    ) -> Result<ArticleResult, GenerationError> {
        let request = GenerationRequest::rewrite(chat_id, platform, original, feedback);
        let body = self.post_json(&request).await?;
        response::parse_article(platform, &body)
    }

    async fn publish_document(&self, document_id: &str) -> Result<(), GenerationError> {
        let request = DocumentPublishRequest::new(document_id);
        // Any 2xx means the service accepted the publish; the body is not
        // specified and may be empty.
        self.post_json(&request).await.map(|_| ())
    }
}
