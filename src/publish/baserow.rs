//! Baserow-backed [`RecordStore`]
//!
//! Published site articles become rows in a Baserow table. The endpoint and
//! token come from configuration; a non-success status is a publish failure.

use super::{ArticleRecord, RecordStore};
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::debug;

/// Tabular client creating one row per published article
pub struct BaserowClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl BaserowClient {
    /// Client posting rows to `api_url` with `token`, both connect and read
    /// bounded by `timeout_secs`
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(api_url: String, token: String, timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("failed to build tabular store HTTP client")?;
        Ok(Self {
            client,
            api_url,
            token,
        })
    }
}

#[async_trait::async_trait]
impl RecordStore for BaserowClient {
    async fn create_record(&self, record: &ArticleRecord) -> Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Token {}", self.token))
            .json(record)
            .send()
            .await
            .context("tabular store request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "tabular store returned {status}: {}",
                crate::utils::truncate_str(&body, crate::config::ERROR_BODY_PREVIEW_CHARS)
            );
        }

        debug!("Created tabular record ({} chars)", record.content.chars().count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_configured_timeout() {
        let client = BaserowClient::new(
            "https://api.baserow.io/api/database/rows/table/1/".to_string(),
            "token".to_string(),
            120,
        );
        assert!(client.is_ok());
    }
}
