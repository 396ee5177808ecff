//! ImgBB-backed image rehosting
//!
//! Turns possibly ephemeral illustration URLs into permanent ones by
//! downloading the bytes and re-uploading them. Every failure here is
//! recoverable by the caller, which falls back to the original URL.

use super::ImageRehoster;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: Option<bool>,
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: Option<String>,
}

/// [`ImageRehoster`] uploading to the ImgBB API
pub struct ImgbbClient {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
}

impl ImgbbClient {
    /// Client uploading to `upload_url` with `api_key`, both connect and
    /// read bounded by `timeout_secs`
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(upload_url: String, api_key: String, timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("failed to build image host HTTP client")?;
        Ok(Self {
            client,
            upload_url,
            api_key,
        })
    }

    async fn download(&self, image_url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .with_context(|| format!("image download failed: {image_url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("image download returned {status}: {image_url}");
        }

        let bytes = response
            .bytes()
            .await
            .context("reading image bytes failed")?;
        debug!("Downloaded {} bytes from {image_url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl ImageRehoster for ImgbbClient {
    async fn rehost(&self, image_url: &str) -> Result<String> {
        let bytes = self.download(image_url).await?;

        let form = reqwest::multipart::Form::new()
            .text("key", self.api_key.clone())
            .part(
                "image",
                reqwest::multipart::Part::bytes(bytes).file_name("image"),
            );

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .context("image upload failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("image upload returned {status}");
        }

        let payload: UploadResponse = response
            .json()
            .await
            .context("image upload response was not JSON")?;

        if payload.success != Some(true) {
            bail!("image host reported failure");
        }
        payload
            .data
            .and_then(|data| data.url)
            .filter(|url| !url.is_empty())
            .context("image upload response carried no URL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_configured_timeout() {
        let client = ImgbbClient::new(
            "https://api.imgbb.com/1/upload".to_string(),
            "key".to_string(),
            120,
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_upload_response_parses_success() {
        let body = r#"{"success": true, "data": {"url": "https://i.ibb.co/x.jpg", "id": "x"}}"#;
        let payload: Option<UploadResponse> = serde_json::from_str(body).ok();
        let payload = payload.filter(|p| p.success == Some(true));
        let url = payload.and_then(|p| p.data).and_then(|d| d.url);
        assert_eq!(url.as_deref(), Some("https://i.ibb.co/x.jpg"));
    }

    #[test]
    fn test_upload_response_tolerates_missing_fields() {
        let payload: Option<UploadResponse> = serde_json::from_str("{}").ok();
        assert!(payload.is_some_and(|p| p.success.is_none() && p.data.is_none()));
    }
}
