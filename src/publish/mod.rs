//! Publish pipeline for finished articles
//!
//! The dispatcher owns the exhaustive branch on [`ArticleResult`]: inline
//! articles go to the Telegram channel through the gateway, external
//! documents go to the site through either the generation webhook's publish
//! action or a tabular create-record call with best-effort image rehosting.

pub mod baserow;
pub mod imgbb;

pub use baserow::BaserowClient;
pub use imgbb::ImgbbClient;

use crate::bot::state::ArticleResult;
use crate::config::CAPTION_LIMIT;
use crate::gateway::MessagingGateway;
use crate::generation::ArticleGenerator;
use crate::utils::split_caption;
use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Row stored for a published site article
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ArticleRecord {
    /// Article text
    pub content: String,
    /// Creation instant, RFC 3339 UTC
    pub date_created: String,
    /// Illustration URL; omitted from the payload when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Tabular backend that keeps published site articles as rows
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Create one row for a published article
    async fn create_record(&self, record: &ArticleRecord) -> Result<()>;
}

/// Image host that turns possibly ephemeral URLs into permanent ones
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImageRehoster: Send + Sync {
    /// Fetch the source image and re-upload it, returning the permanent URL
    async fn rehost(&self, image_url: &str) -> Result<String>;
}

/// How external documents reach the site
pub enum SitePublisher {
    /// `{action: "publish"}` call back to the Generation Service
    Webhook(Arc<dyn ArticleGenerator>),
    /// Tabular create-record, rehosting the image first when possible
    Tabular {
        /// Row store
        records: Arc<dyn RecordStore>,
        /// Optional rehoster; without one the original URL is stored as-is
        rehoster: Option<Arc<dyn ImageRehoster>>,
    },
}

/// Routes finished articles to their publish target
pub struct PublishDispatcher {
    gateway: Arc<dyn MessagingGateway>,
    site: SitePublisher,
    channel_id: i64,
}

impl PublishDispatcher {
    /// Dispatcher posting inline articles to `channel_id` and external
    /// documents through `site`
    #[must_use]
    pub fn new(gateway: Arc<dyn MessagingGateway>, site: SitePublisher, channel_id: i64) -> Self {
        Self {
            gateway,
            site,
            channel_id,
        }
    }

    /// Publishes a result to the platform its variant belongs to
    ///
    /// # Errors
    ///
    /// Returns an error when the target delivery fails; rehost failures are
    /// absorbed per the image-durability contract and never propagate.
    pub async fn publish(&self, result: &ArticleResult) -> Result<()> {
        match result {
            ArticleResult::InlineArticle { text, picture_url } => {
                self.publish_to_channel(text, picture_url.as_deref()).await
            }
            ArticleResult::ExternalDocument {
                document_id,
                text,
                picture_url,
            } => {
                self.publish_to_site(document_id, text.as_deref(), picture_url.as_deref())
                    .await
            }
        }
    }

    /// Channel post: photo with a caption-sized head plus the exact
    /// remainder as a follow-up, or plain text without a picture
    async fn publish_to_channel(&self, text: &str, picture_url: Option<&str>) -> Result<()> {
        if let Some(url) = picture_url {
            let (caption, remainder) = split_caption(text, CAPTION_LIMIT);
            self.gateway
                .send_photo(self.channel_id, url, &caption, None)
                .await
                .context("channel photo post failed")?;
            if let Some(rest) = remainder {
                self.gateway
                    .send_text(self.channel_id, &rest, None)
                    .await
                    .context("channel remainder post failed")?;
            }
        } else {
            self.gateway
                .send_text(self.channel_id, text, None)
                .await
                .context("channel text post failed")?;
        }

        info!(chat_id = self.channel_id, "Published article to channel");
        Ok(())
    }

    async fn publish_to_site(
        &self,
        document_id: &str,
        text: Option<&str>,
        picture_url: Option<&str>,
    ) -> Result<()> {
        match &self.site {
            SitePublisher::Webhook(generator) => {
                generator
                    .publish_document(document_id)
                    .await
                    .context("document publish call failed")?;
                info!(document_id, "Published document via webhook");
                Ok(())
            }
            SitePublisher::Tabular { records, rehoster } => {
                let Some(content) = text.filter(|t| !t.is_empty()) else {
                    bail!("site article {document_id} has no text to store");
                };

                let image_url = match picture_url {
                    Some(url) => Some(durable_image_url(rehoster.as_ref(), url).await),
                    None => None,
                };

                let record = ArticleRecord {
                    content: content.to_string(),
                    date_created: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                    image_url,
                };
                records
                    .create_record(&record)
                    .await
                    .context("tabular create-record failed")?;
                info!(document_id, "Published article to tabular store");
                Ok(())
            }
        }
    }
}

/// Best-effort rehost: any failure falls back to the original URL, because
/// publish completion takes priority over image permanence
async fn durable_image_url(rehoster: Option<&Arc<dyn ImageRehoster>>, url: &str) -> String {
    let Some(rehoster) = rehoster else {
        return url.to_string();
    };

    match rehoster.rehost(url).await {
        Ok(permanent) => {
            info!("Image rehosted: {url} -> {permanent}");
            permanent
        }
        Err(e) => {
            warn!("Image rehost failed, keeping original URL {url}: {e:#}");
            url.to_string()
        }
    }
}
