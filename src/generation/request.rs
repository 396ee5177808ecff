//! Structured request bodies for the Generation Service
//!
//! Requests are serde values, never hand-built strings, so free text with
//! quotes, backslashes, or newlines survives the wire unchanged. Field names
//! and nesting match what the webhook already expects.

use crate::bot::state::Platform;
use serde::Serialize;

/// Wire verb of a generation call
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    /// New article from topic + description
    Generate,
    /// Rework of existing text per feedback
    Rewrite,
}

/// Canonical generate/rewrite request
///
/// Optional fields are omitted entirely when absent: a generate request
/// carries `topic`/`description`, a rewrite request carries
/// `original`/`feedback`.
#[derive(Clone, Debug, Serialize)]
pub struct GenerationRequest {
    /// Originating chat, echoed for the backend's bookkeeping
    pub chat_id: i64,
    /// Target platform, `"tg"` or `"site"` on the wire
    pub channel: Platform,
    /// Wire verb
    pub action: RequestAction,
    /// Article topic (generate only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Detailed description (generate only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source text or document id (rewrite only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Requested changes (rewrite only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl GenerationRequest {
    /// Request for a brand-new article
    #[must_use]
    pub fn generate(chat_id: i64, platform: Platform, topic: &str, description: &str) -> Self {
        Self {
            chat_id,
            channel: platform,
            action: RequestAction::Generate,
            topic: Some(topic.to_string()),
            description: Some(description.to_string()),
            original: None,
            feedback: None,
        }
    }

    /// Request reworking `original` according to `feedback`
    #[must_use]
    pub fn rewrite(chat_id: i64, platform: Platform, original: &str, feedback: &str) -> Self {
        Self {
            chat_id,
            channel: platform,
            action: RequestAction::Rewrite,
            topic: None,
            description: None,
            original: Some(original.to_string()),
            feedback: Some(feedback.to_string()),
        }
    }
}

/// Publish request for an already generated external document
#[derive(Clone, Debug, Serialize)]
pub struct DocumentPublishRequest {
    /// Always `"publish"`
    pub action: &'static str,
    /// Document to publish
    #[serde(rename = "documentId")]
    pub document_id: String,
}

impl DocumentPublishRequest {
    /// Publish request for `document_id`
    #[must_use]
    pub fn new(document_id: &str) -> Self {
        Self {
            action: "publish",
            document_id: document_id.to_string(),
        }
    }
}
