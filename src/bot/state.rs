use serde::{Deserialize, Serialize};

/// Publish target chosen at the start of a dialog
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Platform {
    /// Articles posted straight to the Telegram channel
    #[serde(rename = "tg")]
    ChannelTarget,
    /// Articles living as documents on the external site
    #[serde(rename = "site")]
    ExternalSiteTarget,
}

/// What the user wants done on the chosen platform
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Intent {
    /// Produce a new article from topic + description
    Generate,
    /// Rework an existing text according to feedback
    Rewrite,
}

/// Dialog step a conversation is currently waiting on
///
/// Exactly one phase is active per conversation; generation itself runs to
/// completion inside the event that triggers it, so there is no in-flight
/// phase to observe.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    /// Platform picked, waiting for the generate/rewrite choice
    ChoosingAction,
    /// Waiting for the article topic
    CollectingTopic,
    /// Topic stored, waiting for the detailed description
    CollectingDescription,
    /// Waiting for the source text to rework
    AwaitingOriginal,
    /// Source stored, waiting for the change request
    AwaitingFeedback,
}

/// Per-chat record of dialog progress
///
/// Created when the user picks a platform, mutated one event at a time, and
/// removed once a result is produced, on explicit reset, or on error.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationState {
    /// Where the finished article will be published
    pub platform: Platform,
    /// Generate or rewrite; `None` until the user picks an action
    pub intent: Option<Intent>,
    /// Article topic, first input of the generate branch
    pub topic: Option<String>,
    /// Detailed description, second input of the generate branch
    pub description: Option<String>,
    /// Source text (or external document id) for the rewrite branch
    pub original_text: Option<String>,
    /// Step the dialog is waiting on
    pub phase: Phase,
}

impl ConversationState {
    /// Fresh record right after platform selection
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            intent: None,
            topic: None,
            description: None,
            original_text: None,
            phase: Phase::ChoosingAction,
        }
    }

    /// Record seeded from a cached result for another rewrite round:
    /// the source is already known, only feedback is missing.
    #[must_use]
    pub fn rewrite_seed(platform: Platform, original_text: String) -> Self {
        Self {
            platform,
            intent: Some(Intent::Rewrite),
            topic: None,
            description: None,
            original_text: Some(original_text),
            phase: Phase::AwaitingFeedback,
        }
    }
}

/// Finished article as returned by the Generation Service
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ArticleResult {
    /// Article delivered as direct text/image, posted to the channel
    InlineArticle {
        /// Full article text
        text: String,
        /// Illustration URL, if the backend produced one
        picture_url: Option<String>,
    },
    /// Article living on the external site, addressed by document id
    ExternalDocument {
        /// Opaque document identifier on the external platform
        document_id: String,
        /// Article text, when the backend echoes it back
        text: Option<String>,
        /// Illustration URL, if the backend produced one
        picture_url: Option<String>,
    },
}

impl ArticleResult {
    /// Platform this result belongs to, derived from the variant
    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            Self::InlineArticle { .. } => Platform::ChannelTarget,
            Self::ExternalDocument { .. } => Platform::ExternalSiteTarget,
        }
    }

    /// Source text for another rewrite round: the document id for external
    /// articles, the inline text otherwise.
    #[must_use]
    pub fn rewrite_source(&self) -> &str {
        match self {
            Self::InlineArticle { text, .. } => text,
            Self::ExternalDocument { document_id, .. } => document_id,
        }
    }
}
