//! Messaging gateway contract
//!
//! The dialog core talks to the chat transport only through
//! [`MessagingGateway`], so controllers and dispatchers stay testable without
//! a live bot. The Telegram adapter lives in [`telegram`].

pub mod telegram;

use anyhow::Result;

pub use telegram::TelegramGateway;

/// What pressing an inline button does
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    /// Feed an opaque payload back as a `ButtonCallback` event
    Callback(String),
    /// Open a URL; produces no inbound event
    Url(String),
}

/// Single inline button
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    /// Visible label
    pub label: String,
    /// Press behavior
    pub action: ButtonAction,
}

impl Button {
    /// Button that posts `payload` back through the callback pipeline
    pub fn callback(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(payload.into()),
        }
    }

    /// Button that opens a URL
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Inline keyboard as rows of buttons
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keyboard {
    /// Button rows, top to bottom
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Keyboard from explicit rows
    #[must_use]
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }
}

/// Outbound command surface of the chat transport
///
/// Messages sent without an inline keyboard carry the persistent main-menu
/// reply keyboard instead, so the user can always reset.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a text message, returning the created message id
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>)
        -> Result<i32>;

    /// Send a photo by URL with a caption, returning the created message id
    async fn send_photo(
        &self,
        chat_id: i64,
        image_url: &str,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32>;

    /// Delete a previously sent message
    ///
    /// Callers treat failures as benign; a message that is already gone must
    /// not break the surrounding transition.
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()>;
}
