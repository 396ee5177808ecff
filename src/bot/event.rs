//! Inbound event contract consumed by the dialog core
//!
//! The transport adapter converts raw updates into these events; everything
//! past the adapter is transport-agnostic.

use crate::bot::state::{Intent, Platform};
use crate::bot::views;

/// One inbound event from the messaging gateway
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/start` command: full reset plus greeting
    StartCommand {
        /// Originating chat
        chat_id: i64,
    },
    /// Inline button press on a prompt message
    ButtonCallback {
        /// Originating chat
        chat_id: i64,
        /// Message carrying the pressed keyboard, retracted best-effort
        message_id: i32,
        /// Opaque payload of the pressed button
        payload: String,
    },
    /// Free-form text message
    TextMessage {
        /// Originating chat
        chat_id: i64,
        /// Message text
        text: String,
    },
}

impl InboundEvent {
    /// Chat the event belongs to; routing key for per-chat serialization
    #[must_use]
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::StartCommand { chat_id }
            | Self::ButtonCallback { chat_id, .. }
            | Self::TextMessage { chat_id, .. } => *chat_id,
        }
    }
}

/// Parsed form of a recognized callback payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackPayload {
    /// `CH_TG` / `CH_SITE`
    ChoosePlatform(Platform),
    /// `ACT_GEN` / `ACT_REWRITE`
    ChooseAction(Intent),
    /// `REREWRITE`: rework the cached result once more
    RewriteAgain,
    /// `PUBLISH` and its target-qualified forms
    Publish,
    /// `VIEW`: re-send the document link
    ViewDocument,
    /// `BACK`: return to the cached result
    Back,
    /// `MAIN_MENU`: full reset
    MainMenu,
}

impl CallbackPayload {
    /// Parses an opaque payload; `None` for anything unrecognized.
    ///
    /// Qualified publish payloads (`PUBLISH_TG`, `PUBLISH_ZEN`) collapse into
    /// [`CallbackPayload::Publish`]: the actual target always derives from the
    /// cached result, so a stale qualifier cannot misroute a publish.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            views::CALLBACK_PLATFORM_TG => Some(Self::ChoosePlatform(Platform::ChannelTarget)),
            views::CALLBACK_PLATFORM_SITE => {
                Some(Self::ChoosePlatform(Platform::ExternalSiteTarget))
            }
            views::CALLBACK_ACTION_GENERATE => Some(Self::ChooseAction(Intent::Generate)),
            views::CALLBACK_ACTION_REWRITE => Some(Self::ChooseAction(Intent::Rewrite)),
            views::CALLBACK_REWRITE_AGAIN => Some(Self::RewriteAgain),
            views::CALLBACK_VIEW => Some(Self::ViewDocument),
            views::CALLBACK_BACK => Some(Self::Back),
            views::CALLBACK_MAIN_MENU => Some(Self::MainMenu),
            other if other == views::CALLBACK_PUBLISH
                || other.starts_with("PUBLISH_") =>
            {
                Some(Self::Publish)
            }
            _ => None,
        }
    }
}
