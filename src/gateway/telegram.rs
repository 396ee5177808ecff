//! Teloxide-backed [`MessagingGateway`]
//!
//! Converts the transport-neutral keyboard model into Telegram markup.
//! Messages sent without an inline keyboard carry the persistent main-menu
//! reply keyboard instead, so a reset is always one tap away.

use super::{ButtonAction, Keyboard, MessagingGateway};
use crate::bot::views::MAIN_MENU_BUTTON;
use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton, KeyboardMarkup,
    MessageId, ReplyMarkup,
};

/// Telegram adapter over a teloxide [`Bot`]
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    /// Gateway sending through `bot`
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Persistent reply keyboard with the single reset button
fn main_menu_markup() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(MAIN_MENU_BUTTON)]]).resize_keyboard()
}

/// Converts the transport-neutral keyboard into Telegram inline markup
fn inline_markup(keyboard: Keyboard) -> Result<InlineKeyboardMarkup> {
    let mut rows = Vec::with_capacity(keyboard.rows.len());
    for row in keyboard.rows {
        let mut buttons = Vec::with_capacity(row.len());
        for button in row {
            buttons.push(match button.action {
                ButtonAction::Callback(payload) => {
                    InlineKeyboardButton::callback(button.label, payload)
                }
                ButtonAction::Url(url) => {
                    let url = reqwest::Url::parse(&url)
                        .with_context(|| format!("invalid button URL: {url}"))?;
                    InlineKeyboardButton::url(button.label, url)
                }
            });
        }
        rows.push(buttons);
    }
    Ok(InlineKeyboardMarkup::new(rows))
}

fn reply_markup(keyboard: Option<Keyboard>) -> Result<ReplyMarkup> {
    match keyboard {
        Some(keyboard) => Ok(ReplyMarkup::InlineKeyboard(inline_markup(keyboard)?)),
        None => Ok(ReplyMarkup::Keyboard(main_menu_markup())),
    }
}

#[async_trait::async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32> {
        let markup = reply_markup(keyboard)?;
        let message = self
            .bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(markup)
            .await
            .context("Telegram send_message failed")?;
        Ok(message.id.0)
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        image_url: &str,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32> {
        let url = reqwest::Url::parse(image_url)
            .with_context(|| format!("invalid photo URL: {image_url}"))?;
        let markup = reply_markup(keyboard)?;
        let message = self
            .bot
            .send_photo(ChatId(chat_id), InputFile::url(url))
            .caption(caption)
            .reply_markup(markup)
            .await
            .context("Telegram send_photo failed")?;
        Ok(message.id.0)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .context("Telegram delete_message failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Button;

    #[test]
    fn test_inline_markup_preserves_layout() {
        let keyboard = Keyboard::new(vec![
            vec![Button::callback("A", "PAYLOAD_A")],
            vec![Button::callback("B", "PAYLOAD_B"), Button::callback("C", "PAYLOAD_C")],
        ]);

        let markup = inline_markup(keyboard).ok();
        let rows = markup.map(|m| m.inline_keyboard).unwrap_or_default();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn test_invalid_url_button_is_rejected() {
        let keyboard = Keyboard::new(vec![vec![Button::url("View", "not a url")]]);
        assert!(inline_markup(keyboard).is_err());
    }

    #[test]
    fn test_main_menu_markup_single_button() {
        let markup = main_menu_markup();
        assert_eq!(markup.keyboard.len(), 1);
        assert_eq!(markup.keyboard[0].len(), 1);
    }
}
