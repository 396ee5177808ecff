//! Dialog UI components
//!
//! All user-facing copy and keyboard layouts for the article dialog, kept in
//! one place so handlers only deal with flow.

use crate::config::GOOGLE_DOCS_URL_PREFIX;
use crate::gateway::{Button, Keyboard};
use crate::bot::state::Platform;

// ─────────────────────────────────────────────────────────────────────────────
// Callback constants
// ─────────────────────────────────────────────────────────────────────────────

/// Callback data for choosing the Telegram channel platform
pub const CALLBACK_PLATFORM_TG: &str = "CH_TG";
/// Callback data for choosing the external site platform
pub const CALLBACK_PLATFORM_SITE: &str = "CH_SITE";
/// Callback data for the generate action
pub const CALLBACK_ACTION_GENERATE: &str = "ACT_GEN";
/// Callback data for the rewrite action
pub const CALLBACK_ACTION_REWRITE: &str = "ACT_REWRITE";
/// Callback data for rewriting the cached result once more
pub const CALLBACK_REWRITE_AGAIN: &str = "REREWRITE";
/// Callback data for publishing the cached result to the channel
pub const CALLBACK_PUBLISH_CHANNEL: &str = "PUBLISH_TG";
/// Callback data for publishing the cached result to the site
pub const CALLBACK_PUBLISH_SITE: &str = "PUBLISH_ZEN";
/// Unqualified publish payload; qualified forms add `_<target>`
pub const CALLBACK_PUBLISH: &str = "PUBLISH";
/// Callback data for re-sending the document link
pub const CALLBACK_VIEW: &str = "VIEW";
/// Callback data for returning to the cached result
pub const CALLBACK_BACK: &str = "BACK";
/// Callback data for a full reset
pub const CALLBACK_MAIN_MENU: &str = "MAIN_MENU";

/// Label of the persistent reply-keyboard button; arriving as plain text it
/// triggers a full reset (matched case-insensitively)
pub const MAIN_MENU_BUTTON: &str = "Главное меню";

/// Whether an inbound text is the main-menu reset button
#[must_use]
pub fn is_main_menu_text(text: &str) -> bool {
    text.trim().to_lowercase() == MAIN_MENU_BUTTON.to_lowercase()
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Full welcome for a chat's first contact
#[must_use]
pub fn welcome_message() -> &'static str {
    "👋 Привет! Я помогу сгенерировать или переписать статью и опубликовать её в Telegram-канал или на сайт."
}

/// Platform-choice prompt
#[must_use]
pub fn platform_prompt() -> &'static str {
    "Выбери площадку:"
}

/// Action-choice prompt for the picked platform
#[must_use]
pub fn action_prompt(platform: Platform) -> String {
    let label = match platform {
        Platform::ChannelTarget => "Telegram",
        Platform::ExternalSiteTarget => "Сайтом",
    };
    format!("Что делаем с {label}?")
}

/// First generate-branch question
#[must_use]
pub fn topic_prompt() -> &'static str {
    "📝 Введите тему статьи:"
}

/// Second generate-branch question
#[must_use]
pub fn description_prompt() -> &'static str {
    "📝 Опишите подробнее:"
}

/// First rewrite-branch question
#[must_use]
pub fn original_prompt() -> &'static str {
    "🔄 Пришлите статью для рерайта:"
}

/// Second rewrite-branch question
#[must_use]
pub fn feedback_prompt() -> &'static str {
    "✏️ Укажите, что изменить:"
}

/// Feedback question when reworking an already finished article
#[must_use]
pub fn rerewrite_feedback_prompt() -> &'static str {
    "✏️ Что нужно изменить в статье?"
}

/// Progress note while generating
#[must_use]
pub fn generating_progress() -> &'static str {
    "⏳ Генерирую..."
}

/// Progress note while rewriting
#[must_use]
pub fn rewriting_progress() -> &'static str {
    "⏳ Переписываю..."
}

/// Generic generation failure
#[must_use]
pub fn generation_failed() -> &'static str {
    "❌ Ошибка генерации."
}

/// Generic rewrite failure
#[must_use]
pub fn rewrite_failed() -> &'static str {
    "❌ Ошибка при рерайте."
}

/// Shown when an action arrives with no conversation record
#[must_use]
pub fn state_missing() -> &'static str {
    "❌ Ошибка состояния. Попробуйте заново."
}

/// Shown when rewrite/publish is requested with nothing cached
#[must_use]
pub fn generate_first() -> &'static str {
    "❌ Сначала сгенерируйте статью."
}

/// Channel publish confirmation
#[must_use]
pub fn published_to_channel() -> &'static str {
    "✅ Опубликовано в Telegram канал!"
}

/// Site publish confirmation
#[must_use]
pub fn published_to_site() -> &'static str {
    "✅ Опубликовано на сайт!"
}

/// Header above the site-result action keyboard
#[must_use]
pub fn site_result_ready() -> &'static str {
    "✅ Статья готова! Вы можете:"
}

/// Public view URL of an external document
#[must_use]
pub fn document_url(document_id: &str) -> String {
    format!("{GOOGLE_DOCS_URL_PREFIX}{document_id}")
}

/// Text form of the document link, for the `VIEW` fallback
#[must_use]
pub fn document_link_message(document_id: &str) -> String {
    format!("🔗 Ссылка на статью в Google Docs: {}", document_url(document_id))
}

/// Liveness line for `/healthcheck`
#[must_use]
pub fn healthcheck_message(conversations: u64, results: u64, greeted: u64) -> String {
    format!(
        "✅ Бот работает.\nДиалогов: {conversations}\nСтатей в кеше: {results}\nПриветствовано: {greeted}"
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

/// Platform-choice keyboard
///
/// # Examples
///
/// ```
/// use newsroom_bot::bot::views::platform_keyboard;
/// let keyboard = platform_keyboard();
/// assert_eq!(keyboard.rows.len(), 2);
/// ```
#[must_use]
pub fn platform_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![Button::callback("📱 Telegram", CALLBACK_PLATFORM_TG)],
        vec![Button::callback("🌐 Сайт", CALLBACK_PLATFORM_SITE)],
    ])
}

/// Action-choice keyboard
#[must_use]
pub fn action_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![Button::callback("📝 Генерировать", CALLBACK_ACTION_GENERATE)],
        vec![Button::callback("✍️ Переписать", CALLBACK_ACTION_REWRITE)],
    ])
}

/// Post-result keyboard for channel articles
#[must_use]
pub fn inline_result_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![Button::callback("✍️ Переписать", CALLBACK_REWRITE_AGAIN)],
        vec![Button::callback("🚀 Запостить", CALLBACK_PUBLISH_CHANNEL)],
    ])
}

/// Post-result keyboard for site articles, with the document view link
#[must_use]
pub fn site_result_keyboard(document_id: &str) -> Keyboard {
    Keyboard::new(vec![
        vec![Button::url("👀 Посмотреть", document_url(document_id))],
        vec![
            Button::callback("✍️ Переписать", CALLBACK_REWRITE_AGAIN),
            Button::callback("🚀 Запостить", CALLBACK_PUBLISH_SITE),
        ],
    ])
}

/// Single back button under the document link
#[must_use]
pub fn back_keyboard() -> Keyboard {
    Keyboard::new(vec![vec![Button::callback("🔙 Назад", CALLBACK_BACK)]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ButtonAction;

    #[test]
    fn test_main_menu_text_case_insensitive() {
        assert!(is_main_menu_text("Главное меню"));
        assert!(is_main_menu_text("  главное меню "));
        assert!(is_main_menu_text("ГЛАВНОЕ МЕНЮ"));
        assert!(!is_main_menu_text("меню"));
    }

    #[test]
    fn test_action_prompt_uses_platform_label() {
        assert_eq!(action_prompt(Platform::ChannelTarget), "Что делаем с Telegram?");
        assert_eq!(action_prompt(Platform::ExternalSiteTarget), "Что делаем с Сайтом?");
    }

    #[test]
    fn test_site_result_keyboard_links_document() {
        let keyboard = site_result_keyboard("doc123");
        let view = &keyboard.rows[0][0];
        assert_eq!(
            view.action,
            ButtonAction::Url("https://docs.google.com/document/d/doc123".to_string())
        );
    }
}
