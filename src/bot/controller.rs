//! Dialog state machine
//!
//! One controller instance serves every chat; the router guarantees events
//! for the same chat arrive here one at a time, so read-modify-write on a
//! conversation record is safe. All outbound traffic goes through the
//! [`MessagingGateway`] and every failure path degrades to the platform
//! prompt instead of leaving the chat stuck.

use crate::bot::event::{CallbackPayload, InboundEvent};
use crate::bot::state::{ArticleResult, ConversationState, Intent, Phase, Platform};
use crate::bot::store::{ConversationStore, GreetedSet, ResultCache};
use crate::bot::views;
use crate::generation::{ArticleGenerator, GenerationError};
use crate::gateway::MessagingGateway;
use crate::publish::PublishDispatcher;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Consumes inbound events and drives the per-chat dialog
pub struct DialogController {
    gateway: Arc<dyn MessagingGateway>,
    generator: Arc<dyn ArticleGenerator>,
    dispatcher: PublishDispatcher,
    conversations: ConversationStore,
    results: ResultCache,
    greeted: GreetedSet,
}

impl DialogController {
    /// Controller over the given collaborators and stores
    #[must_use]
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        generator: Arc<dyn ArticleGenerator>,
        dispatcher: PublishDispatcher,
        conversations: ConversationStore,
        results: ResultCache,
        greeted: GreetedSet,
    ) -> Self {
        Self {
            gateway,
            generator,
            dispatcher,
            conversations,
            results,
            greeted,
        }
    }

    /// Applies one inbound event to the chat's dialog
    ///
    /// # Errors
    ///
    /// Returns an error when an outbound send fails; the router logs it and
    /// falls back to [`DialogController::recover`].
    pub async fn handle_event(&self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::StartCommand { chat_id } => self.full_reset_and_prompt(chat_id).await,
            InboundEvent::TextMessage { chat_id, text } => self.handle_text(chat_id, text).await,
            InboundEvent::ButtonCallback {
                chat_id,
                message_id,
                payload,
            } => self.handle_callback(chat_id, message_id, &payload).await,
        }
    }

    /// Boundary degradation after an unexpected handler failure: drop the
    /// possibly inconsistent record and offer a fresh start, best-effort
    pub async fn recover(&self, chat_id: i64) {
        self.conversations.remove(chat_id).await;
        if let Err(e) = self.prompt_platform(chat_id).await {
            error!(chat_id, "Recovery prompt failed: {e:#}");
        }
    }

    /// Liveness report with store entry counts
    ///
    /// # Errors
    ///
    /// Returns an error when the report cannot be sent.
    pub async fn healthcheck(&self, chat_id: i64) -> Result<()> {
        let text = views::healthcheck_message(
            self.conversations.entry_count(),
            self.results.entry_count(),
            self.greeted.entry_count(),
        );
        self.gateway
            .send_text(chat_id, &text, None)
            .await
            .context("healthcheck send failed")?;
        Ok(())
    }

    // ── free text ───────────────────────────────────────────────────────────

    async fn handle_text(&self, chat_id: i64, text: String) -> Result<()> {
        if views::is_main_menu_text(&text) {
            return self.full_reset_and_prompt(chat_id).await;
        }

        let Some(state) = self.conversations.get(chat_id).await else {
            debug!(chat_id, "Text with no conversation record");
            return self.prompt_platform(chat_id).await;
        };

        match state.phase {
            Phase::ChoosingAction => {
                // Button not pressed yet; repeat the pending question.
                self.send_with_keyboard(
                    chat_id,
                    &views::action_prompt(state.platform),
                    views::action_keyboard(),
                )
                .await
            }
            Phase::CollectingTopic => self.store_topic(chat_id, state, text).await,
            Phase::CollectingDescription => self.generate_article(chat_id, state, text).await,
            Phase::AwaitingOriginal => self.store_original(chat_id, state, text).await,
            Phase::AwaitingFeedback => self.rewrite_article(chat_id, state, text).await,
        }
    }

    async fn store_topic(
        &self,
        chat_id: i64,
        mut state: ConversationState,
        text: String,
    ) -> Result<()> {
        state.topic = Some(text);
        state.phase = Phase::CollectingDescription;
        self.conversations.put(chat_id, state).await;
        self.send_plain(chat_id, views::description_prompt()).await?;
        Ok(())
    }

    async fn store_original(
        &self,
        chat_id: i64,
        mut state: ConversationState,
        text: String,
    ) -> Result<()> {
        state.original_text = Some(text);
        state.phase = Phase::AwaitingFeedback;
        self.conversations.put(chat_id, state).await;
        self.send_plain(chat_id, views::feedback_prompt()).await?;
        Ok(())
    }

    async fn generate_article(
        &self,
        chat_id: i64,
        state: ConversationState,
        description: String,
    ) -> Result<()> {
        let Some(topic) = state.topic else {
            warn!(chat_id, "Description arrived without a stored topic");
            return self.state_missing(chat_id).await;
        };

        let progress = self.send_plain(chat_id, views::generating_progress()).await?;
        let outcome = self
            .generator
            .generate(chat_id, state.platform, &topic, &description)
            .await;
        self.retract_prompt(chat_id, progress).await;

        self.resolve_generation(chat_id, outcome, views::generation_failed())
            .await
    }

    async fn rewrite_article(
        &self,
        chat_id: i64,
        state: ConversationState,
        feedback: String,
    ) -> Result<()> {
        let Some(original) = state.original_text else {
            warn!(chat_id, "Feedback arrived without a stored original");
            return self.state_missing(chat_id).await;
        };

        let progress = self.send_plain(chat_id, views::rewriting_progress()).await?;
        let outcome = self
            .generator
            .rewrite(chat_id, state.platform, &original, &feedback)
            .await;
        self.retract_prompt(chat_id, progress).await;

        self.resolve_generation(chat_id, outcome, views::rewrite_failed())
            .await
    }

    /// Common tail of both generation paths: the conversation record is gone
    /// either way; success moves the result into the cache, failure returns
    /// to the platform prompt.
    async fn resolve_generation(
        &self,
        chat_id: i64,
        outcome: Result<ArticleResult, GenerationError>,
        failure_text: &str,
    ) -> Result<()> {
        self.conversations.remove(chat_id).await;

        match outcome {
            Ok(result) => {
                self.results.put(chat_id, result.clone()).await;
                info!(chat_id, "Article resolved");
                self.show_result(chat_id, &result).await
            }
            Err(e) => {
                warn!(chat_id, "Generation failed: {e}");
                self.send_plain(chat_id, failure_text).await?;
                self.prompt_platform(chat_id).await
            }
        }
    }

    // ── callbacks ───────────────────────────────────────────────────────────

    async fn handle_callback(
        &self,
        chat_id: i64,
        message_id: i32,
        payload: &str,
    ) -> Result<()> {
        let Some(parsed) = CallbackPayload::parse(payload) else {
            warn!(chat_id, payload, "Unrecognized callback payload");
            if self.conversations.get(chat_id).await.is_none() {
                return self.prompt_platform(chat_id).await;
            }
            return Ok(());
        };

        self.retract_prompt(chat_id, message_id).await;

        match parsed {
            CallbackPayload::ChoosePlatform(platform) => {
                self.choose_platform(chat_id, platform).await
            }
            CallbackPayload::ChooseAction(intent) => self.choose_action(chat_id, intent).await,
            CallbackPayload::RewriteAgain => self.rewrite_again(chat_id).await,
            CallbackPayload::Publish => self.publish_cached(chat_id).await,
            CallbackPayload::ViewDocument => self.view_document(chat_id).await,
            CallbackPayload::Back => self.back_to_result(chat_id).await,
            CallbackPayload::MainMenu => self.full_reset_and_prompt(chat_id).await,
        }
    }

    async fn choose_platform(&self, chat_id: i64, platform: Platform) -> Result<()> {
        self.conversations
            .put(chat_id, ConversationState::new(platform))
            .await;
        self.send_with_keyboard(
            chat_id,
            &views::action_prompt(platform),
            views::action_keyboard(),
        )
        .await
    }

    async fn choose_action(&self, chat_id: i64, intent: Intent) -> Result<()> {
        let Some(mut state) = self.conversations.get(chat_id).await else {
            return self.state_missing(chat_id).await;
        };

        state.intent = Some(intent);
        let prompt = match intent {
            Intent::Generate => {
                state.phase = Phase::CollectingTopic;
                views::topic_prompt()
            }
            Intent::Rewrite => {
                state.phase = Phase::AwaitingOriginal;
                views::original_prompt()
            }
        };
        self.conversations.put(chat_id, state).await;
        self.send_plain(chat_id, prompt).await?;
        Ok(())
    }

    async fn rewrite_again(&self, chat_id: i64) -> Result<()> {
        let Some(result) = self.results.get(chat_id).await else {
            self.send_plain(chat_id, views::generate_first()).await?;
            return self.prompt_platform(chat_id).await;
        };

        let seed =
            ConversationState::rewrite_seed(result.platform(), result.rewrite_source().to_string());
        self.conversations.put(chat_id, seed).await;
        self.send_plain(chat_id, views::rerewrite_feedback_prompt())
            .await?;
        Ok(())
    }

    async fn publish_cached(&self, chat_id: i64) -> Result<()> {
        let Some(result) = self.results.get(chat_id).await else {
            debug!(chat_id, "Publish requested with nothing cached");
            return self.full_reset_and_prompt(chat_id).await;
        };

        // Publish failures are logged, never dialog-blocking.
        if let Err(e) = self.dispatcher.publish(&result).await {
            error!(chat_id, "Publish failed: {e:#}");
        }

        let confirmation = match result.platform() {
            Platform::ChannelTarget => views::published_to_channel(),
            Platform::ExternalSiteTarget => views::published_to_site(),
        };
        self.send_plain(chat_id, confirmation).await?;
        self.full_reset_and_prompt(chat_id).await
    }

    async fn view_document(&self, chat_id: i64) -> Result<()> {
        match self.results.get(chat_id).await {
            Some(ArticleResult::ExternalDocument { document_id, .. }) => {
                self.send_with_keyboard(
                    chat_id,
                    &views::document_link_message(&document_id),
                    views::back_keyboard(),
                )
                .await
            }
            _ => self.prompt_platform(chat_id).await,
        }
    }

    async fn back_to_result(&self, chat_id: i64) -> Result<()> {
        match self.results.get(chat_id).await {
            Some(result) => self.show_result(chat_id, &result).await,
            None => self.prompt_platform(chat_id).await,
        }
    }

    // ── presentation ────────────────────────────────────────────────────────

    /// Shows a resolved article with its post-result actions
    async fn show_result(&self, chat_id: i64, result: &ArticleResult) -> Result<()> {
        match result {
            ArticleResult::InlineArticle { text, picture_url } => {
                self.show_inline_preview(chat_id, text, picture_url.as_deref())
                    .await
            }
            ArticleResult::ExternalDocument { document_id, .. } => {
                self.send_with_keyboard(
                    chat_id,
                    views::site_result_ready(),
                    views::site_result_keyboard(document_id),
                )
                .await
            }
        }
    }

    /// In-chat preview of a channel article; the action keyboard rides on
    /// the last delivery
    async fn show_inline_preview(
        &self,
        chat_id: i64,
        text: &str,
        picture_url: Option<&str>,
    ) -> Result<()> {
        let keyboard = views::inline_result_keyboard();
        if let Some(url) = picture_url {
            let (caption, remainder) =
                crate::utils::split_caption(text, crate::config::CAPTION_LIMIT);
            match remainder {
                Some(rest) => {
                    self.gateway
                        .send_photo(chat_id, url, &caption, None)
                        .await
                        .context("preview photo send failed")?;
                    self.gateway
                        .send_text(chat_id, &rest, Some(keyboard))
                        .await
                        .context("preview remainder send failed")?;
                }
                None => {
                    self.gateway
                        .send_photo(chat_id, url, &caption, Some(keyboard))
                        .await
                        .context("preview photo send failed")?;
                }
            }
        } else {
            self.gateway
                .send_text(chat_id, text, Some(keyboard))
                .await
                .context("preview text send failed")?;
        }
        Ok(())
    }

    /// Platform prompt, with the full welcome on first contact
    async fn prompt_platform(&self, chat_id: i64) -> Result<()> {
        if !self.greeted.is_greeted(chat_id).await {
            self.send_plain(chat_id, views::welcome_message()).await?;
            self.greeted.mark_greeted(chat_id).await;
        }
        self.send_with_keyboard(chat_id, views::platform_prompt(), views::platform_keyboard())
            .await
    }

    // ── shared plumbing ─────────────────────────────────────────────────────

    async fn full_reset_and_prompt(&self, chat_id: i64) -> Result<()> {
        self.conversations.remove(chat_id).await;
        self.results.remove(chat_id).await;
        self.greeted.forget(chat_id).await;
        info!(chat_id, "Full reset");
        self.prompt_platform(chat_id).await
    }

    /// StateMissing recovery: generic restart note plus a fresh start
    async fn state_missing(&self, chat_id: i64) -> Result<()> {
        self.conversations.remove(chat_id).await;
        self.send_plain(chat_id, views::state_missing()).await?;
        self.prompt_platform(chat_id).await
    }

    /// Best-effort prompt retraction; duplicate callback delivery and
    /// already-deleted messages must never break the transition
    async fn retract_prompt(&self, chat_id: i64, message_id: i32) {
        if let Err(e) = self.gateway.delete_message(chat_id, message_id).await {
            debug!(chat_id, message_id, "Prompt retraction skipped: {e:#}");
        }
    }

    async fn send_plain(&self, chat_id: i64, text: &str) -> Result<i32> {
        self.gateway
            .send_text(chat_id, text, None)
            .await
            .with_context(|| format!("send to chat {chat_id} failed"))
    }

    async fn send_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: crate::gateway::Keyboard,
    ) -> Result<()> {
        self.gateway
            .send_text(chat_id, text, Some(keyboard))
            .await
            .with_context(|| format!("send to chat {chat_id} failed"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockMessagingGateway;
    use crate::generation::MockArticleGenerator;
    use crate::publish::SitePublisher;

    fn controller(
        gateway: MockMessagingGateway,
        generator: MockArticleGenerator,
    ) -> DialogController {
        let generator: Arc<dyn ArticleGenerator> = Arc::new(generator);
        let dispatcher = PublishDispatcher::new(
            Arc::new(MockMessagingGateway::new()),
            SitePublisher::Webhook(generator.clone()),
            -100,
        );
        DialogController::new(
            Arc::new(gateway),
            generator,
            dispatcher,
            ConversationStore::new(),
            ResultCache::new(),
            GreetedSet::new(),
        )
    }

    /// Gateway that accepts any traffic, for tests about state rather than
    /// outbound copy
    fn permissive_gateway() -> MockMessagingGateway {
        let mut gateway = MockMessagingGateway::new();
        gateway.expect_send_text().returning(|_, _, _| Ok(1));
        gateway.expect_send_photo().returning(|_, _, _, _| Ok(1));
        gateway.expect_delete_message().returning(|_, _| Ok(()));
        gateway
    }

    fn callback(chat_id: i64, payload: &str) -> InboundEvent {
        InboundEvent::ButtonCallback {
            chat_id,
            message_id: 10,
            payload: payload.to_string(),
        }
    }

    fn text(chat_id: i64, body: &str) -> InboundEvent {
        InboundEvent::TextMessage {
            chat_id,
            text: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_text_without_state_prompts_platform() {
        let mut gateway = MockMessagingGateway::new();
        gateway
            .expect_send_text()
            .withf(|_, body, _| body == views::welcome_message())
            .times(1)
            .returning(|_, _, _| Ok(1));
        gateway
            .expect_send_text()
            .withf(|_, body, keyboard| body == views::platform_prompt() && keyboard.is_some())
            .times(1)
            .returning(|_, _, _| Ok(2));

        let controller = controller(gateway, MockArticleGenerator::new());
        let result = controller.handle_event(text(1, "hello")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_generate_flow_passes_topic_and_description() {
        let mut generator = MockArticleGenerator::new();
        generator
            .expect_generate()
            .withf(|chat_id, platform, topic, description| {
                *chat_id == 1
                    && *platform == Platform::ChannelTarget
                    && topic == "T"
                    && description == "D"
            })
            .times(1)
            .returning(|_, _, _, _| {
                Ok(ArticleResult::InlineArticle {
                    text: "Статья".to_string(),
                    picture_url: None,
                })
            });

        let controller = controller(permissive_gateway(), generator);
        for event in [
            callback(1, "CH_TG"),
            callback(1, "ACT_GEN"),
            text(1, "T"),
            text(1, "D"),
        ] {
            let handled = controller.handle_event(event).await;
            assert!(handled.is_ok());
        }

        // Record resolved: conversation gone, result cached.
        assert!(controller.conversations.get(1).await.is_none());
        assert!(controller.results.get(1).await.is_some());
    }

    #[tokio::test]
    async fn test_action_without_state_is_state_missing() {
        let mut gateway = MockMessagingGateway::new();
        gateway.expect_delete_message().returning(|_, _| Ok(()));
        gateway
            .expect_send_text()
            .withf(|_, body, _| body == views::state_missing())
            .times(1)
            .returning(|_, _, _| Ok(1));
        gateway.expect_send_text().returning(|_, _, _| Ok(2));

        let controller = controller(gateway, MockArticleGenerator::new());
        let result = controller.handle_event(callback(1, "ACT_GEN")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_rerewrite_seeds_from_document_id() {
        let controller = controller(permissive_gateway(), MockArticleGenerator::new());
        controller
            .results
            .put(
                1,
                ArticleResult::ExternalDocument {
                    document_id: "doc123".to_string(),
                    text: Some("cached text".to_string()),
                    picture_url: None,
                },
            )
            .await;

        let handled = controller.handle_event(callback(1, "REREWRITE")).await;
        assert!(handled.is_ok());

        let state = controller.conversations.get(1).await;
        let state = state.as_ref();
        assert_eq!(state.map(|s| s.phase), Some(Phase::AwaitingFeedback));
        assert_eq!(
            state.and_then(|s| s.original_text.as_deref()),
            Some("doc123")
        );
        assert_eq!(state.map(|s| s.platform), Some(Platform::ExternalSiteTarget));
    }

    #[tokio::test]
    async fn test_rewrite_feedback_reaches_generator() {
        let mut generator = MockArticleGenerator::new();
        generator
            .expect_rewrite()
            .withf(|_, _, original, feedback| original == "Original" && feedback == "make shorter")
            .times(1)
            .returning(|_, _, _, _| {
                Ok(ArticleResult::InlineArticle {
                    text: "Shorter".to_string(),
                    picture_url: None,
                })
            });

        let controller = controller(permissive_gateway(), generator);
        controller
            .conversations
            .put(
                1,
                ConversationState::rewrite_seed(Platform::ChannelTarget, "Original".to_string()),
            )
            .await;

        let handled = controller.handle_event(text(1, "make shorter")).await;
        assert!(handled.is_ok());
    }

    #[tokio::test]
    async fn test_generation_failure_returns_to_platform_prompt() {
        let mut generator = MockArticleGenerator::new();
        generator
            .expect_generate()
            .returning(|_, _, _, _| Err(GenerationError::Transport("timeout".to_string())));

        let mut gateway = MockMessagingGateway::new();
        gateway
            .expect_send_text()
            .withf(|_, body, _| body == views::generation_failed())
            .times(1)
            .returning(|_, _, _| Ok(1));
        gateway.expect_send_text().returning(|_, _, _| Ok(2));
        gateway.expect_delete_message().returning(|_, _| Ok(()));

        let controller = controller(gateway, generator);
        let mut state = ConversationState::new(Platform::ChannelTarget);
        state.topic = Some("T".to_string());
        state.phase = Phase::CollectingDescription;
        controller.conversations.put(1, state).await;

        let handled = controller.handle_event(text(1, "D")).await;
        assert!(handled.is_ok());
        assert!(controller.conversations.get(1).await.is_none());
        assert!(controller.results.get(1).await.is_none());
    }

    #[tokio::test]
    async fn test_retraction_failure_does_not_block_transition() {
        let mut gateway = MockMessagingGateway::new();
        gateway
            .expect_delete_message()
            .returning(|_, _| Err(anyhow::anyhow!("message to delete not found")));
        gateway.expect_send_text().returning(|_, _, _| Ok(1));

        let controller = controller(gateway, MockArticleGenerator::new());
        // The same callback delivered twice; both must land the chat in a
        // consistent state without raising.
        for _ in 0..2 {
            let handled = controller.handle_event(callback(1, "CH_TG")).await;
            assert!(handled.is_ok());
        }
        let state = controller.conversations.get(1).await;
        assert_eq!(state.map(|s| s.phase), Some(Phase::ChoosingAction));
    }

    #[tokio::test]
    async fn test_publish_without_cache_resets_quietly() {
        let mut gateway = MockMessagingGateway::new();
        gateway.expect_delete_message().returning(|_, _| Ok(()));
        // No confirmation allowed, only the welcome + platform prompt.
        gateway
            .expect_send_text()
            .withf(|_, body, _| {
                body != views::published_to_channel() && body != views::published_to_site()
            })
            .returning(|_, _, _| Ok(1));

        let controller = controller(gateway, MockArticleGenerator::new());
        let handled = controller.handle_event(callback(1, "PUBLISH")).await;
        assert!(handled.is_ok());
    }

    #[tokio::test]
    async fn test_main_menu_text_resets_greeting() {
        // The chat was greeted before; a reset must bring the full welcome
        // back, so the greeting send proves the membership was cleared.
        let mut gateway = MockMessagingGateway::new();
        gateway
            .expect_send_text()
            .withf(|_, body, _| body == views::welcome_message())
            .times(1)
            .returning(|_, _, _| Ok(1));
        gateway.expect_send_text().returning(|_, _, _| Ok(2));

        let controller = controller(gateway, MockArticleGenerator::new());
        controller.greeted.mark_greeted(1).await;
        controller
            .conversations
            .put(1, ConversationState::new(Platform::ChannelTarget))
            .await;

        let handled = controller.handle_event(text(1, "главное меню")).await;
        assert!(handled.is_ok());
        assert!(controller.conversations.get(1).await.is_none());
    }
}
