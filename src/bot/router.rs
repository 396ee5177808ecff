//! Actor-per-chat event routing
//!
//! Events for the same chat must be applied one at a time, in arrival order:
//! the controller's read-modify-write on a conversation record is not atomic.
//! Each chat gets its own worker task fed by an unbounded channel; distinct
//! chats proceed fully in parallel. Idle workers reap themselves after
//! [`crate::config::CHAT_WORKER_IDLE_SECS`] without traffic.

use crate::bot::controller::DialogController;
use crate::bot::event::InboundEvent;
use crate::config::CHAT_WORKER_IDLE_SECS;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Routes inbound events to per-chat worker tasks
pub struct ChatRouter {
    controller: Arc<DialogController>,
    workers: Arc<Mutex<HashMap<i64, UnboundedSender<InboundEvent>>>>,
    idle_timeout: Duration,
}

impl ChatRouter {
    /// Router feeding `controller`, reaping workers after the configured
    /// idle period
    #[must_use]
    pub fn new(controller: Arc<DialogController>) -> Self {
        Self::with_idle_timeout(controller, Duration::from_secs(CHAT_WORKER_IDLE_SECS))
    }

    /// Router with an explicit idle timeout
    #[must_use]
    pub fn with_idle_timeout(controller: Arc<DialogController>, idle_timeout: Duration) -> Self {
        Self {
            controller,
            workers: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Hands an event to the chat's worker, spawning one if needed
    ///
    /// Never blocks on the handling itself; FIFO order per chat is
    /// guaranteed by the single consumer.
    pub async fn dispatch(&self, event: InboundEvent) {
        let chat_id = event.chat_id();
        let mut workers = self.workers.lock().await;

        let event = if let Some(sender) = workers.get(&chat_id).cloned() {
            match sender.send(event) {
                Ok(()) => return,
                // Worker exited between reap and send; respawn below.
                Err(mpsc::error::SendError(returned)) => {
                    workers.remove(&chat_id);
                    returned
                }
            }
        } else {
            event
        };

        self.spawn_worker(&mut workers, chat_id, event);
    }

    fn spawn_worker(
        &self,
        workers: &mut HashMap<i64, UnboundedSender<InboundEvent>>,
        chat_id: i64,
        first_event: InboundEvent,
    ) {
        let (sender, receiver) = mpsc::unbounded_channel();
        if sender.send(first_event).is_err() {
            // Unreachable with the receiver alive, but never panic here.
            error!(chat_id, "Failed to seed chat worker");
            return;
        }
        workers.insert(chat_id, sender);

        let controller = self.controller.clone();
        let registry = self.workers.clone();
        let idle_timeout = self.idle_timeout;
        tokio::spawn(async move {
            worker_loop(chat_id, receiver, controller, registry, idle_timeout).await;
        });
        debug!(chat_id, "Chat worker spawned");
    }

    /// Number of live chat workers, for observability
    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }
}

async fn worker_loop(
    chat_id: i64,
    mut receiver: UnboundedReceiver<InboundEvent>,
    controller: Arc<DialogController>,
    registry: Arc<Mutex<HashMap<i64, UnboundedSender<InboundEvent>>>>,
    idle_timeout: Duration,
) {
    loop {
        match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(event)) => {
                // Handler boundary: anything unexpected degrades to the
                // platform prompt instead of killing the worker.
                if let Err(e) = controller.handle_event(event).await {
                    error!(chat_id, "Event handling failed: {e:#}");
                    controller.recover(chat_id).await;
                }
            }
            Ok(None) => break,
            Err(_elapsed) => {
                // Reap only while holding the registry lock: dispatch also
                // sends under it, so no event can slip in between the drain
                // check and the removal.
                let mut workers = registry.lock().await;
                if receiver.is_empty() {
                    workers.remove(&chat_id);
                    debug!(chat_id, "Idle chat worker reaped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::{Phase, Platform};
    use crate::bot::store::{ConversationStore, GreetedSet, ResultCache};
    use crate::gateway::MockMessagingGateway;
    use crate::generation::{ArticleGenerator, MockArticleGenerator};
    use crate::publish::{PublishDispatcher, SitePublisher};

    fn router_over_stores() -> (ChatRouter, ConversationStore) {
        router_over_stores_with(Duration::from_secs(CHAT_WORKER_IDLE_SECS))
    }

    fn router_over_stores_with(idle_timeout: Duration) -> (ChatRouter, ConversationStore) {
        let mut gateway = MockMessagingGateway::new();
        gateway.expect_send_text().returning(|_, _, _| Ok(1));
        gateway.expect_send_photo().returning(|_, _, _, _| Ok(1));
        gateway.expect_delete_message().returning(|_, _| Ok(()));

        let generator: Arc<dyn ArticleGenerator> = Arc::new(MockArticleGenerator::new());
        let dispatcher = PublishDispatcher::new(
            Arc::new(MockMessagingGateway::new()),
            SitePublisher::Webhook(generator.clone()),
            -100,
        );
        let conversations = ConversationStore::new();
        let controller = DialogController::new(
            Arc::new(gateway),
            generator,
            dispatcher,
            conversations.clone(),
            ResultCache::new(),
            GreetedSet::new(),
        );
        (
            ChatRouter::with_idle_timeout(Arc::new(controller), idle_timeout),
            conversations,
        )
    }

    fn callback(chat_id: i64, payload: &str) -> InboundEvent {
        InboundEvent::ButtonCallback {
            chat_id,
            message_id: 1,
            payload: payload.to_string(),
        }
    }

    // Workers process asynchronously; give them a moment.
    async fn drain() {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn test_events_for_one_chat_apply_in_order() {
        let (router, conversations) = router_over_stores();

        router.dispatch(callback(1, "CH_TG")).await;
        router.dispatch(callback(1, "ACT_GEN")).await;
        router
            .dispatch(InboundEvent::TextMessage {
                chat_id: 1,
                text: "topic".to_string(),
            })
            .await;
        drain().await;

        let state = conversations.get(1).await;
        assert_eq!(state.as_ref().map(|s| s.phase), Some(Phase::CollectingDescription));
        assert_eq!(
            state.and_then(|s| s.topic),
            Some("topic".to_string())
        );
    }

    #[tokio::test]
    async fn test_distinct_chats_get_distinct_workers() {
        let (router, conversations) = router_over_stores();

        router.dispatch(callback(1, "CH_TG")).await;
        router.dispatch(callback(2, "CH_SITE")).await;
        drain().await;

        assert_eq!(router.worker_count().await, 2);
        assert_eq!(
            conversations.get(1).await.map(|s| s.platform),
            Some(Platform::ChannelTarget)
        );
        assert_eq!(
            conversations.get(2).await.map(|s| s.platform),
            Some(Platform::ExternalSiteTarget)
        );
    }

    #[tokio::test]
    async fn test_idle_worker_is_reaped_and_respawned() {
        let (router, conversations) = router_over_stores_with(Duration::from_millis(500));

        router.dispatch(callback(1, "CH_SITE")).await;
        drain().await;
        assert_eq!(router.worker_count().await, 1);

        // Past the idle period the worker reaps itself; the conversation
        // record outlives it in the store.
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(router.worker_count().await, 0);

        // The next event respawns a worker that picks the dialog up where
        // the store left it.
        router.dispatch(callback(1, "ACT_REWRITE")).await;
        drain().await;
        assert_eq!(router.worker_count().await, 1);
        let state = conversations.get(1).await;
        assert_eq!(state.map(|s| s.phase), Some(Phase::AwaitingOriginal));
    }

    #[tokio::test]
    async fn test_worker_survives_handler_boundary_failures() {
        let (router, conversations) = router_over_stores();

        // Unknown payloads with a live record are ignored at the controller;
        // the worker keeps consuming afterwards.
        router.dispatch(callback(1, "CH_TG")).await;
        router.dispatch(callback(1, "GARBAGE")).await;
        router.dispatch(callback(1, "ACT_REWRITE")).await;
        drain().await;

        let state = conversations.get(1).await;
        assert_eq!(state.map(|s| s.phase), Some(Phase::AwaitingOriginal));
    }
}
