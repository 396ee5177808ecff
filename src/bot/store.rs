//! In-memory per-chat stores
//!
//! Three keyed stores back the dialog: conversation records, last produced
//! articles, and the greeted-chat set. All of them are volatile; entries are
//! removed explicitly on reset/resolve, with TTLs only bounding memory for
//! chats that went silent. Distinct keys never contend on a shared lock.

use crate::bot::state::{ArticleResult, ConversationState};
use crate::config::{
    CONVERSATION_MAX_CAPACITY, CONVERSATION_TTL_SECS, GREETED_MAX_CAPACITY, GREETED_TTL_SECS,
    RESULT_CACHE_MAX_CAPACITY, RESULT_CACHE_TTL_SECS,
};
use moka::future::Cache;
use std::time::Duration;

/// Per-chat dialog records
///
/// Read-modify-write on a record is safe only because the router serializes
/// events per chat; the store itself guards nothing beyond the map.
#[derive(Clone)]
pub struct ConversationStore {
    cache: Cache<i64, ConversationState>,
}

impl ConversationStore {
    /// Creates the store with its configured TTL and capacity
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(CONVERSATION_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(CONVERSATION_TTL_SECS))
            .build();
        Self { cache }
    }

    /// Current record for a chat, if the dialog is mid-flight
    pub async fn get(&self, chat_id: i64) -> Option<ConversationState> {
        self.cache.get(&chat_id).await
    }

    /// Stores (or replaces) the chat's record
    pub async fn put(&self, chat_id: i64, state: ConversationState) {
        self.cache.insert(chat_id, state).await;
    }

    /// Drops the chat's record; absent keys are a no-op
    pub async fn remove(&self, chat_id: i64) {
        self.cache.invalidate(&chat_id).await;
    }

    /// Number of live records, for the healthcheck
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Last produced article per chat
///
/// Overwritten on every generate/rewrite; consulted by rewrite-again and
/// publish events that arrive after the conversation record is gone.
#[derive(Clone)]
pub struct ResultCache {
    cache: Cache<i64, ArticleResult>,
}

impl ResultCache {
    /// Creates the cache with its configured TTL and capacity
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(RESULT_CACHE_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(RESULT_CACHE_TTL_SECS))
            .build();
        Self { cache }
    }

    /// Cached article for a chat
    pub async fn get(&self, chat_id: i64) -> Option<ArticleResult> {
        self.cache.get(&chat_id).await
    }

    /// Replaces the chat's cached article
    pub async fn put(&self, chat_id: i64, result: ArticleResult) {
        self.cache.insert(chat_id, result).await;
    }

    /// Drops the chat's cached article
    pub async fn remove(&self, chat_id: i64) {
        self.cache.invalidate(&chat_id).await;
    }

    /// Number of cached articles, for the healthcheck
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Chats that already received the full welcome
#[derive(Clone)]
pub struct GreetedSet {
    cache: Cache<i64, ()>,
}

impl GreetedSet {
    /// Creates the set with its configured TTL and capacity
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(GREETED_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(GREETED_TTL_SECS))
            .build();
        Self { cache }
    }

    /// Whether the chat has been welcomed since its last reset
    pub async fn is_greeted(&self, chat_id: i64) -> bool {
        self.cache.get(&chat_id).await.is_some()
    }

    /// Marks the chat as welcomed
    pub async fn mark_greeted(&self, chat_id: i64) {
        self.cache.insert(chat_id, ()).await;
    }

    /// Removes the chat on full reset, so the next contact is greeted again
    pub async fn forget(&self, chat_id: i64) {
        self.cache.invalidate(&chat_id).await;
    }

    /// Number of greeted chats, for the healthcheck
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for GreetedSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::{Phase, Platform};

    #[tokio::test]
    async fn test_conversation_roundtrip() {
        let store = ConversationStore::new();
        assert!(store.get(1).await.is_none());

        store.put(1, ConversationState::new(Platform::ChannelTarget)).await;
        let state = store.get(1).await;
        assert_eq!(state.map(|s| s.phase), Some(Phase::ChoosingAction));

        store.remove(1).await;
        assert!(store.get(1).await.is_none());
    }

    #[tokio::test]
    async fn test_conversation_remove_absent_is_noop() {
        let store = ConversationStore::new();
        store.remove(999).await;
        store.remove(999).await;
        assert!(store.get(999).await.is_none());
    }

    #[tokio::test]
    async fn test_result_cache_overwrites() {
        let cache = ResultCache::new();
        cache
            .put(
                5,
                ArticleResult::InlineArticle {
                    text: "first".to_string(),
                    picture_url: None,
                },
            )
            .await;
        cache
            .put(
                5,
                ArticleResult::InlineArticle {
                    text: "second".to_string(),
                    picture_url: None,
                },
            )
            .await;

        let cached = cache.get(5).await;
        assert_eq!(cached.as_ref().map(ArticleResult::rewrite_source), Some("second"));
    }

    #[tokio::test]
    async fn test_greeted_membership() {
        let set = GreetedSet::new();
        assert!(!set.is_greeted(7).await);

        set.mark_greeted(7).await;
        assert!(set.is_greeted(7).await);

        set.forget(7).await;
        assert!(!set.is_greeted(7).await);
    }

    #[tokio::test]
    async fn test_entry_count_tracks_inserts() {
        let store = ConversationStore::new();
        store.put(1, ConversationState::new(Platform::ChannelTarget)).await;
        store.put(2, ConversationState::new(Platform::ExternalSiteTarget)).await;

        // Manually run pending tasks to update the entry count
        store.cache.run_pending_tasks().await;
        assert_eq!(store.entry_count(), 2);
    }
}
