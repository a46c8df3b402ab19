//! Keyed conversation store.
//!
//! Conversations are created on first reference and live for the process
//! lifetime. Each conversation's state sits behind its own async mutex:
//! requests for different conversations never contend, while requests for
//! the same conversation serialize for their whole turn. The turn log is
//! append-only, and an exchange appends both turns under one lock
//! acquisition, so a cancelled request records nothing.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use scriven_core::{EntityMapping, Turn};

#[derive(Debug, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
    pub entities: EntityMapping,
}

impl ConversationState {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Atomic append of one user/assistant exchange.
    pub fn append_exchange(&mut self, user: Turn, assistant: Turn) {
        self.turns.push(user);
        self.turns.push(assistant);
    }
}

#[derive(Default)]
pub struct ConversationStore {
    inner: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to one conversation's state, created on first reference.
    pub async fn entry(&self, conversation_id: &str) -> Arc<Mutex<ConversationState>> {
        if let Some(state) = self.inner.read().await.get(conversation_id) {
            return Arc::clone(state);
        }

        let mut conversations = self.inner.write().await;
        Arc::clone(conversations.entry(conversation_id.to_string()).or_default())
    }

    pub async fn history(&self, conversation_id: &str) -> Vec<Turn> {
        match self.inner.read().await.get(conversation_id) {
            Some(state) => state.lock().await.turns().to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn conversation_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scriven_core::Turn;

    use super::ConversationStore;

    #[tokio::test]
    async fn history_of_unknown_conversation_is_empty() {
        let store = ConversationStore::new();
        assert!(store.history("conv-missing").await.is_empty());
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn exchanges_append_in_call_order() {
        let store = ConversationStore::new();
        let entry = store.entry("conv-1").await;

        for index in 0..3 {
            let mut state = entry.lock().await;
            state.append_exchange(
                Turn::user(format!("question {index}")),
                Turn::assistant(format!("answer {index}"), Vec::new()),
            );
        }

        let history = store.history("conv-1").await;
        assert_eq!(history.len(), 6);
        assert_eq!(history[0].content, "question 0");
        assert_eq!(history[5].content, "answer 2");
    }

    #[tokio::test]
    async fn concurrent_exchanges_on_one_conversation_serialize() {
        let store = Arc::new(ConversationStore::new());

        let mut tasks = Vec::new();
        for index in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let entry = store.entry("conv-shared").await;
                let mut state = entry.lock().await;
                let user = Turn::user(format!("question {index}"));
                tokio::task::yield_now().await;
                state.append_exchange(user, Turn::assistant(format!("answer {index}"), Vec::new()));
            }));
        }
        for task in tasks {
            task.await.expect("task should complete");
        }

        let history = store.history("conv-shared").await;
        assert_eq!(history.len(), 16);
        // Exchanges interleave across tasks but never split: user and
        // assistant turns alternate pairwise.
        for pair in history.chunks(2) {
            assert_eq!(pair[0].content.replace("question", "answer"), pair[1].content);
        }
    }

    #[tokio::test]
    async fn different_conversations_do_not_share_state() {
        let store = ConversationStore::new();

        let first = store.entry("conv-a").await;
        first.lock().await.append_exchange(Turn::user("hi"), Turn::assistant("hello", Vec::new()));

        assert_eq!(store.history("conv-a").await.len(), 2);
        assert!(store.history("conv-b").await.is_empty());
    }
}
