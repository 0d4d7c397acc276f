use std::collections::HashMap;
use std::sync::Mutex;

use log::info;
use uuid::Uuid;

use crate::models::chat::{ ChatMessage, Conversation };

/// In-memory conversation store. The full history of every conversation is
/// retained for the lifetime of the process; prompting only ever reads a
/// trailing window of it. A single mutex serializes access so the map stays
/// consistent under the multi-threaded runtime.
pub struct ConversationStore {
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the conversation id a request should use, creating an empty
    /// conversation when the caller supplied no id (or a blank one). Known
    /// ids always resolve to their existing conversation; unknown ids are
    /// created on demand, never rejected.
    pub fn resolve(&self, id: Option<&str>) -> String {
        let id = match id {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let mut map = self.conversations.lock().unwrap();
        map.entry(id.clone()).or_insert_with(|| Conversation {
            id: id.clone(),
            messages: Vec::new(),
        });
        id
    }

    pub fn append(&self, id: &str, message: ChatMessage) {
        let mut map = self.conversations.lock().unwrap();
        let conversation = map.entry(id.to_string()).or_insert_with(|| Conversation {
            id: id.to_string(),
            messages: Vec::new(),
        });
        conversation.messages.push(message);
    }

    /// Last `n` messages, oldest first. Pure read.
    pub fn window(&self, id: &str, n: usize) -> Vec<ChatMessage> {
        let map = self.conversations.lock().unwrap();
        match map.get(id) {
            Some(conversation) => {
                let start = conversation.messages.len().saturating_sub(n);
                conversation.messages[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Full unwindowed history, for the history endpoint.
    pub fn history(&self, id: &str) -> Vec<ChatMessage> {
        let map = self.conversations.lock().unwrap();
        map.get(id).map(|c| c.messages.clone()).unwrap_or_default()
    }

    pub fn len(&self, id: &str) -> usize {
        let map = self.conversations.lock().unwrap();
        map.get(id).map(|c| c.messages.len()).unwrap_or(0)
    }

    /// Removes the conversation entirely. Unknown ids are a no-op.
    pub fn clear(&self, id: &str) {
        let mut map = self.conversations.lock().unwrap();
        if map.remove(id).is_some() {
            info!("Cleared conversation: {}", id);
        }
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
