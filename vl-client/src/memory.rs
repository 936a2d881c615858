//! Ordered message log for one client session.

use vl_llm::{ChatMessage, Role};

/// Every message exchanged so far, in turn order. Sent in full on each request.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    messages: Vec<ChatMessage>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Adopt a caller-supplied history verbatim, discarding the current log.
    pub fn replace(&mut self, history: Vec<ChatMessage>) {
        self.messages = history;
    }

    /// Insert a system message, but only as the very first entry.
    ///
    /// Returns whether the message was inserted.
    pub fn insert_system_if_empty(&mut self, text: &str) -> bool {
        if !self.messages.is_empty() {
            return false;
        }
        self.messages.push(ChatMessage::system(text));
        true
    }

    pub fn system_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::System)
            .count()
    }
}
