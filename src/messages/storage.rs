use super::types::{Attachment, Message};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Ordered, process-lifetime log of the conversation.
///
/// Messages are only ever appended or resolved in place; nothing is deleted
/// individually and nothing is persisted.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A log seeded with the startup report shown before any user input
    pub fn with_welcome(text: impl Into<String>) -> Self {
        let log = Self::new();
        log.messages.write().push(Message::bot(text));
        log
    }

    /// Append a finalized user message and return its id
    pub fn push_user(&self, text: impl Into<String>, attachments: Vec<Attachment>) -> Uuid {
        let message = Message::user(text, attachments);
        let id = message.id;
        self.messages.write().push(message);
        id
    }

    /// Append a thinking placeholder for a pending bot turn and return its id
    pub fn begin_bot_turn(&self) -> Uuid {
        let message = Message::thinking();
        let id = message.id;
        self.messages.write().push(message);
        id
    }

    /// Resolve a pending placeholder in place with the generated text.
    /// Returns false if no message with that id exists.
    pub fn resolve(&self, id: Uuid, text: impl Into<String>) -> bool {
        let mut messages = self.messages.write();
        match messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.text = text.into();
                message.is_thinking = false;
                true
            }
            None => false,
        }
    }

    /// Resolve a pending placeholder with an error report. Same mutation as
    /// `resolve`; kept separate so call sites read as what they are.
    pub fn fail(&self, id: Uuid, report: impl Into<String>) -> bool {
        self.resolve(id, report)
    }

    pub fn get(&self, id: Uuid) -> Option<Message> {
        self.messages.read().iter().find(|m| m.id == id).cloned()
    }

    pub fn get_all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    pub fn clear(&self) {
        self.messages.write().clear();
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sender;

    #[test]
    fn test_push_and_order() {
        let log = ConversationLog::new();
        log.push_user("first", Vec::new());
        log.push_user("second", Vec::new());

        let all = log.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].text, "first");
        assert_eq!(all[1].text, "second");
    }

    #[test]
    fn test_placeholder_lifecycle() {
        let log = ConversationLog::new();
        let id = log.begin_bot_turn();

        let pending = log.get(id).unwrap();
        assert!(pending.is_thinking);
        assert!(pending.text.is_empty());

        assert!(log.resolve(id, "## 1. Interpretação Normativa\nok"));

        let resolved = log.get(id).unwrap();
        assert!(!resolved.is_thinking);
        assert_eq!(resolved.sender, Sender::Bot);
        assert!(resolved.text.contains("ok"));
        // Still a single log entry, mutated in place
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_id() {
        let log = ConversationLog::new();
        assert!(!log.resolve(Uuid::new_v4(), "text"));
    }

    #[test]
    fn test_welcome_seed() {
        let log = ConversationLog::with_welcome("Sistema online.");
        assert_eq!(log.len(), 1);
        let first = &log.get_all()[0];
        assert_eq!(first.sender, Sender::Bot);
        assert!(!first.is_thinking);
    }
}
