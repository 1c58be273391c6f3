//! In-memory transcript store.

use crate::message::Message;

/// Ordered, append-only list of messages. Insertion order is display order.
///
/// The store does not know about the request lifecycle; the exchange
/// controller decides when `clear` is allowed.
#[derive(Debug, Default, Clone)]
pub struct TranscriptStore {
    messages: Vec<Message>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_append_preserves_order() {
        let mut store = TranscriptStore::new();
        store.append(Message::user("one"));
        store.append(Message::assistant("two"));
        store.append(Message::user("three"));

        let contents: Vec<&str> = store.all().iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(store.last().map(|m| m.role()), Some(Role::User));
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut store = TranscriptStore::new();
        store.append(Message::user("one"));
        store.append(Message::assistant("two"));
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.last().is_none());
    }
}
