//! Conversation log: ordered messages, persistence and render notifications.

use ragline_client::{Message, Role, Sanitizer, Source};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{events::ChatEvent, storage::SharedStorage};

/// Storage key of the conversation log
pub const HISTORY_KEY: &str = "rag-ui-history";

/// The conversation log.
///
/// Every mutation re-renders (emits [`ChatEvent::Updated`]) and re-persists.
/// The in-memory log is the single source of truth for both.
pub struct Conversation {
    messages: Vec<Message>,
    storage: SharedStorage,
    sanitizer: Sanitizer,
    events: broadcast::Sender<ChatEvent>,
}

impl Conversation {
    /// Create an empty conversation without reading storage
    pub fn new(
        storage: SharedStorage,
        sanitizer: Sanitizer,
        events: broadcast::Sender<ChatEvent>,
    ) -> Self {
        Self {
            messages: Vec::new(),
            storage,
            sanitizer,
            events,
        }
    }

    /// Create a conversation initialized from storage.
    ///
    /// Any read or parse failure leaves the log empty.
    pub fn load(
        storage: SharedStorage,
        sanitizer: Sanitizer,
        events: broadcast::Sender<ChatEvent>,
    ) -> Self {
        let mut conversation = Self::new(storage, sanitizer, events);
        conversation.messages = conversation.read_persisted();
        conversation
    }

    fn read_persisted(&self) -> Vec<Message> {
        let stored = match self.storage.get(HISTORY_KEY) {
            Ok(Some(stored)) if !stored.is_empty() => stored,
            Ok(_) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load history: {}", e);
                return Vec::new();
            }
        };

        let parsed: Value = match serde_json::from_str(&stored) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to load history: {}", e);
                return Vec::new();
            }
        };

        let Some(records) = parsed.as_array() else {
            tracing::warn!("Failed to load history: stored value is not an array");
            return Vec::new();
        };

        records
            .iter()
            .filter_map(|record| self.coerce_record(record))
            .collect()
    }

    /// Loaded records get the same treatment as network data.
    fn coerce_record(&self, record: &Value) -> Option<Message> {
        let obj = record.as_object()?;
        Some(Message {
            role: Role::coerce(obj.get("role").and_then(Value::as_str)),
            content: obj
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            sources: self
                .sanitizer
                .sources(obj.get("sources").unwrap_or(&Value::Null)),
        })
    }

    /// Append a message and return its index in the log
    pub fn append(&mut self, role: Role, content: impl Into<String>, sources: Vec<Source>) -> usize {
        let sources = sources
            .into_iter()
            .map(|source| self.sanitizer.source(source))
            .collect();
        self.messages.push(Message {
            role,
            content: content.into(),
            sources,
        });
        self.sync();
        self.messages.len() - 1
    }

    /// Mutable access to a message already in the log. Call [`Conversation::sync`] afterwards.
    pub fn message_mut(&mut self, index: usize) -> Option<&mut Message> {
        self.messages.get_mut(index)
    }

    /// Re-render and re-persist after in-place mutation
    pub fn sync(&mut self) {
        let _ = self.events.send(ChatEvent::Updated {
            messages: self.messages.clone(),
        });
        self.save();
    }

    /// Remove every message
    pub fn clear(&mut self) {
        self.messages.clear();
        self.sync();
    }

    /// Persist the log. Failures are logged and otherwise ignored.
    pub fn save(&self) {
        let payload: Vec<Message> = self
            .messages
            .iter()
            .map(|msg| Message {
                role: msg.role,
                content: msg.content.clone(),
                sources: msg
                    .sources
                    .iter()
                    .cloned()
                    .map(|source| self.sanitizer.source(source))
                    .collect(),
            })
            .collect();

        let result = serde_json::to_string(&payload)
            .map_err(crate::Error::from)
            .and_then(|json| self.storage.set(HISTORY_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to save history: {}", e);
        }
    }

    /// All messages in display order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The sanitizer applied to incoming data
    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Storage};
    use std::sync::Arc;

    fn setup(storage: Arc<MemoryStorage>) -> (Conversation, broadcast::Receiver<ChatEvent>) {
        let (tx, rx) = broadcast::channel(64);
        let conversation = Conversation::load(storage, Sanitizer::from_origin("https://app.test"), tx);
        (conversation, rx)
    }

    fn stored(storage: &MemoryStorage) -> Value {
        serde_json::from_str(&storage.get(HISTORY_KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_append_preserves_order() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut conv, _rx) = setup(storage);

        for i in 0..5 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            let index = conv.append(role, format!("m{}", i), vec![]);
            assert_eq!(index, i);
        }

        let contents: Vec<&str> = conv.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
        assert_eq!(conv.last().map(|m| m.content.as_str()), Some("m4"));
    }

    #[test]
    fn test_append_renders_and_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut conv, mut rx) = setup(storage.clone());

        conv.append(Role::User, "hello", vec![]);

        match rx.try_recv() {
            Ok(ChatEvent::Updated { messages }) => assert_eq!(messages, vec![Message::user("hello")]),
            other => panic!("expected Updated, got {:?}", other),
        }
        assert_eq!(
            stored(&storage),
            serde_json::json!([{"role": "user", "content": "hello", "sources": []}])
        );
    }

    #[test]
    fn test_append_sanitizes_sources() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut conv, _rx) = setup(storage);

        conv.append(
            Role::Assistant,
            "a",
            vec![
                Source::new("bad", "javascript:alert(1)"),
                Source::new("good", "https://s.test"),
            ],
        );
        let sources = &conv.messages()[0].sources;
        assert_eq!(sources[0], Source::new("bad", ""));
        assert_eq!(sources[1], Source::new("good", "https://s.test"));
    }

    #[test]
    fn test_append_persists_resolved_urls() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut conv, _rx) = setup(storage.clone());

        conv.append(
            Role::Assistant,
            "x",
            vec![
                Source::new("a", "/docs/1"),
                Source::new("b", "ht\ttps://x.test/p"),
            ],
        );

        assert_eq!(
            stored(&storage),
            serde_json::json!([{
                "role": "assistant",
                "content": "x",
                "sources": [
                    {"title": "a", "url": "https://app.test/docs/1"},
                    {"title": "b", "url": "https://x.test/p"}
                ]
            }])
        );
    }

    #[test]
    fn test_mutate_in_place_and_sync() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut conv, _rx) = setup(storage.clone());

        let index = conv.append(Role::Assistant, "", vec![]);
        conv.message_mut(index).unwrap().content.push_str("partial");
        conv.sync();

        assert_eq!(conv.len(), 1);
        assert_eq!(stored(&storage)[0]["content"], "partial");
    }

    #[test]
    fn test_clear_persists_empty_log() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut conv, _rx) = setup(storage.clone());
        conv.append(Role::User, "x", vec![]);

        conv.clear();

        assert!(conv.is_empty());
        assert_eq!(stored(&storage), serde_json::json!([]));
    }

    #[test]
    fn test_load_round_trip() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let (mut conv, _rx) = setup(storage.clone());
            conv.append(Role::User, "q", vec![]);
            conv.append(Role::Assistant, "a", vec![Source::new("S", "https://s.test")]);
        }

        let (conv, _rx) = setup(storage);
        assert_eq!(
            conv.messages(),
            &[
                Message::user("q"),
                Message::assistant("a", vec![Source::new("S", "https://s.test")]),
            ]
        );
    }

    #[test]
    fn test_load_coerces_invalid_fields() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_raw(HISTORY_KEY, r#"[{"role":"bogus","content":123}]"#);

        let (conv, _rx) = setup(storage);
        assert_eq!(conv.messages(), &[Message::assistant("", vec![])]);
    }

    #[test]
    fn test_load_drops_non_object_records() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_raw(
            HISTORY_KEY,
            r#"[null, "x", 3, {"role":"user","content":"kept","sources":[{"url":"javascript:x"}, 1]}]"#,
        );

        let (conv, _rx) = setup(storage);
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages()[0].content, "kept");
        assert_eq!(conv.messages()[0].sources, vec![Source::new("", "")]);
    }

    #[test]
    fn test_load_malformed_falls_back_to_empty() {
        for raw in ["{not json", r#"{"role":"user"}"#, "42", ""] {
            let storage = Arc::new(MemoryStorage::new());
            storage.insert_raw(HISTORY_KEY, raw);
            let (conv, _rx) = setup(storage);
            assert!(conv.is_empty(), "expected empty log for {:?}", raw);
        }
    }

    #[test]
    fn test_save_failure_does_not_affect_memory() {
        let storage = Arc::new(MemoryStorage::with_quota(HISTORY_KEY.len() + 2));
        let (mut conv, _rx) = setup(storage.clone());

        conv.append(Role::User, "this will not fit", vec![]);

        assert_eq!(conv.len(), 1);
        assert_eq!(storage.get(HISTORY_KEY).unwrap(), None);
    }
}
