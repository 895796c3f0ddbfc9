//! Server-sent event channel abstraction

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Raw events delivered by a server-push channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Connection established
    Open,
    /// A message with its `data` field
    Message { data: String },
    /// Transport-level failure; the channel is unusable afterwards
    Error { message: String },
}

/// An open server-push connection.
///
/// `close` releases the underlying connection. Callers own the
/// single-close guarantee; implementations may assume it is called once.
#[async_trait]
pub trait EventChannel: Send {
    /// Wait for the next event. `None` means the server ended the stream.
    async fn next_event(&mut self) -> Option<SseEvent>;

    /// Release the connection
    fn close(&mut self);
}

/// A boxed event channel
pub type BoxedEventChannel = Box<dyn EventChannel>;

/// One decoded stream payload: `{"delta"?, "sources"?, "done"?}`.
///
/// Fields are kept as raw JSON so a badly typed field is ignored on its
/// own instead of failing the whole payload.
#[derive(Debug, Default, Deserialize)]
pub struct StreamPayload {
    #[serde(default)]
    pub delta: Value,
    #[serde(default)]
    pub sources: Value,
    #[serde(default)]
    pub done: Value,
}

impl StreamPayload {
    /// Parse event data. Valid JSON that is not an object yields an empty payload.
    pub fn parse(data: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(data)?;
        if value.is_object() {
            serde_json::from_value(value)
        } else {
            Ok(Self::default())
        }
    }

    /// The text fragment, if `delta` is a string
    pub fn delta(&self) -> Option<&str> {
        self.delta.as_str()
    }

    /// The sources array, if present and non-empty
    pub fn sources(&self) -> Option<&Value> {
        match &self.sources {
            Value::Array(items) if !items.is_empty() => Some(&self.sources),
            _ => None,
        }
    }

    /// Whether `done` is truthy
    pub fn is_done(&self) -> bool {
        is_truthy(&self.done)
    }
}

/// JavaScript-style truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_delta() {
        let p = StreamPayload::parse(r#"{"delta":"Hel"}"#).unwrap();
        assert_eq!(p.delta(), Some("Hel"));
        assert!(p.sources().is_none());
        assert!(!p.is_done());
    }

    #[test]
    fn test_parse_ignores_badly_typed_fields() {
        let p = StreamPayload::parse(r#"{"delta":5,"sources":"x","done":true,"extra":1}"#).unwrap();
        assert_eq!(p.delta(), None);
        assert!(p.sources().is_none());
        assert!(p.is_done());
    }

    #[test]
    fn test_parse_empty_sources_is_none() {
        let p = StreamPayload::parse(r#"{"sources":[]}"#).unwrap();
        assert!(p.sources().is_none());
    }

    #[test]
    fn test_parse_non_object_is_empty() {
        let p = StreamPayload::parse("42").unwrap();
        assert_eq!(p.delta(), None);
        assert!(!p.is_done());
        let p = StreamPayload::parse("null").unwrap();
        assert!(!p.is_done());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(StreamPayload::parse("{not json").is_err());
        assert!(StreamPayload::parse("").is_err());
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }
}
