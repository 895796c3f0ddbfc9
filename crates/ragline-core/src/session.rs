//! Streaming session: one open event channel feeding one assistant message.
//!
//! ```text
//! Connecting --first event--> Open --done / error / cancel--> Closed
//!     \________________________ error / cancel _______________/
//! ```
//!
//! `Closed` is terminal. Closing releases the channel exactly once no
//! matter how many exit paths race to it.

use ragline_client::{BoxedEventChannel, Sanitizer, SseEvent, Source, StreamPayload};

use crate::conversation::Conversation;

/// Placeholder content for a stream that failed before producing text
pub const STREAM_ERROR_MESSAGE: &str = "An error occurred while receiving the stream.";

/// Content for a request the user cancelled before any answer arrived
pub const CANCELLED_MESSAGE: &str = "Request cancelled.";

/// Connection lifecycle of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// A decoded stream event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Text to append to the target message
    Delta(String),
    /// Sanitized sources replacing the target's sources
    Sources(Vec<Source>),
    /// The server finished the answer
    Done,
    /// The channel failed
    TransportError(String),
}

/// How a session reached `Closed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Completed,
    Failed(String),
    Cancelled,
}

/// Decode one event's `data` into session events.
///
/// Order is delta, sources, done. Fields with the wrong type are skipped.
pub fn decode_payload(data: &str, sanitizer: &Sanitizer) -> serde_json::Result<Vec<SessionEvent>> {
    let payload = StreamPayload::parse(data)?;
    let mut events = Vec::new();

    if let Some(delta) = payload.delta() {
        events.push(SessionEvent::Delta(delta.to_string()));
    }
    if let Some(raw) = payload.sources() {
        events.push(SessionEvent::Sources(sanitizer.sources(raw)));
    }
    if payload.is_done() {
        events.push(SessionEvent::Done);
    }

    Ok(events)
}

/// An in-flight streaming exchange
pub struct StreamSession {
    target: usize,
    state: ConnectionState,
    channel: Option<BoxedEventChannel>,
    end: Option<SessionEnd>,
}

impl StreamSession {
    /// Start a session on an opened channel
    pub fn new(target: usize, channel: BoxedEventChannel) -> Self {
        Self {
            target,
            state: ConnectionState::Connecting,
            channel: Some(channel),
            end: None,
        }
    }

    /// A session whose channel could not be opened. It only accepts failure.
    pub fn detached(target: usize) -> Self {
        Self {
            target,
            state: ConnectionState::Connecting,
            channel: None,
            end: None,
        }
    }

    /// Index of the message this session writes into
    pub fn target(&self) -> usize {
        self.target
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the session reached its terminal state
    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// How the session ended, once closed
    pub fn end(&self) -> Option<&SessionEnd> {
        self.end.as_ref()
    }

    /// Wait for the next raw event. A closed or detached session yields `None`.
    pub async fn next_event(&mut self) -> Option<SseEvent> {
        match self.channel.as_mut() {
            Some(channel) => channel.next_event().await,
            None => None,
        }
    }

    /// Record that the connection delivered something
    pub fn mark_open(&mut self) {
        if self.state == ConnectionState::Connecting {
            tracing::debug!("Stream session open");
            self.state = ConnectionState::Open;
        }
    }

    /// Apply decoded events to the target message.
    ///
    /// Deltas and sources are applied together and synced once; `Done` or
    /// `TransportError` then close the session. Events for a closed session
    /// are ignored.
    pub fn ingest(&mut self, conversation: &mut Conversation, events: Vec<SessionEvent>) {
        if self.is_closed() {
            return;
        }

        let mut done = false;
        let mut failure = None;
        let mut changed = false;

        if let Some(message) = conversation.message_mut(self.target) {
            for event in events {
                match event {
                    SessionEvent::Delta(text) => {
                        message.content.push_str(&text);
                        changed = true;
                    }
                    SessionEvent::Sources(sources) => {
                        message.sources = sources;
                        changed = true;
                    }
                    SessionEvent::Done => done = true,
                    SessionEvent::TransportError(reason) => failure = Some(reason),
                }
            }
        }

        if changed {
            conversation.sync();
        }

        if let Some(reason) = failure {
            self.fail(conversation, reason);
        } else if done {
            self.finish(SessionEnd::Completed);
        }
    }

    /// Handle a transport failure: placeholder content if nothing arrived, then close
    pub fn fail(&mut self, conversation: &mut Conversation, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Stream error: {}", reason);
        self.terminate(conversation, STREAM_ERROR_MESSAGE, SessionEnd::Failed(reason));
    }

    /// Handle user cancellation
    pub fn cancel(&mut self, conversation: &mut Conversation) {
        self.terminate(conversation, CANCELLED_MESSAGE, SessionEnd::Cancelled);
    }

    fn terminate(&mut self, conversation: &mut Conversation, placeholder: &str, end: SessionEnd) {
        if self.is_closed() {
            return;
        }
        if let Some(message) = conversation.message_mut(self.target) {
            if message.content.is_empty() {
                message.content = placeholder.to_string();
            }
        }
        conversation.sync();
        self.finish(end);
    }

    fn finish(&mut self, end: SessionEnd) {
        if self.close() {
            tracing::debug!("Stream session closed: {:?}", end);
        }
        self.state = ConnectionState::Closed;
        self.end.get_or_insert(end);
    }

    /// Release the channel. Returns `true` only for the call that released it.
    pub fn close(&mut self) -> bool {
        self.state = ConnectionState::Closed;
        match self.channel.take() {
            Some(mut channel) => {
                channel.close();
                true
            }
            None => false,
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}
