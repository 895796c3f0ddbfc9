//! Response ingestion: turns one submitted question into conversation updates

use ragline_client::{Backend, Message, Role, Sanitizer, SseEvent, Source, build_stream_url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    conversation::Conversation,
    events::ChatEvent,
    handle::{EngineHandle, SendingGuard},
    session::{self, CANCELLED_MESSAGE, SessionEnd, SessionEvent, StreamSession},
    settings::{Settings, SettingsStore},
    storage::SharedStorage,
};

pub const STATUS_SENDING: &str = "Sending…";
pub const STATUS_MOCK: &str = "Generating mock response…";
pub const STATUS_MOCK_DONE: &str = "Mock response complete";
pub const STATUS_DONE: &str = "Done";
pub const STATUS_ERROR: &str = "An error occurred";
pub const STATUS_CONNECTING: &str = "Connecting to stream…";
pub const STATUS_STREAM_ERROR: &str = "Stream error";
pub const STATUS_UNSUPPORTED: &str = "Streaming unsupported";
pub const STATUS_CLEARED: &str = "History cleared";
pub const STATUS_CANCELLED: &str = "Cancelled";

/// Informational answer when the backend cannot stream
pub const UNSUPPORTED_MESSAGE: &str =
    "Streaming responses (server-sent events) are not supported by this backend.";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Simulated latency of the mock strategy
    pub mock_delay: Duration,
    /// Settings used for fields the stored record does not provide
    pub defaults: Settings,
    /// Sanitizer for all server and storage data
    pub sanitizer: Sanitizer,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mock_delay: Duration::from_millis(500),
            defaults: Settings::default(),
            sanitizer: Sanitizer::default(),
        }
    }
}

/// How a send will be answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Mock,
    Streaming,
    Unsupported,
    NonStreaming,
}

/// Pick the strategy for a send. Mock beats streaming beats single-shot.
pub fn select_strategy(settings: &Settings, supports_streaming: bool) -> Strategy {
    if settings.use_mock {
        Strategy::Mock
    } else if settings.use_streaming {
        if supports_streaming {
            Strategy::Streaming
        } else {
            Strategy::Unsupported
        }
    } else {
        Strategy::NonStreaming
    }
}

/// Result of [`Engine::send`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The question was blank; nothing happened
    Skipped,
    /// Another send was in flight; nothing happened
    Busy,
    /// An answer was recorded
    Completed,
    /// The exchange failed; an error message was recorded
    Failed(String),
    /// Streaming was requested but the backend cannot stream
    Unsupported,
    /// The user aborted the send
    Cancelled,
}

/// Text of the mock answer for `question`
pub fn mock_answer(question: &str) -> String {
    format!(
        "This is a mock response. Showing a dummy answer for \"{}\".",
        question
    )
}

/// The fixed sources attached to mock answers
pub fn mock_sources() -> Vec<Source> {
    vec![
        Source::new("Dummy source 1", "https://example.com/source-1"),
        Source::new("Dummy source 2", "https://example.com/source-2"),
    ]
}

/// Drives one strategy per send and funnels the results into the conversation
pub struct Engine {
    conversation: Conversation,
    settings: SettingsStore,
    backend: Arc<dyn Backend>,
    events: broadcast::Sender<ChatEvent>,
    handle: EngineHandle,
    mock_delay: Duration,
}

impl Engine {
    /// Create an engine, loading history and settings from `storage`
    pub fn new(backend: Arc<dyn Backend>, storage: SharedStorage, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        let conversation = Conversation::load(storage.clone(), config.sanitizer, events.clone());
        let settings = SettingsStore::load(storage, config.defaults);
        Self {
            conversation,
            settings,
            backend,
            events,
            handle: EngineHandle::new(),
            mock_delay: config.mock_delay,
        }
    }

    /// Subscribe to conversation events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Get a cloneable handle for aborting and observing sends
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// The conversation log
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// All messages in display order
    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    /// Mutable settings; setters persist immediately
    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    /// Clear the conversation
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.status(STATUS_CLEARED);
    }

    fn status(&self, text: &str) {
        let _ = self.events.send(ChatEvent::status(text));
    }

    fn error_status(&self, text: &str) {
        let _ = self.events.send(ChatEvent::error_status(text));
    }

    /// Submit a question and drive its answer to completion.
    ///
    /// Failures are recorded in the conversation and never returned as errors.
    pub async fn send(&mut self, question: &str) -> SendOutcome {
        let question = question.trim();
        if question.is_empty() {
            return SendOutcome::Skipped;
        }

        let Some(_guard) = SendingGuard::acquire(&self.handle, &self.events) else {
            tracing::debug!("Send ignored: another send is in flight");
            return SendOutcome::Busy;
        };
        let cancel = self.handle.fresh_token();

        self.conversation.append(Role::User, question, vec![]);
        self.status(STATUS_SENDING);
        self.settings.save();

        let endpoint = self.settings.effective_endpoint().to_string();
        let strategy = select_strategy(self.settings.get(), self.backend.supports_streaming());
        tracing::debug!("Sending with {:?} strategy to {}", strategy, endpoint);

        let outcome = match strategy {
            Strategy::Mock => self.run_mock(question, &cancel).await,
            Strategy::NonStreaming => self.run_single(&endpoint, question, &cancel).await,
            Strategy::Streaming => self.run_stream(&endpoint, question, &cancel).await,
            Strategy::Unsupported => {
                self.conversation
                    .append(Role::Assistant, UNSUPPORTED_MESSAGE, vec![]);
                self.status(STATUS_UNSUPPORTED);
                SendOutcome::Unsupported
            }
        };

        if let Some(answer) = self.conversation.last().filter(|m| m.role == Role::Assistant) {
            tracing::debug!(
                "Send finished: {:?}, {} chars, {} sources",
                outcome,
                answer.content.chars().count(),
                answer.sources.len()
            );
        }
        outcome
    }

    async fn run_mock(&mut self, question: &str, cancel: &CancellationToken) -> SendOutcome {
        self.status(STATUS_MOCK);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.status(STATUS_CANCELLED);
                return SendOutcome::Cancelled;
            }
            _ = tokio::time::sleep(self.mock_delay) => {}
        }

        self.conversation
            .append(Role::Assistant, mock_answer(question), mock_sources());
        self.status(STATUS_MOCK_DONE);
        SendOutcome::Completed
    }

    async fn run_single(
        &mut self,
        endpoint: &str,
        question: &str,
        cancel: &CancellationToken,
    ) -> SendOutcome {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.backend.query(endpoint, question) => Some(result),
        };

        match result {
            None => {
                self.conversation
                    .append(Role::Assistant, CANCELLED_MESSAGE, vec![]);
                self.status(STATUS_CANCELLED);
                SendOutcome::Cancelled
            }
            Some(Ok(body)) => {
                let answer = body
                    .get("answer")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let sources = self
                    .conversation
                    .sanitizer()
                    .sources(body.get("sources").unwrap_or(&Value::Null));
                self.conversation.append(Role::Assistant, answer, sources);
                self.status(STATUS_DONE);
                SendOutcome::Completed
            }
            Some(Err(e)) => {
                tracing::warn!("Query failed: {}", e);
                let description = e.to_string();
                self.conversation.append(
                    Role::Assistant,
                    format!("An error occurred: {}", description),
                    vec![],
                );
                self.error_status(STATUS_ERROR);
                SendOutcome::Failed(description)
            }
        }
    }

    async fn run_stream(
        &mut self,
        endpoint: &str,
        question: &str,
        cancel: &CancellationToken,
    ) -> SendOutcome {
        let target = self.conversation.append(Role::Assistant, "", vec![]);
        self.status(STATUS_CONNECTING);

        let url = build_stream_url(endpoint, question);
        let mut session = match self.backend.open_stream(&url) {
            Ok(channel) => StreamSession::new(target, channel),
            Err(e) => {
                let mut session = StreamSession::detached(target);
                session.fail(&mut self.conversation, e.to_string());
                session
            }
        };

        while !session.is_closed() {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    session.cancel(&mut self.conversation);
                    break;
                }
                event = session.next_event() => event,
            };

            match event {
                None => session.fail(
                    &mut self.conversation,
                    "stream ended before completion",
                ),
                Some(SseEvent::Open) => session.mark_open(),
                Some(SseEvent::Message { data }) => {
                    session.mark_open();
                    if data.is_empty() {
                        continue;
                    }
                    match session::decode_payload(&data, self.conversation.sanitizer()) {
                        Ok(events) => session.ingest(&mut self.conversation, events),
                        Err(e) => tracing::warn!("Ignoring malformed stream event: {}", e),
                    }
                }
                Some(SseEvent::Error { message }) => session.ingest(
                    &mut self.conversation,
                    vec![SessionEvent::TransportError(message)],
                ),
            }
        }

        match session.end() {
            Some(SessionEnd::Completed) => {
                self.status(STATUS_DONE);
                SendOutcome::Completed
            }
            Some(SessionEnd::Cancelled) => {
                self.status(STATUS_CANCELLED);
                SendOutcome::Cancelled
            }
            Some(SessionEnd::Failed(reason)) => {
                let reason = reason.clone();
                self.error_status(STATUS_STREAM_ERROR);
                SendOutcome::Failed(reason)
            }
            None => {
                self.error_status(STATUS_STREAM_ERROR);
                SendOutcome::Failed("stream closed".to_string())
            }
        }
    }
}
