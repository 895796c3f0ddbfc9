//! Full-screen terminal interface

use crate::commands::{CommandResult, execute_command, modes_label};
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use ragline_client::{Message, Sanitizer};
use ragline_core::{ChatEvent, Engine, SendOutcome};
use ragline_tui::{
    Theme, Tui,
    input::{Action, event_to_action},
    widgets::{InputBox, MessageList, MessageRenderer, StatusBar},
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::{Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

const PAGE: usize = 10;
const STATUS_READY: &str = "Ready";
const STATUS_CANCELLING: &str = "Cancelling…";

/// Requests from the UI to the engine loop
#[derive(Debug, PartialEq, Eq)]
pub enum UiMessage {
    /// User submitted a question or slash command
    Submit(String),
    /// User requested clear
    Clear,
    /// User requested quit
    Quit,
}

/// TUI application state
pub struct TuiState {
    messages: Vec<Message>,
    input: InputBox,
    /// Scroll offset in lines; `usize::MAX` sticks to the bottom
    scroll: usize,
    status: String,
    status_error: bool,
    sending_since: Option<Instant>,
    modes: String,
    /// Output of the last slash command
    notice: Option<String>,
    theme: Theme,
    sanitizer: Sanitizer,
}

impl TuiState {
    pub fn new(messages: Vec<Message>, modes: String, sanitizer: Sanitizer) -> Self {
        let mut input = InputBox::new().with_placeholder("Ask a question, or /help");
        input.set_focused(true);
        Self {
            messages,
            input,
            scroll: usize::MAX,
            status: STATUS_READY.to_string(),
            status_error: false,
            sending_since: None,
            modes,
            notice: None,
            theme: Theme::default(),
            sanitizer,
        }
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll = usize::MAX;
    }

    fn show_notice(&mut self, text: String) {
        self.notice = Some(text);
        self.scroll_to_bottom();
    }

    pub fn is_sending(&self) -> bool {
        self.sending_since.is_some()
    }

    /// Apply an engine event
    pub fn handle_chat_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Updated { messages } => {
                self.messages = messages;
                self.scroll_to_bottom();
            }
            ChatEvent::Status { text, is_error } => {
                self.status = text;
                self.status_error = is_error;
            }
            ChatEvent::Sending { active } => {
                self.sending_since = active.then(Instant::now);
            }
        }
    }

    /// Handle a key action while idle
    pub fn handle_action(&mut self, action: Action, width: u16) -> Option<UiMessage> {
        match action {
            Action::Submit => {
                let content = self.input.take_submission()?;
                self.notice = None;
                Some(UiMessage::Submit(content))
            }
            Action::Interrupt => Some(UiMessage::Quit),
            Action::Eof if self.input.is_empty() => Some(UiMessage::Quit),
            Action::Clear => Some(UiMessage::Clear),
            Action::Escape => {
                self.notice = None;
                None
            }
            Action::PageUp => {
                self.scroll = self.scroll.saturating_sub(PAGE);
                None
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(PAGE);
                None
            }
            action => {
                self.input.handle_action(&action, width);
                None
            }
        }
    }

    /// Handle a key action while a send is in flight. Returns true to abort it.
    pub fn handle_busy_action(&mut self, action: Action, width: u16) -> bool {
        match action {
            Action::Interrupt | Action::Escape => {
                self.status = STATUS_CANCELLING.to_string();
                self.status_error = false;
                true
            }
            Action::PageUp => {
                self.scroll = self.scroll.saturating_sub(PAGE);
                false
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(PAGE);
                false
            }
            // One question at a time; keep the draft
            Action::Submit | Action::Clear => false,
            action => {
                self.input.handle_action(&action, width);
                false
            }
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(frame.area());

        self.render_messages(frame, chunks[0]);

        let status = StatusBar::new(&self.status, &self.theme)
            .error(self.status_error)
            .modes(&self.modes)
            .busy(self.sending_since);
        frame.render_widget(status, chunks[1]);

        self.input.render(chunks[2], frame.buffer_mut(), &self.theme);
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(format!(" ragline │ {} ", self.modes));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let renderer =
            MessageRenderer::new(&self.sanitizer, &self.theme).waiting(self.sending_since);
        let list = MessageList::new(&self.messages, renderer).notice(self.notice.as_deref());

        let height = inner.height as usize;
        let content_height = list.content_height(inner.width as usize);
        self.scroll = self.scroll.min(content_height.saturating_sub(height));

        frame.render_widget(list.scroll(self.scroll), inner);

        if content_height > height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");
            let mut state = ScrollbarState::new(content_height)
                .position(self.scroll)
                .viewport_content_length(height);
            frame.render_stateful_widget(scrollbar, inner, &mut state);
        }
    }
}

fn drain(rx: &mut broadcast::Receiver<ChatEvent>, state: &mut TuiState) {
    while let Ok(event) = rx.try_recv() {
        state.handle_chat_event(event);
    }
}

/// Run the TUI until the user quits
pub async fn run_tui(engine: &mut Engine) -> anyhow::Result<()> {
    let sanitizer = engine.conversation().sanitizer().clone();
    let mut state = TuiState::new(
        engine.messages().to_vec(),
        modes_label(engine.settings()),
        sanitizer,
    );

    let mut tui = Tui::enter()?;
    let mut events = engine.subscribe();
    let mut event_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(80));
    let handle = engine.handle();

    let mut pending_question: Option<String> = None;

    loop {
        if let Some(question) = pending_question.take() {
            let outcome = {
                let mut send_future = std::pin::pin!(engine.send(&question));
                loop {
                    tui.draw(|frame| state.render(frame))?;
                    let width = tui.width()?;

                    tokio::select! {
                        biased;

                        outcome = &mut send_future => break outcome,

                        event = events.recv() => match event {
                            Ok(event) => state.handle_chat_event(event),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!("UI lagged behind by {} events", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {}
                        },

                        event = event_stream.next() => match event {
                            Some(Ok(event)) => {
                                if let Some(action) = event_to_action(event) {
                                    if state.handle_busy_action(action, width) {
                                        handle.abort();
                                    }
                                }
                            }
                            Some(Err(e)) => {
                                handle.abort();
                                return Err(anyhow::anyhow!("Event error: {}", e));
                            }
                            None => {
                                handle.abort();
                                return Ok(());
                            }
                        },

                        _ = tick_interval.tick() => {}
                    }
                }
            };

            drain(&mut events, &mut state);
            if let SendOutcome::Failed(reason) = &outcome {
                tracing::warn!("Send failed: {}", reason);
            }
            // A lagged receiver may have missed the final snapshot
            state.messages = engine.messages().to_vec();
            state.sending_since = None;
            continue;
        }

        tui.draw(|frame| state.render(frame))?;
        let width = tui.width()?;

        let request = tokio::select! {
            biased;

            event = events.recv() => {
                if let Ok(event) = event {
                    state.handle_chat_event(event);
                }
                None
            }

            event = event_stream.next() => match event {
                Some(Ok(event)) => event_to_action(event)
                    .and_then(|action| state.handle_action(action, width)),
                Some(Err(e)) => break Err(anyhow::anyhow!("Event error: {}", e)),
                None => break Ok(()),
            },

            _ = tick_interval.tick() => None,
        };

        match request {
            Some(UiMessage::Submit(input)) => {
                let Some(result) = execute_command(&input, engine) else {
                    pending_question = Some(input);
                    continue;
                };
                match result {
                    CommandResult::Message(text) => state.show_notice(text),
                    CommandResult::Unknown(command) => state.show_notice(format!(
                        "Unknown command: /{}\nType /help for available commands.",
                        command
                    )),
                    CommandResult::Clear => engine.clear(),
                    CommandResult::Exit => break Ok(()),
                }
                state.modes = modes_label(engine.settings());
            }
            Some(UiMessage::Clear) => {
                state.notice = None;
                engine.clear();
            }
            Some(UiMessage::Quit) => break Ok(()),
            None => {}
        }
    }
}
