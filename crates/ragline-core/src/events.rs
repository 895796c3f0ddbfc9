//! Events emitted to renderers

use ragline_client::Message;
use serde::{Deserialize, Serialize};

/// Events emitted while the conversation changes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The log changed; `messages` is the full snapshot to render
    Updated { messages: Vec<Message> },

    /// Status line text
    Status { text: String, is_error: bool },

    /// The sending flag changed
    Sending { active: bool },
}

impl ChatEvent {
    /// Create a non-error status event
    pub fn status(text: impl Into<String>) -> Self {
        ChatEvent::Status {
            text: text.into(),
            is_error: false,
        }
    }

    /// Create an error status event
    pub fn error_status(text: impl Into<String>) -> Self {
        ChatEvent::Status {
            text: text.into(),
            is_error: true,
        }
    }
}
