//! ragline-core: conversation runtime
//!
//! This crate owns the conversation log and the settings record, persists
//! both to a key/value store, and drives each submitted question through
//! one of the mock, single-shot or streaming strategies.

pub mod conversation;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod session;
pub mod settings;
pub mod storage;

pub use conversation::{Conversation, HISTORY_KEY};
pub use engine::{Engine, EngineConfig, SendOutcome, Strategy, select_strategy};
pub use error::{Error, Result};
pub use events::ChatEvent;
pub use handle::EngineHandle;
pub use session::{ConnectionState, SessionEnd, SessionEvent, StreamSession};
pub use settings::{SETTINGS_KEY, Settings, SettingsStore};
pub use storage::{FileStorage, MemoryStorage, SharedStorage, Storage};
