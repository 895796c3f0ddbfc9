//! Custom widgets for the TUI

pub mod input_box;
pub mod message_list;
pub mod spinner;
pub mod status_bar;

pub use input_box::InputBox;
pub use message_list::{MessageList, MessageRenderer};
pub use spinner::Spinner;
pub use status_bar::StatusBar;
